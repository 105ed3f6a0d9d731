//! The handler invocation wrapper.
//!
//! A [`ParameterValidator`] holds the declared parameters of one handler. Decorating the handler
//! with it gives a [`Validated`] handler which, on every request, extracts and coerces each
//! parameter in declaration order, then either calls the inner handler with the coerced
//! [`Arguments`] or answers with the collected errors and never calls it.
//!
//! # Example
//! ```
//! use micro_validator::param::path;
//! use micro_validator::{handler_fn, Decorator, Json, ParameterValidator, Valid};
//! use serde::Deserialize;
//! use serde_json::{json, Value};
//!
//! #[derive(Deserialize)]
//! struct GreaterThan {
//!     user_id: i64,
//! }
//!
//! async fn greater_than(Valid(args): Valid<GreaterThan>) -> Json<Value> {
//!     Json(json!({ "user_id": args.user_id }))
//! }
//!
//! # fn main() -> Result<(), micro_validator::SpecError> {
//! let handler = ParameterValidator::builder()
//!     .param(path("user_id").integer().gt(10))
//!     .build()?
//!     .decorate(handler_fn(greater_than));
//! # let _ = handler;
//! # Ok(())
//! # }
//! ```

use crate::body::ResponseBody;
use crate::coerce::coerce_param;
use crate::config::ValidatorConfig;
use crate::decorator::Decorator;
use crate::error::{ErrorResponse, LocItem, SpecError};
use crate::extract::{extract, BodyBinding};
use crate::handler::{ArgumentHandler, Arguments, BoxError, RequestHandler};
use crate::param::{ParamBuilder, ParamSpec, Source};
use crate::request::RequestContext;
use crate::responder::{Json, Responder};
use async_trait::async_trait;
use http::Response;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// The declared parameters of one handler, built once and shared by every request.
#[derive(Debug, Clone)]
pub struct ParameterValidator {
    inner: Arc<ValidatorInner>,
}

#[derive(Debug)]
struct ValidatorInner {
    params: Vec<BoundParam>,
    config: ValidatorConfig,
}

#[derive(Debug)]
struct BoundParam {
    spec: ParamSpec,
    binding: BodyBinding,
}

impl BoundParam {
    fn loc(&self) -> Vec<LocItem> {
        match (self.spec.source(), self.binding) {
            (Source::Body, BodyBinding::Whole) => vec![LocItem::field(Source::Body.as_str())],
            (source, _) => vec![LocItem::field(source.as_str()), LocItem::field(self.spec.lookup_name())],
        }
    }
}

impl ParameterValidator {
    pub fn builder() -> ParameterValidatorBuilder {
        ParameterValidatorBuilder::new()
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> impl Iterator<Item = &ParamSpec> {
        self.inner.params.iter().map(|param| &param.spec)
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.inner.config
    }

    /// Runs extraction and coercion for every parameter.
    ///
    /// Errors are listed in parameter declaration order. A malformed JSON body is reported once,
    /// at the first required body parameter.
    pub fn validate(&self, req: &RequestContext) -> Result<Arguments, ErrorResponse> {
        let mut args = Arguments::with_capacity(self.inner.params.len());
        let mut detail = vec![];
        let mut body_reported = false;

        for param in &self.inner.params {
            let spec = &param.spec;
            let raw = match extract(spec, param.binding, req) {
                Ok(raw) => raw,
                Err(body_error) if spec.required() => {
                    if !body_reported {
                        detail.push(body_error);
                        body_reported = true;
                    }
                    continue;
                }
                Err(_) => None,
            };

            match coerce_param(spec, raw, param.loc(), &Value::Null) {
                Ok(value) => args.push(spec.name(), value),
                Err(errors) => detail.extend(errors),
            }
        }

        if detail.is_empty() {
            return Ok(args);
        }

        if let Some(base) = self.inner.config.errors_url() {
            detail = detail.into_iter().map(|error| error.with_url_base(base)).collect();
        }
        Err(ErrorResponse::new(detail))
    }
}

impl<H: ArgumentHandler> Decorator<H> for ParameterValidator {
    type Out = Validated<H>;

    fn decorate(&self, handler: H) -> Self::Out {
        Validated { validator: self.clone(), handler }
    }
}

#[derive(Debug)]
pub struct ParameterValidatorBuilder {
    params: Vec<ParamBuilder>,
    config: ValidatorConfig,
}

impl ParameterValidatorBuilder {
    fn new() -> Self {
        Self { params: vec![], config: ValidatorConfig::default() }
    }

    pub fn param(mut self, param: ParamBuilder) -> Self {
        self.params.push(param);
        self
    }

    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ParameterValidator, SpecError> {
        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(self.params.len());
        for builder in self.params {
            let spec = builder.build()?;
            if !seen.insert(spec.name().to_owned()) {
                return Err(SpecError::duplicate_param(spec.name()));
            }
            specs.push(spec);
        }

        let body_params = specs.iter().filter(|spec| spec.source() == Source::Body).collect::<Vec<_>>();
        let whole_body = matches!(body_params.as_slice(), [only] if !only.embed());

        let params = specs
            .into_iter()
            .map(|spec| {
                let binding = if whole_body && spec.source() == Source::Body { BodyBinding::Whole } else { BodyBinding::Field };
                BoundParam { spec, binding }
            })
            .collect::<Vec<_>>();

        debug!(params = params.len(), whole_body, "parameter validator built");
        Ok(ParameterValidator { inner: Arc::new(ValidatorInner { params, config: self.config }) })
    }
}

/// A handler decorated with a [`ParameterValidator`].
pub struct Validated<H> {
    validator: ParameterValidator,
    handler: H,
}

impl<H> Validated<H> {
    pub fn validator(&self) -> &ParameterValidator {
        &self.validator
    }
}

#[async_trait]
impl<H: ArgumentHandler> RequestHandler for Validated<H> {
    async fn invoke(&self, req: &RequestContext<'_>) -> Result<Response<ResponseBody>, BoxError> {
        match self.validator.validate(req) {
            Ok(args) => self.handler.call(req, args).await,
            Err(rejection) => {
                debug!(
                    method = %req.method(),
                    path = req.uri().path(),
                    errors = rejection.detail().len(),
                    "request rejected by parameter validation"
                );
                Ok((self.validator.config().rejection_status(), Json(rejection)).response_to(req))
            }
        }
    }
}
