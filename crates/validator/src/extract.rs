//! Pulls the raw, not yet coerced value of one parameter out of a request.

use crate::error::ValidationError;
use crate::param::{ParamSpec, Source};
use crate::request::{JsonBody, RequestContext};
use http::header::COOKIE;
use serde_json::Value;
use std::borrow::Cow;

/// A value as it arrived, scoped to one parameter and one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// A single textual value: path segment, query entry, header or cookie.
    Text(String),
    /// Every value of a repeated query entry or header, in order.
    Many(Vec<String>),
    /// A value taken from the JSON body.
    Json(Value),
}

impl RawValue {
    /// The value as it is echoed back in an error's `input`.
    pub fn to_input(&self) -> Value {
        match self {
            RawValue::Text(s) => Value::String(s.clone()),
            RawValue::Many(values) => values.iter().cloned().map(Value::String).collect(),
            RawValue::Json(value) => value.clone(),
        }
    }
}

/// How a body parameter is bound to the JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyBinding {
    /// The whole body is the parameter's value.
    Whole,
    /// The parameter reads its own key of the body object.
    Field,
}

/// Extracts the raw value of `spec` from `req`.
///
/// `Ok(None)` means the value is absent from its source. The only error is a body that is not
/// valid JSON; an empty body counts as absent.
pub fn extract(spec: &ParamSpec, binding: BodyBinding, req: &RequestContext) -> Result<Option<RawValue>, ValidationError> {
    let key = spec.lookup_name();
    let many = spec.target_type().is_list();

    let raw = match spec.source() {
        Source::Path => req.path_params().get(&key).map(|v| RawValue::Text(v.to_owned())),
        Source::Query => {
            let values = req.query_pairs().iter().filter(|(k, _)| *k == key).map(|(_, v)| v.clone());
            collect_values(values, many)
        }
        Source::Header => {
            let values = req.headers().get_all(key.as_str()).iter().map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
            collect_values(values, many)
        }
        Source::Cookie => find_cookie(req, &key).map(RawValue::Text),
        Source::Body => match req.json_body() {
            JsonBody::Empty => None,
            JsonBody::Invalid(e) => {
                let input = Value::String(String::from_utf8_lossy(req.body()).into_owned());
                return Err(ValidationError::json_invalid(vec!["body".into()], input, e));
            }
            JsonBody::Parsed(value) => match binding {
                BodyBinding::Whole => Some(RawValue::Json(value.clone())),
                BodyBinding::Field => value.get(&key).cloned().map(RawValue::Json),
            },
        },
    };

    Ok(raw)
}

fn collect_values(mut values: impl Iterator<Item = String>, many: bool) -> Option<RawValue> {
    if many {
        let values = values.collect::<Vec<_>>();
        (!values.is_empty()).then_some(RawValue::Many(values))
    } else {
        values.next().map(RawValue::Text)
    }
}

fn find_cookie(req: &RequestContext, name: &str) -> Option<String> {
    req.headers()
        .get_all(COOKIE)
        .iter()
        .map(|header| String::from_utf8_lossy(header.as_bytes()))
        .find_map(|header: Cow<'_, str>| {
            header.split(';').find_map(|pair| {
                let (k, v) = pair.split_once('=')?;
                (k.trim() == name).then(|| v.trim().trim_matches('"').to_owned())
            })
        })
}
