//! Declarative request parameter validation for async web handlers.
//!
//! Handler parameters are declared once with the builders in [`param`] (source, target type,
//! constraints). The resulting [`ParameterValidator`] decorates a handler; on every request it
//! pulls the raw values out of the request, coerces and validates them, and either calls the
//! handler with the typed values or answers `422` with `{"detail": [...]}` listing every failing
//! field.

mod body;
mod config;
mod decorator;
mod fn_trait;
mod handler;
mod request;
mod responder;
mod validator;

pub mod coerce;
pub mod error;
pub mod extract;
pub mod param;

pub use body::ResponseBody;
pub use config::{ValidatorConfig, ValidatorConfigBuilder, DEFAULT_ERRORS_URL};
pub use decorator::Decorator;
pub use error::{ErrorResponse, ExtractError, LocItem, SpecError, ValidationError};
pub use fn_trait::FnTrait;
pub use handler::{handler_fn, ArgumentHandler, Arguments, BoxError, FnHandler, FromValidated, RequestHandler, Valid};
pub use request::{PathParams, RequestContext};
pub use responder::{Json, Responder};
pub use validator::{ParameterValidator, ParameterValidatorBuilder, Validated};
