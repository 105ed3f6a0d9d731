//! Error types of the validation layer.
//!
//! Two very different kinds of failure live here:
//! - [`ValidationError`] / [`ErrorResponse`]: request data that does not satisfy a handler's declared
//!   parameters. These are plain data, collected per request and serialized into the `422` body.
//! - [`SpecError`] / [`ExtractError`]: programming errors, either in the parameter declarations
//!   (reported when the validator is built) or in the handler's argument binding (propagated to the
//!   host framework).

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Machine readable error codes, as they appear in the `type` field.
pub mod error_types {
    pub const MISSING: &str = "missing";
    pub const JSON_INVALID: &str = "json_invalid";

    pub const INT_TYPE: &str = "int_type";
    pub const INT_PARSING: &str = "int_parsing";
    pub const INT_PARSING_SIZE: &str = "int_parsing_size";
    pub const INT_FROM_FLOAT: &str = "int_from_float";
    pub const FLOAT_TYPE: &str = "float_type";
    pub const FLOAT_PARSING: &str = "float_parsing";
    pub const FINITE_NUMBER: &str = "finite_number";
    pub const BOOL_TYPE: &str = "bool_type";
    pub const BOOL_PARSING: &str = "bool_parsing";
    pub const STRING_TYPE: &str = "string_type";
    pub const LIST_TYPE: &str = "list_type";
    pub const DICT_TYPE: &str = "dict_type";

    pub const GREATER_THAN: &str = "greater_than";
    pub const GREATER_THAN_EQUAL: &str = "greater_than_equal";
    pub const LESS_THAN: &str = "less_than";
    pub const LESS_THAN_EQUAL: &str = "less_than_equal";
    pub const MULTIPLE_OF: &str = "multiple_of";
    pub const STRING_TOO_SHORT: &str = "string_too_short";
    pub const STRING_TOO_LONG: &str = "string_too_long";
    pub const STRING_PATTERN_MISMATCH: &str = "string_pattern_mismatch";
    pub const TOO_SHORT: &str = "too_short";
    pub const TOO_LONG: &str = "too_long";
}

/// One segment of an error location: a source or field name, or a list index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocItem {
    Field(String),
    Index(usize),
}

impl LocItem {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn index(idx: usize) -> Self {
        Self::Index(idx)
    }
}

impl From<&str> for LocItem {
    fn from(s: &str) -> Self {
        Self::Field(s.to_owned())
    }
}

impl From<String> for LocItem {
    fn from(s: String) -> Self {
        Self::Field(s)
    }
}

impl From<usize> for LocItem {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

impl Display for LocItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.write_str(name),
            Self::Index(idx) => write!(f, "{idx}"),
        }
    }
}

impl Serialize for LocItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Field(name) => serializer.serialize_str(name),
            Self::Index(idx) => serializer.serialize_u64(*idx as u64),
        }
    }
}

/// A single failed field.
///
/// Serializes to `{"type", "loc", "msg", "input", "ctx"?, "url"?}`. `input` always carries the value
/// exactly as it was received, never the coerced one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    #[serde(rename = "type")]
    error_type: &'static str,
    loc: Vec<LocItem>,
    msg: String,
    input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    ctx: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

impl ValidationError {
    pub fn new(error_type: &'static str, loc: Vec<LocItem>, msg: impl Into<String>, input: Value) -> Self {
        Self { error_type, loc, msg: msg.into(), input, ctx: None, url: None }
    }

    pub fn missing(loc: Vec<LocItem>, input: Value) -> Self {
        Self::new(error_types::MISSING, loc, "Field required", input)
    }

    pub fn json_invalid(loc: Vec<LocItem>, input: Value, cause: impl Display) -> Self {
        Self::new(error_types::JSON_INVALID, loc, "JSON decode error", input)
            .with_ctx_value("error", Value::String(cause.to_string()))
    }

    /// Adds one entry to the `ctx` mapping.
    #[must_use]
    pub fn with_ctx_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.ctx.get_or_insert_with(Map::new).insert(key.into(), value);
        self
    }

    /// Sets `url` to `base` followed by the error code.
    #[must_use]
    pub fn with_url_base(mut self, base: &str) -> Self {
        self.url = Some(format!("{base}{}", self.error_type));
        self
    }

    pub fn error_type(&self) -> &'static str {
        self.error_type
    }

    pub fn loc(&self) -> &[LocItem] {
        &self.loc
    }

    pub fn msg(&self) -> &str {
        &self.msg
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn ctx(&self) -> Option<&Map<String, Value>> {
        self.ctx.as_ref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

/// The body of a rejected request: `{"detail": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorResponse {
    detail: Vec<ValidationError>,
}

impl ErrorResponse {
    pub fn new(detail: Vec<ValidationError>) -> Self {
        Self { detail }
    }

    pub fn detail(&self) -> &[ValidationError] {
        &self.detail
    }

    pub fn into_detail(self) -> Vec<ValidationError> {
        self.detail
    }
}

/// Problems in parameter declarations, reported when a validator is built.
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("parameter `{name}` is declared more than once")]
    DuplicateParam { name: String },

    #[error("object `{object}` declares field `{name}` more than once")]
    DuplicateField { object: String, name: String },

    #[error("parameter `{name}`: `{constraint}` bound must be a finite number")]
    NonFiniteBound { name: String, constraint: &'static str },

    #[error("parameter `{name}`: `{constraint}` can not be applied to {target}")]
    NotApplicable { name: String, constraint: &'static str, target: String },

    #[error("parameter `{name}`: contradictory constraints, {reason}")]
    Contradictory { name: String, reason: String },

    #[error("parameter `{name}`: invalid pattern: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

impl SpecError {
    pub fn duplicate_param<S: ToString>(name: S) -> Self {
        Self::DuplicateParam { name: name.to_string() }
    }

    pub fn duplicate_field<S: ToString, N: ToString>(object: S, name: N) -> Self {
        Self::DuplicateField { object: object.to_string(), name: name.to_string() }
    }

    pub fn not_applicable<S: ToString, T: ToString>(name: S, constraint: &'static str, target: T) -> Self {
        Self::NotApplicable { name: name.to_string(), constraint, target: target.to_string() }
    }

    pub fn contradictory<S: ToString, R: ToString>(name: S, reason: R) -> Self {
        Self::Contradictory { name: name.to_string(), reason: reason.to_string() }
    }
}

/// Failures while binding already validated arguments to a handler's parameters.
///
/// These mean the handler signature disagrees with its declared parameters, so they are
/// propagated to the host framework instead of being turned into a `422`.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("validated arguments do not match handler parameters: {source}")]
    Deserialize {
        #[from]
        source: serde_json::Error,
    },

    #[error("argument `{name}` was not declared")]
    UnknownArgument { name: String },
}

impl ExtractError {
    pub fn unknown_argument<S: ToString>(name: S) -> Self {
        Self::UnknownArgument { name: name.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_type_error_without_ctx() {
        let error = ValidationError::new(
            error_types::INT_PARSING,
            vec!["path".into(), "user_id".into()],
            "Input should be a valid integer, unable to parse string as an integer",
            json!("first"),
        )
        .with_url_base("https://errors.pydantic.dev/2.1.2/v/");

        assert_eq!(
            serde_json::to_value(&error).unwrap(),
            json!({
                "type": "int_parsing",
                "loc": ["path", "user_id"],
                "msg": "Input should be a valid integer, unable to parse string as an integer",
                "input": "first",
                "url": "https://errors.pydantic.dev/2.1.2/v/int_parsing",
            })
        );
    }

    #[test]
    fn test_serialize_field_order() {
        let error = ValidationError::new(error_types::GREATER_THAN, vec!["path".into()], "m", json!("1"))
            .with_ctx_value("gt", json!(10))
            .with_url_base("u/");

        let text = serde_json::to_string(&error).unwrap();
        assert_eq!(text, r#"{"type":"greater_than","loc":["path"],"msg":"m","input":"1","ctx":{"gt":10},"url":"u/greater_than"}"#);
    }

    #[test]
    fn test_loc_index_serialized_as_number() {
        let error = ValidationError::missing(vec!["body".into(), "items".into(), 2.into(), "name".into()], json!({}));
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["loc"], json!(["body", "items", 2, "name"]));
        assert_eq!(value["msg"], json!("Field required"));
    }

    #[test]
    fn test_json_invalid_carries_cause() {
        let error = ValidationError::json_invalid(vec!["body".into()], json!("{"), "EOF while parsing");
        assert_eq!(error.error_type(), "json_invalid");
        assert_eq!(error.ctx().unwrap()["error"], json!("EOF while parsing"));
    }

    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse::new(vec![ValidationError::missing(vec!["query".into(), "q".into()], Value::Null)]);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"detail": [{"type": "missing", "loc": ["query", "q"], "msg": "Field required", "input": null}]})
        );
    }
}
