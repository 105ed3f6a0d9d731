//! The coercion and validation engine.
//!
//! Converts a [`RawValue`] into a JSON value of the declared [`ParamType`], then checks the
//! parameter's constraints in declaration order. For one scalar parameter the outcome is either
//! a value or exactly one error: a missing or type error preempts the constraint checks, and the
//! first violated constraint stops the evaluation. Lists and objects recurse, and report every
//! failing item or field with the index or field name appended to `loc`.

use crate::error::{error_types, LocItem, ValidationError};
use crate::extract::RawValue;
use crate::param::{Bound, Constraint, ObjectSchema, ParamSpec, ParamType};
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;

/// A type error before its location and input are known.
struct TypeFailure {
    error_type: &'static str,
    msg: &'static str,
}

impl TypeFailure {
    const fn new(error_type: &'static str, msg: &'static str) -> Self {
        Self { error_type, msg }
    }

    fn at(self, loc: &[LocItem], raw: &RawValue) -> Vec<ValidationError> {
        vec![ValidationError::new(self.error_type, loc.to_vec(), self.msg, raw.to_input())]
    }
}

const INT_TYPE: TypeFailure = TypeFailure::new(error_types::INT_TYPE, "Input should be a valid integer");
const INT_PARSING: TypeFailure =
    TypeFailure::new(error_types::INT_PARSING, "Input should be a valid integer, unable to parse string as an integer");
const INT_PARSING_SIZE: TypeFailure =
    TypeFailure::new(error_types::INT_PARSING_SIZE, "Unable to parse input string as an integer, exceeded maximum size");
const INT_FROM_FLOAT: TypeFailure =
    TypeFailure::new(error_types::INT_FROM_FLOAT, "Input should be a valid integer, got a number with a fractional part");
const FLOAT_TYPE: TypeFailure = TypeFailure::new(error_types::FLOAT_TYPE, "Input should be a valid number");
const FLOAT_PARSING: TypeFailure =
    TypeFailure::new(error_types::FLOAT_PARSING, "Input should be a valid number, unable to parse string as a number");
const FINITE_NUMBER: TypeFailure = TypeFailure::new(error_types::FINITE_NUMBER, "Input should be a finite number");
const BOOL_TYPE: TypeFailure = TypeFailure::new(error_types::BOOL_TYPE, "Input should be a valid boolean");
const BOOL_PARSING: TypeFailure =
    TypeFailure::new(error_types::BOOL_PARSING, "Input should be a valid boolean, unable to interpret input");
const STRING_TYPE: TypeFailure = TypeFailure::new(error_types::STRING_TYPE, "Input should be a valid string");
const LIST_TYPE: TypeFailure = TypeFailure::new(error_types::LIST_TYPE, "Input should be a valid list");
const DICT_TYPE: TypeFailure = TypeFailure::new(error_types::DICT_TYPE, "Input should be a valid dictionary");

/// Coerces and validates one parameter.
///
/// `parent_input` is echoed as `input` when a required value is missing: `null` for top-level
/// parameters, the enclosing object for nested fields.
pub fn coerce_param(
    spec: &ParamSpec,
    raw: Option<RawValue>,
    loc: Vec<LocItem>,
    parent_input: &Value,
) -> Result<Value, Vec<ValidationError>> {
    let Some(raw) = raw else {
        return match spec.default_value() {
            Some(default) => Ok(default.clone()),
            None => Err(vec![ValidationError::missing(loc, parent_input.clone())]),
        };
    };

    let value = coerce_value(spec.target_type(), &raw, &loc)?;
    check_constraints(spec.constraints(), &value, &loc, &raw).map_err(|e| vec![e])?;
    Ok(value)
}

/// Converts `raw` to `target`, without looking at constraints.
pub fn coerce_value(target: &ParamType, raw: &RawValue, loc: &[LocItem]) -> Result<Value, Vec<ValidationError>> {
    match target {
        ParamType::Optional(_) if matches!(raw, RawValue::Json(Value::Null)) => Ok(Value::Null),
        ParamType::Optional(inner) => coerce_value(inner, raw, loc),
        ParamType::Integer => coerce_int(raw).map(Value::from).map_err(|f| f.at(loc, raw)),
        ParamType::Float => coerce_float(raw).map_err(|f| f.at(loc, raw)),
        ParamType::Bool => coerce_bool(raw).map(Value::Bool).map_err(|f| f.at(loc, raw)),
        ParamType::String => coerce_string(raw).map(Value::String).map_err(|f| f.at(loc, raw)),
        ParamType::List(item) => coerce_list(item, raw, loc),
        ParamType::Object(schema) => coerce_object(schema, raw, loc),
    }
}

fn text_of(raw: &RawValue) -> Option<&str> {
    match raw {
        RawValue::Text(s) | RawValue::Json(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn coerce_int(raw: &RawValue) -> Result<i64, TypeFailure> {
    if let Some(text) = text_of(raw) {
        return parse_int(text);
    }
    match raw {
        RawValue::Json(Value::Number(n)) => int_from_number(n),
        _ => Err(INT_TYPE),
    }
}

fn parse_int(text: &str) -> Result<i64, TypeFailure> {
    let text = text.trim();
    if let Ok(i) = text.parse::<i64>() {
        return Ok(i);
    }
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) { Err(INT_PARSING_SIZE) } else { Err(INT_PARSING) }
}

fn int_from_number(n: &Number) -> Result<i64, TypeFailure> {
    if let Some(i) = n.as_i64() {
        return Ok(i);
    }
    if n.is_u64() {
        return Err(INT_PARSING_SIZE);
    }
    match n.as_f64() {
        Some(f) if f.fract() != 0.0 => Err(INT_FROM_FLOAT),
        Some(f) if f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        _ => Err(INT_PARSING_SIZE),
    }
}

fn coerce_float(raw: &RawValue) -> Result<Value, TypeFailure> {
    let f = match (text_of(raw), raw) {
        (Some(text), _) => text.trim().parse::<f64>().map_err(|_parse_error| FLOAT_PARSING)?,
        (None, RawValue::Json(Value::Number(n))) => n.as_f64().ok_or(FLOAT_TYPE)?,
        _ => return Err(FLOAT_TYPE),
    };
    Number::from_f64(f).map(Value::Number).ok_or(FINITE_NUMBER)
}

fn coerce_bool(raw: &RawValue) -> Result<bool, TypeFailure> {
    if let Some(text) = text_of(raw) {
        return match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
            "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
            _ => Err(BOOL_PARSING),
        };
    }
    match raw {
        RawValue::Json(Value::Bool(b)) => Ok(*b),
        RawValue::Json(Value::Number(n)) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(BOOL_PARSING),
        },
        _ => Err(BOOL_TYPE),
    }
}

fn coerce_string(raw: &RawValue) -> Result<String, TypeFailure> {
    text_of(raw).map(str::to_owned).ok_or(STRING_TYPE)
}

fn coerce_list(item: &ParamType, raw: &RawValue, loc: &[LocItem]) -> Result<Value, Vec<ValidationError>> {
    let items = match raw {
        RawValue::Many(values) => values.iter().cloned().map(RawValue::Text).collect::<Vec<_>>(),
        RawValue::Json(Value::Array(values)) => values.iter().cloned().map(RawValue::Json).collect::<Vec<_>>(),
        _ => return Err(LIST_TYPE.at(loc, raw)),
    };

    let mut values = Vec::with_capacity(items.len());
    let mut errors = vec![];
    for (idx, item_raw) in items.iter().enumerate() {
        let item_loc = with_segment(loc, LocItem::Index(idx));
        match coerce_value(item, item_raw, &item_loc) {
            Ok(value) => values.push(value),
            Err(item_errors) => errors.extend(item_errors),
        }
    }

    if errors.is_empty() { Ok(Value::Array(values)) } else { Err(errors) }
}

fn coerce_object(schema: &ObjectSchema, raw: &RawValue, loc: &[LocItem]) -> Result<Value, Vec<ValidationError>> {
    let RawValue::Json(whole @ Value::Object(map)) = raw else {
        return Err(DICT_TYPE.at(loc, raw));
    };

    let mut object = Map::new();
    let mut errors = vec![];
    for field in schema.fields() {
        let key = field.lookup_name();
        let field_raw = map.get(&key).cloned().map(RawValue::Json);
        let field_loc = with_segment(loc, LocItem::Field(key));
        match coerce_param(field, field_raw, field_loc, whole) {
            Ok(value) => {
                object.insert(field.name().to_owned(), value);
            }
            Err(field_errors) => errors.extend(field_errors),
        }
    }

    if errors.is_empty() { Ok(Value::Object(object)) } else { Err(errors) }
}

fn with_segment(loc: &[LocItem], segment: LocItem) -> Vec<LocItem> {
    let mut loc = loc.to_vec();
    loc.push(segment);
    loc
}

/// Checks `constraints` against the coerced `value` in declaration order.
///
/// The first violation is returned; its `input` is the raw value, not the coerced one. A null
/// value (an optional parameter given as null) satisfies every constraint.
pub fn check_constraints(
    constraints: &[Constraint],
    value: &Value,
    loc: &[LocItem],
    raw: &RawValue,
) -> Result<(), ValidationError> {
    if value.is_null() {
        return Ok(());
    }

    for constraint in constraints {
        if let Some((error_type, msg)) = violation(constraint, value) {
            let ctx_value = match constraint {
                Constraint::Gt(b) | Constraint::Ge(b) | Constraint::Lt(b) | Constraint::Le(b) | Constraint::MultipleOf(b) => {
                    b.to_json()
                }
                Constraint::MinLength(n) | Constraint::MaxLength(n) => Value::from(*n),
                Constraint::Pattern(p) => Value::String(p.as_str().to_owned()),
            };
            return Err(ValidationError::new(error_type, loc.to_vec(), msg, raw.to_input())
                .with_ctx_value(constraint.name(), ctx_value));
        }
    }
    Ok(())
}

fn violation(constraint: &Constraint, value: &Value) -> Option<(&'static str, String)> {
    match constraint {
        Constraint::Gt(b) => (compare(value, *b)? != Ordering::Greater)
            .then(|| (error_types::GREATER_THAN, format!("Input should be greater than {b}"))),
        Constraint::Ge(b) => (compare(value, *b)? == Ordering::Less)
            .then(|| (error_types::GREATER_THAN_EQUAL, format!("Input should be greater than or equal to {b}"))),
        Constraint::Lt(b) => (compare(value, *b)? != Ordering::Less)
            .then(|| (error_types::LESS_THAN, format!("Input should be less than {b}"))),
        Constraint::Le(b) => (compare(value, *b)? == Ordering::Greater)
            .then(|| (error_types::LESS_THAN_EQUAL, format!("Input should be less than or equal to {b}"))),
        Constraint::MultipleOf(b) => (!is_multiple_of(value, *b)?)
            .then(|| (error_types::MULTIPLE_OF, format!("Input should be a multiple of {b}"))),
        Constraint::MinLength(min) => match value {
            Value::String(s) => (s.chars().count() < *min).then(|| {
                (error_types::STRING_TOO_SHORT, format!("String should have at least {min} character{}", plural(*min)))
            }),
            Value::Array(items) => (items.len() < *min).then(|| {
                let msg = format!("List should have at least {min} item{} after validation, not {}", plural(*min), items.len());
                (error_types::TOO_SHORT, msg)
            }),
            _ => None,
        },
        Constraint::MaxLength(max) => match value {
            Value::String(s) => (s.chars().count() > *max).then(|| {
                (error_types::STRING_TOO_LONG, format!("String should have at most {max} character{}", plural(*max)))
            }),
            Value::Array(items) => (items.len() > *max).then(|| {
                let msg = format!("List should have at most {max} item{} after validation, not {}", plural(*max), items.len());
                (error_types::TOO_LONG, msg)
            }),
            _ => None,
        },
        Constraint::Pattern(p) => {
            let text = value.as_str()?;
            (!p.is_match(text))
                .then(|| (error_types::STRING_PATTERN_MISMATCH, format!("String should match pattern '{}'", p.as_str())))
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Compares a coerced number with a bound, exactly when both are integers.
fn compare(value: &Value, bound: Bound) -> Option<Ordering> {
    match (value.as_i64(), bound) {
        (Some(v), Bound::Int(b)) => Some(v.cmp(&b)),
        _ => value.as_f64()?.partial_cmp(&bound.as_f64()),
    }
}

fn is_multiple_of(value: &Value, bound: Bound) -> Option<bool> {
    if let (Some(v), Bound::Int(b)) = (value.as_i64(), bound) {
        return Some(v.checked_rem(b).is_none_or(|r| r == 0));
    }
    let (v, b) = (value.as_f64()?, bound.as_f64());
    let remainder = (v % b).abs();
    Some(remainder < 1e-9 || (b.abs() - remainder).abs() < 1e-9)
}
