//! Post-coercion predicates attached to a parameter.

use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// A numeric bound, kept as declared so error contexts echo `10` for `gt(10)` and `1.5` for
/// `gt(1.5)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Int(i64),
    Float(f64),
}

impl Bound {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Bound::Int(i) => i as f64,
            Bound::Float(f) => f,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Bound::Int(_) => true,
            Bound::Float(f) => f.is_finite(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Bound::Int(i) => i == 0,
            Bound::Float(f) => f == 0.0,
        }
    }

    pub fn to_json(&self) -> Value {
        match *self {
            Bound::Int(i) => Value::from(i),
            Bound::Float(f) => Value::from(f),
        }
    }
}

impl Display for Bound {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            Bound::Int(i) => write!(f, "{i}"),
            Bound::Float(v) => write_float(f, v),
        }
    }
}

/// Writes `v` the way Python's float `repr` does: positional between `1e-4` and `1e16`, always
/// with a fractional part, otherwise in exponent form with a signed two-digit exponent.
fn write_float(f: &mut Formatter<'_>, v: f64) -> fmt::Result {
    if !v.is_finite() {
        return write!(f, "{v}");
    }

    let scientific = format!("{v:e}");
    let (mantissa, exp) = match scientific.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if (-4..16).contains(&exp) {
        let plain = v.to_string();
        if plain.contains('.') { f.write_str(&plain) } else { write!(f, "{plain}.0") }
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        write!(f, "{mantissa}e{sign}{:02}", exp.unsigned_abs())
    }
}

impl Serialize for Bound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Bound::Int(i) => serializer.serialize_i64(i),
            Bound::Float(f) => serializer.serialize_f64(f),
        }
    }
}

macro_rules! impl_bound_from_int {
    ($($t:ty)*) => {
        $(
        impl From<$t> for Bound {
            fn from(value: $t) -> Self {
                Bound::Int(i64::from(value))
            }
        }
        )*
    };
}

impl_bound_from_int! { i8 i16 i32 i64 u8 u16 u32 }

impl From<f32> for Bound {
    fn from(value: f32) -> Self {
        Bound::Float(f64::from(value))
    }
}

impl From<f64> for Bound {
    fn from(value: f64) -> Self {
        Bound::Float(value)
    }
}

/// A compiled regular expression together with the pattern text it came from.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&source)?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

#[derive(Debug, Clone)]
pub enum Constraint {
    Gt(Bound),
    Ge(Bound),
    Lt(Bound),
    Le(Bound),
    MultipleOf(Bound),
    MinLength(usize),
    MaxLength(usize),
    Pattern(Pattern),
}

impl Constraint {
    /// The constraint's keyword, also used as its `ctx` key.
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Gt(_) => "gt",
            Constraint::Ge(_) => "ge",
            Constraint::Lt(_) => "lt",
            Constraint::Le(_) => "le",
            Constraint::MultipleOf(_) => "multiple_of",
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::Pattern(_) => "pattern",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Constraint::Gt(_) | Constraint::Ge(_) | Constraint::Lt(_) | Constraint::Le(_) | Constraint::MultipleOf(_)
        )
    }

    pub fn is_length(&self) -> bool {
        matches!(self, Constraint::MinLength(_) | Constraint::MaxLength(_))
    }
}

/// Finds the first pair of constraints no value could satisfy together.
pub(crate) fn find_contradiction(constraints: &[Constraint]) -> Option<String> {
    let lower = constraints.iter().filter_map(|c| match c {
        Constraint::Gt(b) => Some((c.name(), *b, true)),
        Constraint::Ge(b) => Some((c.name(), *b, false)),
        _ => None,
    });

    for (lower_name, lower_bound, lower_strict) in lower {
        let upper = constraints.iter().filter_map(|c| match c {
            Constraint::Lt(b) => Some((c.name(), *b, true)),
            Constraint::Le(b) => Some((c.name(), *b, false)),
            _ => None,
        });
        for (upper_name, upper_bound, upper_strict) in upper {
            let (lo, up) = (lower_bound.as_f64(), upper_bound.as_f64());
            if lo > up || (lo == up && (lower_strict || upper_strict)) {
                return Some(format!("{lower_name}={lower_bound} excludes {upper_name}={upper_bound}"));
            }
        }
    }

    let min = constraints.iter().filter_map(|c| match c {
        Constraint::MinLength(n) => Some(*n),
        _ => None,
    });
    for min_length in min {
        let max = constraints.iter().filter_map(|c| match c {
            Constraint::MaxLength(n) => Some(*n),
            _ => None,
        });
        for max_length in max {
            if min_length > max_length {
                return Some(format!("min_length={min_length} exceeds max_length={max_length}"));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_display_keeps_declared_kind() {
        assert_eq!(Bound::from(10).to_string(), "10");
        assert_eq!(Bound::from(10.0).to_string(), "10.0");
        assert_eq!(Bound::from(1.5).to_string(), "1.5");
        assert_eq!(Bound::from(-3).to_json(), serde_json::json!(-3));
    }

    #[test]
    fn test_bound_display_of_extreme_floats() {
        assert_eq!(Bound::from(1e20).to_string(), "1e+20");
        assert_eq!(Bound::from(-2.5e16).to_string(), "-2.5e+16");
        assert_eq!(Bound::from(1e15).to_string(), "1000000000000000.0");
        assert_eq!(Bound::from(0.0001).to_string(), "0.0001");
        assert_eq!(Bound::from(0.00001).to_string(), "1e-05");
        assert_eq!(Bound::from(1.5e-7).to_string(), "1.5e-07");
    }

    #[test]
    fn test_contradiction_between_bounds() {
        assert!(find_contradiction(&[Constraint::Gt(Bound::Int(10)), Constraint::Le(Bound::Int(5))]).is_some());
        assert!(find_contradiction(&[Constraint::Gt(Bound::Int(5)), Constraint::Le(Bound::Int(5))]).is_some());
        assert!(find_contradiction(&[Constraint::Ge(Bound::Int(5)), Constraint::Le(Bound::Int(5))]).is_none());
        assert!(find_contradiction(&[Constraint::Gt(Bound::Int(1)), Constraint::Lt(Bound::Float(1.5))]).is_none());
    }

    #[test]
    fn test_contradiction_between_lengths() {
        assert!(find_contradiction(&[Constraint::MinLength(4), Constraint::MaxLength(3)]).is_some());
        assert!(find_contradiction(&[Constraint::MinLength(3), Constraint::MaxLength(3)]).is_none());
    }

    #[test]
    fn test_pattern_searches_anywhere() {
        let pattern = Pattern::new("[0-9]+").unwrap();
        assert!(pattern.is_match("abc123"));
        assert!(!pattern.is_match("abc"));
        assert_eq!(pattern.as_str(), "[0-9]+");
    }
}
