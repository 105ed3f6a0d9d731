//! Parameter descriptors.
//!
//! A handler's parameters are declared once, up front, with the builder functions of this module:
//!
//! ```
//! use micro_validator::param::{body, field, path, query, ObjectSchema};
//!
//! # fn main() -> Result<(), micro_validator::SpecError> {
//! let user_id = path("user_id").integer().gt(10).build()?;
//! let q = query("q").string().min_length(3).optional().build()?;
//! let user = ObjectSchema::builder("User")
//!     .field(field("name").string())
//!     .field(field("address").string())
//!     .build()?;
//! let user = body("user").object(user).build()?;
//! # let _ = (user_id, q, user);
//! # Ok(())
//! # }
//! ```
//!
//! The resulting [`ParamSpec`]s are immutable and shared by every request of the handler.

mod constraint;
mod param_type;

pub use constraint::{Bound, Constraint, Pattern};
pub use param_type::{ObjectSchema, ObjectSchemaBuilder, ParamType};

use crate::error::SpecError;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// The part of the request a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Path,
    Query,
    Header,
    Cookie,
    Body,
}

impl Source {
    /// The first segment of every error location of this source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Path => "path",
            Source::Query => "query",
            Source::Header => "header",
            Source::Cookie => "cookie",
            Source::Body => "body",
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The immutable declaration of one handler parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    name: String,
    source: Source,
    target_type: ParamType,
    constraints: Vec<Constraint>,
    default: Option<Value>,
    alias: Option<String>,
    embed: bool,
}

impl ParamSpec {
    /// Returns the parameter name, as the handler sees it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the part of the request the value is read from.
    pub fn source(&self) -> Source {
        self.source
    }

    /// Returns the type the raw value is coerced to.
    pub fn target_type(&self) -> &ParamType {
        &self.target_type
    }

    /// Constraints in declaration order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Returns the value used when the parameter is absent.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// A parameter is required unless it has a default.
    pub fn required(&self) -> bool {
        self.default.is_none()
    }

    /// Whether a lone body parameter reads its own key rather than the whole body.
    pub fn embed(&self) -> bool {
        self.embed
    }

    /// The key looked up in the request.
    ///
    /// An explicit alias wins; header names otherwise have their underscores turned into hyphens.
    pub fn lookup_name(&self) -> String {
        match (&self.alias, self.source) {
            (Some(alias), _) => alias.clone(),
            (None, Source::Header) => self.name.replace('_', "-"),
            (None, _) => self.name.clone(),
        }
    }
}

/// Declares a path template variable, e.g. `user_id` in `/users/{user_id}`.
pub fn path(name: impl Into<String>) -> ParamBuilder {
    ParamBuilder::new(name, Source::Path)
}

/// Declares a query string parameter.
pub fn query(name: impl Into<String>) -> ParamBuilder {
    ParamBuilder::new(name, Source::Query)
}

/// Declares a header; `_` in the name is looked up as `-`.
pub fn header(name: impl Into<String>) -> ParamBuilder {
    ParamBuilder::new(name, Source::Header)
}

/// Declares a cookie.
pub fn cookie(name: impl Into<String>) -> ParamBuilder {
    ParamBuilder::new(name, Source::Cookie)
}

/// Declares a JSON body parameter.
pub fn body(name: impl Into<String>) -> ParamBuilder {
    ParamBuilder::new(name, Source::Body)
}

/// Declares a field of an [`ObjectSchema`].
pub fn field(name: impl Into<String>) -> ParamBuilder {
    ParamBuilder::new(name, Source::Body)
}

/// Builder for [`ParamSpec`].
///
/// Constraints are kept in the order they are added. Misuse (a bad pattern, a `NaN` bound, a
/// constraint that does not fit the type) is remembered and reported by [`ParamBuilder::build`].
#[derive(Debug)]
pub struct ParamBuilder {
    name: String,
    source: Source,
    target_type: ParamType,
    optional: bool,
    constraints: Vec<Constraint>,
    default: Option<Value>,
    alias: Option<String>,
    embed: bool,
    error: Option<SpecError>,
}

impl ParamBuilder {
    fn new(name: impl Into<String>, source: Source) -> Self {
        Self {
            name: name.into(),
            source,
            target_type: ParamType::String,
            optional: false,
            constraints: vec![],
            default: None,
            alias: None,
            embed: false,
            error: None,
        }
    }

    /// Sets the target type.
    pub fn of(mut self, target_type: ParamType) -> Self {
        self.target_type = target_type;
        self
    }

    /// Coerces to a signed 64-bit integer.
    pub fn integer(self) -> Self {
        self.of(ParamType::Integer)
    }

    /// Coerces to a finite float.
    pub fn float(self) -> Self {
        self.of(ParamType::Float)
    }

    /// Coerces to a boolean.
    pub fn boolean(self) -> Self {
        self.of(ParamType::Bool)
    }

    /// Keeps the value as text; the default type.
    pub fn string(self) -> Self {
        self.of(ParamType::String)
    }

    /// Collects every value of a repeated query entry or header, or a JSON array.
    pub fn list(self, item: ParamType) -> Self {
        self.of(ParamType::list(item))
    }

    /// Coerces a JSON object field by field.
    pub fn object(self, schema: ObjectSchema) -> Self {
        self.of(ParamType::object(schema))
    }

    /// Accepts null and makes the parameter optional, defaulting to null unless
    /// [`ParamBuilder::default`] says otherwise.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Makes the parameter optional with `value` as its fallback.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Looks the value up under `alias` instead of the parameter name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Reads a lone body parameter from its own key instead of binding the whole body.
    pub fn embed(mut self) -> Self {
        self.embed = true;
        self
    }

    /// Value must be greater than `bound`.
    pub fn gt(self, bound: impl Into<Bound>) -> Self {
        self.bound(bound.into(), Constraint::Gt)
    }

    /// Value must be greater than or equal to `bound`.
    pub fn ge(self, bound: impl Into<Bound>) -> Self {
        self.bound(bound.into(), Constraint::Ge)
    }

    /// Value must be less than `bound`.
    pub fn lt(self, bound: impl Into<Bound>) -> Self {
        self.bound(bound.into(), Constraint::Lt)
    }

    /// Value must be less than or equal to `bound`.
    pub fn le(self, bound: impl Into<Bound>) -> Self {
        self.bound(bound.into(), Constraint::Le)
    }

    /// Value must be a multiple of `bound`, which must not be zero.
    pub fn multiple_of(self, bound: impl Into<Bound>) -> Self {
        self.bound(bound.into(), Constraint::MultipleOf)
    }

    /// Minimum length: characters for strings, items for lists.
    pub fn min_length(mut self, length: usize) -> Self {
        self.constraints.push(Constraint::MinLength(length));
        self
    }

    /// Maximum length: characters for strings, items for lists.
    pub fn max_length(mut self, length: usize) -> Self {
        self.constraints.push(Constraint::MaxLength(length));
        self
    }

    /// The string must contain a match of the regular expression.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        match Pattern::new(pattern) {
            Ok(pattern) => self.constraints.push(Constraint::Pattern(pattern)),
            Err(source) => self.fail(SpecError::InvalidPattern { name: self.name.clone(), source }),
        }
        self
    }

    fn bound(mut self, bound: Bound, constraint: fn(Bound) -> Constraint) -> Self {
        let constraint = constraint(bound);
        if bound.is_finite() {
            self.constraints.push(constraint);
        } else {
            self.fail(SpecError::NonFiniteBound { name: self.name.clone(), constraint: constraint.name() });
        }
        self
    }

    fn fail(&mut self, error: SpecError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Checks the declaration and freezes it into a [`ParamSpec`].
    pub fn build(self) -> Result<ParamSpec, SpecError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        for constraint in &self.constraints {
            let applicable = match constraint {
                Constraint::Pattern(_) => matches!(self.target_type.inner(), ParamType::String),
                c if c.is_length() => self.target_type.has_length(),
                _ => self.target_type.is_numeric(),
            };
            if !applicable {
                return Err(SpecError::not_applicable(&self.name, constraint.name(), &self.target_type));
            }
            if let Constraint::MultipleOf(bound) = constraint
                && bound.is_zero()
            {
                return Err(SpecError::contradictory(&self.name, "multiple_of must not be zero"));
            }
        }

        if let Some(reason) = constraint::find_contradiction(&self.constraints) {
            return Err(SpecError::contradictory(&self.name, reason));
        }

        let (target_type, default) = if self.optional {
            (ParamType::optional(self.target_type), Some(self.default.unwrap_or(Value::Null)))
        } else {
            (self.target_type, self.default)
        };

        Ok(ParamSpec {
            name: self.name,
            source: self.source,
            target_type,
            constraints: self.constraints,
            default,
            alias: self.alias,
            embed: self.embed,
        })
    }
}
