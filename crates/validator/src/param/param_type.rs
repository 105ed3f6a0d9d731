use crate::error::SpecError;
use crate::param::{ParamBuilder, ParamSpec};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// The declared target type of a parameter.
///
/// A closed set, so the coercion engine can match on it exhaustively.
#[derive(Debug, Clone)]
pub enum ParamType {
    Integer,
    Float,
    Bool,
    String,
    List(Box<ParamType>),
    Optional(Box<ParamType>),
    Object(Arc<ObjectSchema>),
}

impl ParamType {
    pub fn list(item: ParamType) -> Self {
        ParamType::List(Box::new(item))
    }

    pub fn optional(inner: ParamType) -> Self {
        ParamType::Optional(Box::new(inner))
    }

    pub fn object(schema: ObjectSchema) -> Self {
        ParamType::Object(Arc::new(schema))
    }

    /// The type with any `Optional` wrappers removed.
    pub fn inner(&self) -> &ParamType {
        match self {
            ParamType::Optional(inner) => inner.inner(),
            other => other,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.inner(), ParamType::Integer | ParamType::Float)
    }

    pub fn has_length(&self) -> bool {
        matches!(self.inner(), ParamType::String | ParamType::List(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.inner(), ParamType::List(_))
    }
}

impl Display for ParamType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Integer => f.write_str("integer"),
            ParamType::Float => f.write_str("float"),
            ParamType::Bool => f.write_str("boolean"),
            ParamType::String => f.write_str("string"),
            ParamType::List(item) => write!(f, "list of {item}"),
            ParamType::Optional(inner) => write!(f, "optional {inner}"),
            ParamType::Object(schema) => write!(f, "object {}", schema.name()),
        }
    }
}

/// A nested structured type: a name plus one [`ParamSpec`] per field, in declaration order.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    name: String,
    fields: Vec<ParamSpec>,
}

impl ObjectSchema {
    pub fn builder(name: impl Into<String>) -> ObjectSchemaBuilder {
        ObjectSchemaBuilder { name: name.into(), fields: vec![] }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[ParamSpec] {
        &self.fields
    }
}

#[derive(Debug)]
pub struct ObjectSchemaBuilder {
    name: String,
    fields: Vec<ParamBuilder>,
}

impl ObjectSchemaBuilder {
    pub fn field(mut self, field: ParamBuilder) -> Self {
        self.fields.push(field);
        self
    }

    pub fn build(self) -> Result<ObjectSchema, SpecError> {
        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        for builder in self.fields {
            let spec = builder.build()?;
            if !seen.insert(spec.name().to_owned()) {
                return Err(SpecError::duplicate_field(&self.name, spec.name()));
            }
            fields.push(spec);
        }
        Ok(ObjectSchema { name: self.name, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::field;

    #[test]
    fn test_inner_strips_optional() {
        let ty = ParamType::optional(ParamType::optional(ParamType::Integer));
        assert!(matches!(ty.inner(), ParamType::Integer));
        assert!(ty.is_numeric());
        assert!(!ty.has_length());
    }

    #[test]
    fn test_display() {
        assert_eq!(ParamType::list(ParamType::Integer).to_string(), "list of integer");
        let schema = ObjectSchema::builder("User").build().unwrap();
        assert_eq!(ParamType::object(schema).to_string(), "object User");
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = ObjectSchema::builder("User").field(field("name").string()).field(field("name").string()).build();
        assert!(matches!(result, Err(SpecError::DuplicateField { .. })));
    }

    #[test]
    fn test_fields_keep_declaration_order() {
        let schema = ObjectSchema::builder("User")
            .field(field("name").string())
            .field(field("address").string())
            .build()
            .unwrap();
        let names = schema.fields().iter().map(ParamSpec::name).collect::<Vec<_>>();
        assert_eq!(names, ["name", "address"]);
    }
}
