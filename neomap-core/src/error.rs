//! Error types for neomap operations.

use thiserror::Error;

/// Unified error type for all neomap operations.
///
/// Conversion helpers wrap errors with [`Context`](NeomapError::Context)
/// via [`with_context`](NeomapError::with_context), producing chained
/// messages like:
///
/// ```text
/// Person::age (key 'age'): type mismatch: expected Integer, got String (i64)
/// ```
#[derive(Error, Debug)]
pub enum NeomapError {
    /// Registry configuration is invalid (e.g. both or neither of the two
    /// mutually exclusive naming strategies were supplied).
    #[error("configuration error: {0}")]
    Config(String),

    /// A complex (value-object) field was null at flatten time.
    ///
    /// Complex fields are non-nullable by convention; emitting a partial
    /// record would be silently lossy, so the whole flatten fails.
    #[error("complex field '{field}' is null; complex fields must be set before flattening")]
    ComplexNull { field: String },

    /// A complex field's own field set contains another complex or
    /// navigation field. Complex types cannot be nested.
    #[error("complex types cannot be nested: field '{field}' of '{type_name}'")]
    NestedComplex { field: String, type_name: String },

    /// No registered subtype's field set structurally matches a flat record.
    #[error("no registered type under '{base}' matches record keys [{keys}]")]
    NoMatchingType { base: String, keys: String },

    /// A navigation field's declared foreign key does not exist on the type.
    #[error("foreign key '{expected}' for navigation field '{field}' not found")]
    MissingForeignKey { field: String, expected: String },

    /// A field resolved to the reserved null-tracking sentinel name.
    #[error("field '{field}' collides with the null-tracking sentinel key")]
    SentinelCollision { field: String },

    /// A projection or predicate expression does not match a recognized shape.
    #[error("unsupported expression shape: {0}")]
    ExpressionShape(String),

    /// A literal sub-expression could not be evaluated.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// A general mapping error with a freeform message.
    #[error("mapping error: {0}")]
    Mapping(String),

    /// A required property was not found on a node.
    #[error("missing property '{property}' on {label}")]
    MissingProperty { property: String, label: String },

    /// A required field was not found in a query result row.
    #[error("missing field '{field}' on {struct_name}")]
    MissingField { field: String, struct_name: String },

    /// A `BoltType` variant did not match the expected Rust type.
    #[error("type mismatch: expected {expected}, got {got} ({context})")]
    TypeMismatch {
        expected: String,
        got: String,
        context: String,
    },

    /// Wraps an inner error with additional context (type name, field, key).
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<NeomapError>,
    },

    /// A `neo4rs::Error` from the underlying driver.
    #[error("neo4j error: {0}")]
    Neo4j(#[from] neo4rs::Error),

    /// A serde_json error from entity serialization or deserialization.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NeomapError {
    /// Create a [`TypeMismatch`](NeomapError::TypeMismatch) error.
    pub fn type_mismatch(expected: &str, got: &str, context: &str) -> Self {
        NeomapError::TypeMismatch {
            expected: expected.to_owned(),
            got: got.to_owned(),
            context: context.to_owned(),
        }
    }

    /// Create a [`MissingProperty`](NeomapError::MissingProperty) error.
    pub fn missing_property(property: &str, label: &str) -> Self {
        NeomapError::MissingProperty {
            property: property.to_owned(),
            label: label.to_owned(),
        }
    }

    /// Create a [`MissingField`](NeomapError::MissingField) error.
    pub fn missing_field(field: &str, struct_name: &str) -> Self {
        NeomapError::MissingField {
            field: field.to_owned(),
            struct_name: struct_name.to_owned(),
        }
    }

    /// Create a [`ComplexNull`](NeomapError::ComplexNull) error.
    pub fn complex_null(field: &str) -> Self {
        NeomapError::ComplexNull {
            field: field.to_owned(),
        }
    }

    /// Create a [`NestedComplex`](NeomapError::NestedComplex) error.
    pub fn nested_complex(field: &str, type_name: &str) -> Self {
        NeomapError::NestedComplex {
            field: field.to_owned(),
            type_name: type_name.to_owned(),
        }
    }

    /// Create a [`NoMatchingType`](NeomapError::NoMatchingType) error from a
    /// base type name and the record's key set.
    pub fn no_matching_type<'a>(base: &str, keys: impl IntoIterator<Item = &'a str>) -> Self {
        NeomapError::NoMatchingType {
            base: base.to_owned(),
            keys: keys.into_iter().collect::<Vec<_>>().join(", "),
        }
    }

    /// Wrap this error with additional context, producing a
    /// [`Context`](NeomapError::Context) variant.
    ///
    /// ```rust
    /// # use neomap_core::NeomapError;
    /// let err = NeomapError::type_mismatch("Integer", "String", "i64");
    /// let wrapped = err.with_context("Person::age (key 'age')");
    /// assert!(wrapped.to_string().contains("Person::age"));
    /// ```
    pub fn with_context(self, ctx: impl Into<String>) -> Self {
        NeomapError::Context {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// True for schema/metadata errors (the per-operation fatal category).
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            NeomapError::ComplexNull { .. }
                | NeomapError::NestedComplex { .. }
                | NeomapError::NoMatchingType { .. }
                | NeomapError::MissingForeignKey { .. }
                | NeomapError::SentinelCollision { .. }
        )
    }
}
