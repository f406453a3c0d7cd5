//! Entity engine error types.

use thiserror::Error;

/// Errors raised while building or looking up a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// No definition source is registered for the class.
    #[error("unknown entity class: {0}")]
    UnknownClass(String),

    /// A property refers to a type tag missing from the type registry.
    #[error("unknown property type '{type_tag}' for {class}.{property}")]
    UnknownType {
        /// Entity class being built.
        class: String,
        /// Property name.
        property: String,
        /// The unresolved type tag.
        type_tag: String,
    },

    /// A default value refers to a provider missing from the registry.
    #[error("unknown default provider: {0}")]
    UnknownDefaultProvider(String),

    /// The same property name was declared twice.
    #[error("duplicate property {property} in {class}")]
    DuplicateProperty {
        /// Entity class being built.
        class: String,
        /// Property name (lower-cased).
        property: String,
    },

    /// The schema is otherwise malformed.
    #[error("invalid schema for {class}: {reason}")]
    InvalidSchema {
        /// Entity class being built.
        class: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Errors raised while coercing a value on the soft set path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    /// A string could not be parsed with the expected date format.
    #[error("invalid date '{value}', expected format {format}")]
    InvalidDate {
        /// The rejected input.
        value: String,
        /// Expected chrono format string.
        format: &'static str,
    },

    /// A value could not be read as an integer.
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// A value cannot become an entity reference for this property.
    #[error("invalid reference for {property}: {reason}")]
    InvalidReference {
        /// Property name.
        property: String,
        /// Why the reference was rejected.
        reason: String,
    },

    /// Raised by a custom property type.
    #[error("{0}")]
    Custom(String),
}

/// Entity engine errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema or registry error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Coercion error on the soft set path.
    #[error("coercion error: {0}")]
    Coercion(#[from] CoercionError),

    /// A pre-set hook refused the write.
    #[error("write to '{property}' vetoed: {reason}")]
    Vetoed {
        /// Property name.
        property: String,
        /// Reason given by the hook.
        reason: String,
    },

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for entity operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a veto error for a pre-set hook.
    pub fn vetoed(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Vetoed {
            property: property.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error came from value coercion.
    pub fn is_coercion(&self) -> bool {
        matches!(self, Error::Coercion(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err: Error = SchemaError::UnknownClass("Article".into()).into();
        assert_eq!(err.to_string(), "schema error: unknown entity class: Article");

        let err: Error = CoercionError::InvalidInteger("abc".into()).into();
        assert!(err.is_coercion());
        assert_eq!(err.to_string(), "coercion error: invalid integer: abc");

        let err = Error::vetoed("title", "read only");
        assert_eq!(err.to_string(), "write to 'title' vetoed: read only");
    }
}
