//! Error types for model declaration and relation resolution.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while declaring models or resolving relations.
///
/// Every variant except the I/O and TOML ones is a configuration error: it is
/// fatal to the offending declaration and is never retried.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading a file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(strata::schema::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A relation and its inverse declare different foreign keys.
    #[error(
        "{relation} foreign key \"{foreign_key}\" must equal \"{inverse_foreign_key}\" specified by {inverse} relation"
    )]
    #[diagnostic(
        code(strata::schema::foreign_key_mismatch),
        help("declare the foreign key on only one side, or make both sides agree")
    )]
    ForeignKeyMismatch {
        relation: String,
        foreign_key: String,
        inverse: String,
        inverse_foreign_key: String,
    },

    /// More than one relation could terminate a through-relation.
    #[error(
        "{relation} is ambiguous: {model} has relations {candidates} targeting {target}; specify a `source`"
    )]
    #[diagnostic(code(strata::schema::ambiguous_source))]
    AmbiguousSource {
        relation: String,
        model: String,
        target: String,
        candidates: String,
    },

    /// No relation could terminate a through-relation.
    #[error("{relation} cannot find source relation \"{source_name}\" on {model}")]
    #[diagnostic(code(strata::schema::missing_source))]
    MissingSource {
        relation: String,
        model: String,
        source_name: String,
    },

    /// A through-relation expands back into itself.
    #[error("{relation} forms a cycle through {path}")]
    #[diagnostic(code(strata::schema::cyclic_through))]
    CyclicThrough { relation: String, path: String },

    /// A through declaration is malformed.
    #[error("{relation} has an invalid through configuration: {message}")]
    #[diagnostic(code(strata::schema::invalid_through))]
    InvalidThrough { relation: String, message: String },

    /// A relation references a model that was never declared.
    #[error("unknown model `{name}`")]
    #[diagnostic(code(strata::schema::unknown_model))]
    UnknownModel { name: String },

    /// A relation name does not exist on a model.
    #[error("no relation \"{relation}\" on {model}")]
    #[diagnostic(code(strata::schema::unknown_relation))]
    UnknownRelation { model: String, relation: String },

    /// Duplicate definition.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(strata::schema::duplicate))]
    Duplicate { kind: String, name: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    #[diagnostic(code(strata::schema::config_error))]
    ConfigError { message: String },

    /// TOML parsing error.
    #[error("failed to parse TOML")]
    #[diagnostic(code(strata::schema::toml_error))]
    TomlError {
        #[source]
        source: toml::de::Error,
    },
}

impl SchemaError {
    /// Create a foreign key mismatch error.
    pub fn foreign_key_mismatch(
        relation: impl Into<String>,
        foreign_key: impl Into<String>,
        inverse: impl Into<String>,
        inverse_foreign_key: impl Into<String>,
    ) -> Self {
        Self::ForeignKeyMismatch {
            relation: relation.into(),
            foreign_key: foreign_key.into(),
            inverse: inverse.into(),
            inverse_foreign_key: inverse_foreign_key.into(),
        }
    }

    /// Create an unknown model error.
    pub fn unknown_model(name: impl Into<String>) -> Self {
        Self::UnknownModel { name: name.into() }
    }

    /// Create an unknown relation error.
    pub fn unknown_relation(model: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            model: model.into(),
            relation: relation.into(),
        }
    }

    /// Create an invalid through error.
    pub fn invalid_through(relation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidThrough {
            relation: relation.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Whether this error came from relation configuration rather than file
    /// loading.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::IoError { .. } | Self::TomlError { .. })
    }
}

#[cfg(test)]
#[allow(unused_assignments)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_key_mismatch_display() {
        let err = SchemaError::foreign_key_mismatch("User.blogs", "authorId", "Blog.owner", "ownerId");
        let display = err.to_string();
        assert!(display.contains("User.blogs"));
        assert!(display.contains("Blog.owner"));
        assert!(display.contains("\"authorId\""));
        assert!(display.contains("\"ownerId\""));
    }

    #[test]
    fn test_unknown_relation_display() {
        let err = SchemaError::unknown_relation("User", "streets");
        assert_eq!(err.to_string(), "no relation \"streets\" on User");
    }

    #[test]
    fn test_cyclic_display() {
        let err = SchemaError::CyclicThrough {
            relation: "Site.loop".to_string(),
            path: "Site.a -> Site.b -> Site.a".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("cycle"));
        assert!(display.contains("Site.a -> Site.b"));
    }

    #[test]
    fn test_is_configuration() {
        assert!(SchemaError::unknown_model("user").is_configuration());
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SchemaError::IoError {
            path: "strata.toml".to_string(),
            source: io_err,
        };
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_error_debug() {
        let err = SchemaError::duplicate("model", "user");
        let debug = format!("{:?}", err);
        assert!(debug.contains("Duplicate"));
        assert!(debug.contains("user"));
    }
}
