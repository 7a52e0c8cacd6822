//! Error types for query building, relation access and execution.
//!
//! Every error carries an [`ErrorCode`] for programmatic handling and an
//! [`ErrorContext`] describing what was being done when it happened.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: S{category}{number}
//! - 1xxx: Usage errors (unknown relation, invalid field, not loaded, ...)
//! - 5xxx: Adapter execution errors
//! - 7xxx: Configuration errors raised while resolving relations
//! - 9xxx: Internal errors
//!
//! ```rust
//! use strata_query::{ErrorCode, ErrorKind, QueryError};
//!
//! let err = QueryError::through_mutation("create", "User#comments");
//! assert_eq!(err.code, ErrorCode::ThroughMutation);
//! assert_eq!(err.kind(), ErrorKind::Usage);
//! assert!(err.to_string().contains("User#comments"));
//! ```

use std::fmt;

use strata_schema::SchemaError;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Usage errors (1xxx)
    /// Record not found (S1001).
    RecordNotFound = 1001,
    /// Unknown relation in `with`, `join` or `where` (S1002).
    UnknownRelation = 1002,
    /// Unknown attribute in a predicate (S1003).
    InvalidField = 1003,
    /// Mutation attempted through a through relation (S1004).
    ThroughMutation = 1004,
    /// Relation accessed before being loaded (S1005).
    RelationNotLoaded = 1005,
    /// Record has no primary key value (S1006).
    MissingPrimaryKey = 1006,
    /// Relation used with the wrong cardinality (S1007).
    RelationCardinality = 1007,

    // Adapter errors (5xxx)
    /// The adapter failed to execute a statement (S5001).
    AdapterExecution = 5001,
    /// The adapter returned data the core cannot use (S5002).
    InvalidResult = 5002,

    // Configuration errors (7xxx)
    /// Relation configuration is invalid (S7001).
    InvalidConfiguration = 7001,

    // Internal errors (9xxx)
    /// Internal error (S9001).
    Internal = 9001,
}

/// Broad classification of an [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Inconsistent relation declarations.
    Configuration,
    /// The caller asked for something the schema does not allow.
    Usage,
    /// The database adapter failed.
    Adapter,
    /// A bug.
    Internal,
}

impl ErrorCode {
    /// Get the error code string (e.g., "S1001").
    pub fn code(&self) -> String {
        format!("S{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::UnknownRelation => "Unknown relation",
            Self::InvalidField => "Invalid field",
            Self::ThroughMutation => "Mutation through a through relation",
            Self::RelationNotLoaded => "Relation not loaded",
            Self::MissingPrimaryKey => "Missing primary key",
            Self::RelationCardinality => "Wrong relation cardinality",
            Self::AdapterExecution => "Adapter execution error",
            Self::InvalidResult => "Invalid adapter result",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::Internal => "Internal error",
        }
    }

    /// The category this code belongs to.
    pub fn kind(&self) -> ErrorKind {
        match *self as u16 {
            1000..=1999 => ErrorKind::Usage,
            5000..=5999 => ErrorKind::Adapter,
            7000..=7999 => ErrorKind::Configuration,
            _ => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The field or relation involved.
    pub field: Option<String>,
    /// The SQL statement (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
}

/// Errors that can occur during query operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a not found error.
    pub fn not_found(model: impl Into<String>, key: impl fmt::Display) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("no {} record found with primary key {}", model, key),
        )
        .with_model(&model)
    }

    /// Create an unknown relation error for a query operation.
    pub fn unknown_relation(relation: &str, operation: &str, model: &str) -> Self {
        Self::new(
            ErrorCode::UnknownRelation,
            format!("no relation \"{}\" for `{}` in {} query", relation, operation, model),
        )
        .with_context(operation)
        .with_model(model)
        .with_field(relation)
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: &str, model: &str, class_name: &str) -> Self {
        Self::new(
            ErrorCode::InvalidField,
            format!("invalid field \"{}\" in {} query with {} class", field, model, class_name),
        )
        .with_model(model)
        .with_field(field)
    }

    /// Create an error for a mutation attempted through a through relation.
    pub fn through_mutation(operation: &str, relation: &str) -> Self {
        Self::new(
            ErrorCode::ThroughMutation,
            format!(
                "cannot {} objects through {}: it is a through relation",
                operation, relation
            ),
        )
        .with_context(operation)
        .with_field(relation)
        .with_suggestion("mutate the direct relations the through relation is composed of")
    }

    /// Create an error for accessing a relation that was never loaded.
    pub fn not_loaded(relation: &str, class_name: &str) -> Self {
        Self::new(
            ErrorCode::RelationNotLoaded,
            format!("relation \"{}\" has not yet been loaded for {}", relation, class_name),
        )
        .with_model(class_name)
        .with_field(relation)
        .with_suggestion(format!("request it with `with(\"{}\")` when querying", relation))
    }

    /// Create an error for a record without a primary key value.
    pub fn missing_primary_key(operation: &str, class_name: &str) -> Self {
        Self::new(
            ErrorCode::MissingPrimaryKey,
            format!("cannot {} {} record without a primary key value", operation, class_name),
        )
        .with_context(operation)
        .with_model(class_name)
    }

    /// Create an error for using a relation with the wrong cardinality.
    pub fn cardinality(relation: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::RelationCardinality,
            format!("{} is not a {} relation", relation, expected),
        )
        .with_field(relation)
    }

    /// Wrap an adapter failure.
    pub fn adapter<E: std::error::Error + Send + Sync + 'static>(cause: E) -> Self {
        Self::new(ErrorCode::AdapterExecution, format!("adapter execution error: {}", cause)).with_source(cause)
    }

    /// Create an adapter failure from a message.
    pub fn adapter_message(message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::AdapterExecution,
            format!("adapter execution error: {}", message.into()),
        )
    }

    /// Create an invalid result error.
    pub fn invalid_result(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResult, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, format!("internal error: {}", message.into()))
    }

    // ============== Error Checks ==============

    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Check if this is a usage error.
    pub fn is_usage(&self) -> bool {
        self.kind() == ErrorKind::Usage
    }

    /// Check if this is an adapter error.
    pub fn is_adapter(&self) -> bool {
        self.kind() == ErrorKind::Adapter
    }

    /// The wrapped schema error, for configuration errors.
    pub fn schema_error(&self) -> Option<&SchemaError> {
        self.source.as_deref().and_then(|e| e.downcast_ref::<SchemaError>())
    }
}

impl From<SchemaError> for QueryError {
    fn from(err: SchemaError) -> Self {
        let code = if err.is_configuration() {
            ErrorCode::InvalidConfiguration
        } else {
            ErrorCode::Internal
        };
        QueryError::new(code, err.to_string()).with_source(err)
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::RecordNotFound.code(), "S1001");
        assert_eq!(ErrorCode::AdapterExecution.code(), "S5001");
        assert_eq!(ErrorCode::InvalidConfiguration.code(), "S7001");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(ErrorCode::ThroughMutation.kind(), ErrorKind::Usage);
        assert_eq!(ErrorCode::AdapterExecution.kind(), ErrorKind::Adapter);
        assert_eq!(ErrorCode::InvalidConfiguration.kind(), ErrorKind::Configuration);
        assert_eq!(ErrorCode::Internal.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_unknown_relation_message() {
        let err = QueryError::unknown_relation("streets", "with", "user");
        assert_eq!(err.message, "no relation \"streets\" for `with` in user query");
        assert!(err.is_usage());
    }

    #[test]
    fn test_invalid_field_message() {
        let err = QueryError::invalid_field("invalidAttr", "user", "User");
        assert_eq!(err.message, "invalid field \"invalidAttr\" in user query with User class");
        assert_eq!(err.context.field, Some("invalidAttr".to_string()));
    }

    #[test]
    fn test_through_mutation_message() {
        let err = QueryError::through_mutation("create", "User#comments");
        assert!(err.message.contains("create"));
        assert!(err.message.contains("through"));
        assert!(err.message.contains("User#comments"));
    }

    #[test]
    fn test_not_loaded_message() {
        let err = QueryError::not_loaded("users", "Site");
        assert_eq!(err.message, "relation \"users\" has not yet been loaded for Site");
        assert!(!err.context.suggestions.is_empty());
    }

    #[test]
    fn test_from_schema_error() {
        let err: QueryError = SchemaError::unknown_model("ghost").into();
        assert!(err.is_configuration());
        assert!(matches!(err.schema_error(), Some(SchemaError::UnknownModel { .. })));
    }

    #[test]
    fn test_adapter_wraps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "connection reset");
        let err = QueryError::adapter(io);
        assert!(err.is_adapter());
        assert!(err.message.contains("connection reset"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_macro() {
        let err = query_error!(
            ErrorCode::InvalidField,
            "bad field",
            with_field = "email",
            with_suggestion = "check the attribute name"
        );

        assert_eq!(err.code, ErrorCode::InvalidField);
        assert_eq!(err.context.field, Some("email".to_string()));
        assert_eq!(err.context.suggestions.len(), 1);
    }
}
