//! Error taxonomy for Ferrodoc
//!
//! Every failure that leaves the crate is tagged with an [`ErrorKind`]. Callers
//! branch on the kind (`err.kind()` or the `is_*` helpers) and keep the detail
//! string for diagnostics only.

use std::fmt;

/// Main result type for Ferrodoc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidId,
    Validation,
    Middleware,
    NilCollection,
    Database,
    Connection,
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::InvalidId => "invalid id",
            ErrorKind::Validation => "validation failed",
            ErrorKind::Middleware => "middleware failed",
            ErrorKind::NilCollection => "nil collection",
            ErrorKind::Database => "database operation failed",
            ErrorKind::Connection => "connection failed",
            ErrorKind::Decode => "decode failed",
        };
        f.write_str(name)
    }
}

/// Ferrodoc error type
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("invalid id: {0}")]
    InvalidId(String),
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("middleware failed: {0}")]
    Middleware(String),
    #[error("collection is nil")]
    NilCollection,
    #[error("database operation failed: {0}")]
    Database(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidId(_) => ErrorKind::InvalidId,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Middleware(_) => ErrorKind::Middleware,
            Error::NilCollection => ErrorKind::NilCollection,
            Error::Database(_) => ErrorKind::Database,
            Error::Connection(_) => ErrorKind::Connection,
            Error::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Build a validation error carrying a single document-level violation
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(ValidationErrors::single(None, Rule::Document, message))
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_invalid_id(&self) -> bool {
        self.kind() == ErrorKind::InvalidId
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    pub fn is_middleware(&self) -> bool {
        self.kind() == ErrorKind::Middleware
    }

    pub fn is_nil_collection(&self) -> bool {
        self.kind() == ErrorKind::NilCollection
    }

    pub fn is_database(&self) -> bool {
        self.kind() == ErrorKind::Database
    }

    pub fn is_connection(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }

    pub fn is_decode(&self) -> bool {
        self.kind() == ErrorKind::Decode
    }

    /// Detail text without the kind prefix
    pub fn details(&self) -> String {
        match self {
            Error::NotFound(d)
            | Error::InvalidId(d)
            | Error::Middleware(d)
            | Error::Database(d)
            | Error::Connection(d)
            | Error::Decode(d) => d.clone(),
            Error::Validation(v) => v.to_string(),
            Error::NilCollection => String::new(),
        }
    }

    /// Structured violations when this is a validation error
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Error::Validation(v) => Some(v),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

/// Which check produced a [`Violation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// The instance as a whole (not a record, decode failure)
    Document,
    Required,
    Min,
    Max,
    Enum,
    /// Per-field predicate
    Custom,
    /// Whole-document validator supplied by the caller
    Validator,
    /// Update payload could not be normalized
    Payload,
    /// Value does not match the declared field type
    Type,
}

/// One failed rule on one field
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub field: Option<String>,
    pub rule: Rule,
    pub message: String,
}

/// All violations found in a single validation pass, in field-name order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    violations: Vec<Violation>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: Option<String>, rule: Rule, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, rule, message);
        errors
    }

    pub fn push(&mut self, field: Option<String>, rule: Rule, message: impl Into<String>) {
        self.violations.push(Violation { field, rule, message: message.into() });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Violations reported against `field`
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.violations.iter().filter(move |v| v.field.as_deref() == Some(field))
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.violations.iter().map(|v| v.message.as_str()).collect();
        f.write_str(&messages.join("; "))
    }
}
