use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a schema-origin configuration error.
    pub(crate) fn schema_config(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Config, ErrorOrigin::Schema, message)
    }

    /// Construct a schema-origin unsupported error.
    pub(crate) fn schema_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Schema, message)
    }

    /// Construct a schema-origin invariant violation.
    pub(crate) fn schema_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Schema, message)
    }

    /// Construct a path-origin unsupported error.
    pub(crate) fn path_unsupported(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, ErrorOrigin::Path, message)
    }

    /// Construct a path-origin invariant violation.
    pub(crate) fn path_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Path, message)
    }

    /// Construct a plan-origin invariant violation.
    pub(crate) fn plan_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Plan, message)
    }

    /// Construct a change-origin configuration error.
    pub(crate) fn change_config(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Config, ErrorOrigin::Change, message)
    }

    /// Construct a change-origin invariant violation.
    pub(crate) fn change_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Change, message)
    }

    /// Construct a change-origin conflict error.
    pub(crate) fn change_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Conflict, ErrorOrigin::Change, message)
    }

    /// Construct a backend-origin internal error.
    pub fn backend_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Backend, message)
    }

    /// Standardized error for an update that matched no stored row.
    /// Surfaced to the caller as a distinct condition; never retried.
    pub(crate) fn no_rows_updated(entity_type: &str) -> Self {
        Self::new(
            ErrorClass::NotFound,
            ErrorOrigin::Executor,
            format!("no rows updated: {entity_type}"),
        )
    }

    /// Standardized error for an unregistered entity type.
    pub(crate) fn unknown_entity_type(name: &str) -> Self {
        Self::schema_unsupported(format!("unknown entity type: '{name}'"))
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Config,
    Conflict,
    Internal,
    InvariantViolation,
    NotFound,
    Unsupported,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
            Self::InvariantViolation => "invariant_violation",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Backend,
    Change,
    Executor,
    Path,
    Plan,
    Schema,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Backend => "backend",
            Self::Change => "change",
            Self::Executor => "executor",
            Self::Path => "path",
            Self::Plan => "plan",
            Self::Schema => "schema",
        };
        write!(f, "{label}")
    }
}
