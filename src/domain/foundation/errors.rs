//! Error types for the dispatch core.
//!
//! One error shape crosses every layer: [`CoreError`] carries a kind
//! (domain / infrastructure / application), a stable code, a human-readable
//! message, and a structured details map. Infrastructure errors additionally
//! tag the failing backend and operation inside `details` so alerting stays
//! actionable.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// Broad category an error belongs to.
///
/// The category decides propagation policy: domain and application errors
/// surface to callers unmodified; infrastructure errors are normalized by
/// the storage layer before leaving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Business-rule violation (invalid input, illegal state transition).
    Domain,
    /// Cache / database / blob / queue / runtime failure.
    Infrastructure,
    /// Workflow-sequencing issue (e.g. dispatching an unregistered command).
    Application,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Domain => "domain",
            ErrorKind::Infrastructure => "infrastructure",
            ErrorKind::Application => "application",
        };
        write!(f, "{}", s)
    }
}

/// External resource an infrastructure error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Cache,
    Database,
    Blob,
    Queue,
    Runtime,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Backend::Cache => "cache",
            Backend::Database => "database",
            Backend::Blob => "blob",
            Backend::Queue => "queue",
            Backend::Runtime => "runtime",
        };
        write!(f, "{}", s)
    }
}

/// Operation an infrastructure error occurred during.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    Read,
    Write,
    Delete,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorageOp::Read => "read",
            StorageOp::Write => "write",
            StorageOp::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Conversation state errors
    TurnAlreadyInFlight,
    NoTurnInFlight,
    ConversationNotFound,

    // Dispatch errors
    UnregisteredCommand,
    UnregisteredQuery,

    // Infrastructure errors
    StorageError,
    QueueSendFailed,
    RuntimeUnavailable,
    RuntimeStartFailed,
    RuntimeRequestFailed,

    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::TurnAlreadyInFlight => "TURN_ALREADY_IN_FLIGHT",
            ErrorCode::NoTurnInFlight => "NO_TURN_IN_FLIGHT",
            ErrorCode::ConversationNotFound => "CONVERSATION_NOT_FOUND",
            ErrorCode::UnregisteredCommand => "UNREGISTERED_COMMAND",
            ErrorCode::UnregisteredQuery => "UNREGISTERED_QUERY",
            ErrorCode::StorageError => "STORAGE_ERROR",
            ErrorCode::QueueSendFailed => "QUEUE_SEND_FAILED",
            ErrorCode::RuntimeUnavailable => "RUNTIME_UNAVAILABLE",
            ErrorCode::RuntimeStartFailed => "RUNTIME_START_FAILED",
            ErrorCode::RuntimeRequestFailed => "RUNTIME_REQUEST_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard error with kind, code, message, and structured details.
#[derive(Debug, Clone)]
pub struct CoreError {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl CoreError {
    /// Creates a domain (business-rule) error.
    pub fn domain(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Domain,
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates an application (workflow-sequencing) error.
    pub fn application(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Application,
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates an infrastructure error tagged with backend and operation.
    pub fn infrastructure(
        code: ErrorCode,
        backend: Backend,
        operation: StorageOp,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::Infrastructure,
            code,
            message: message.into(),
            details: HashMap::new(),
        }
        .with_detail("backend", backend.to_string())
        .with_detail("operation", operation.to_string())
    }

    /// Creates the normalized storage error the cached-repository layer
    /// raises for any tier failure, carrying entity name and key.
    pub fn storage(
        backend: Backend,
        operation: StorageOp,
        entity: &str,
        key: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::infrastructure(ErrorCode::StorageError, backend, operation, message)
            .with_detail("entity", entity)
            .with_detail("key", key)
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::domain(ErrorCode::ValidationFailed, message).with_detail("field", field)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Returns a detail value by key.
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }

    /// Returns true for infrastructure-kind errors.
    pub fn is_infrastructure(&self) -> bool {
        self.kind == ErrorKind::Infrastructure
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for CoreError {}
