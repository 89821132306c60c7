use mnas_shared::{EmmPrimitive, Guti, ProcTid, SapFamily};
use thiserror::Error;

use crate::itti::TaskId;

/// Main error type for the NAS task layer
#[derive(Error, Debug)]
pub enum NasError {
    // ========================================
    // Classification Errors
    // ========================================
    #[error("Out of range EMM-SAP primitive: {0}")]
    OutOfRangePrimitive(EmmPrimitive),

    // ========================================
    // Routing Errors
    // ========================================
    #[error("{sap}-SAP rejected primitive {primitive}: {reason}")]
    SapFailure {
        sap: SapFamily,
        primitive: EmmPrimitive,
        reason: String,
    },

    #[error("Procedure failed: {0}")]
    ProcedureFailed(String),

    // ========================================
    // Context Errors
    // ========================================
    #[error("No session context for {0}")]
    ContextNotFound(Guti),

    #[error("Session context already exists for {0}")]
    ContextExists(Guti),

    // ========================================
    // Messaging Errors
    // ========================================
    #[error("Mailbox of task {0} is closed")]
    MailboxClosed(TaskId),

    #[error("Task {0} is not registered")]
    UnknownTask(TaskId),

    // ========================================
    // Timeout Errors
    // ========================================
    #[error("No reply for transaction pti={pti} of {guti}")]
    ReplyTimeout { guti: Guti, pti: ProcTid },

    // ========================================
    // System Errors
    // ========================================
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl NasError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::OutOfRangePrimitive(_) | Self::ContextNotFound(_) => ErrorSeverity::Warning,
            Self::ContextExists(_) => ErrorSeverity::Warning,
            Self::SapFailure { .. } | Self::ProcedureFailed(_) => ErrorSeverity::Error,
            Self::ReplyTimeout { .. } => ErrorSeverity::Error,
            Self::MailboxClosed(_) | Self::UnknownTask(_) => ErrorSeverity::Critical,
            Self::InternalError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Warning,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ReplyTimeout { .. })
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Result type alias for NAS operations
pub type Result<T> = std::result::Result<T, NasError>;
