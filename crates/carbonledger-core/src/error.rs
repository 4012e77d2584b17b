//! Error types module
//!
//! This module provides the core error types used throughout the CarbonLedger
//! application. All errors are unified under the `AppError` enum which can
//! represent database, validation, authorization, and AI-integration errors.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx`
//! feature so that the core crate stays usable without a database dependency.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like expired invites
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DATABASE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Organization not found: {0}")]
    OrganizationNotFound(String),

    #[error("An organization named '{name}' already exists with slug '{slug}'")]
    DuplicateSlug { name: String, slug: String },

    #[error("User is already a member of this organization")]
    AlreadyMember,

    #[error("Invalid or expired invite code")]
    InvalidInviteCode,

    #[error("Incident cannot move from '{from}' to '{to}'")]
    InvalidStatusTransition { from: String, to: String },

    #[error("AI service error: {0}")]
    AiService(String),

    #[error("AI response was not valid JSON: {0}")]
    AiResponseInvalid(String),

    #[error("Identity provider error: {0}")]
    Identity(String),

    #[error("Login timed out")]
    LoginTimeout,
}

// Error conversion implementations following Rust best practices
#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// Reduces duplication in ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::BadRequest(_) => (
            400,
            "BAD_REQUEST",
            false,
            Some("Check request format and parameters"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::OrganizationNotFound(_) => (
            404,
            "ORGANIZATION_NOT_FOUND",
            false,
            Some("Verify the organization ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check authentication token"),
            false,
            LogLevel::Debug,
        ),
        AppError::Forbidden(_) => (
            403,
            "FORBIDDEN",
            false,
            Some("Ask an organization owner or admin to perform this action"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::DuplicateSlug { .. } => (
            409,
            "DUPLICATE_SLUG",
            false,
            Some("Choose a different organization name"),
            false,
            LogLevel::Debug,
        ),
        AppError::AlreadyMember => (
            409,
            "ALREADY_MEMBER",
            false,
            Some("Open the organization from your dashboard"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidInviteCode => (
            400,
            "INVALID_INVITE_CODE",
            false,
            Some("Ask for a new invite code"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidStatusTransition { .. } => (
            400,
            "INVALID_STATUS_TRANSITION",
            false,
            Some("Refresh the incident and check its current status"),
            false,
            LogLevel::Debug,
        ),
        AppError::AiService(_) => (
            500,
            "AI_SERVICE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::AiResponseInvalid(_) => (
            500,
            "AI_RESPONSE_INVALID",
            true,
            Some("Retry the analysis"),
            true,
            LogLevel::Error,
        ),
        AppError::Identity(_) => (
            401,
            "IDENTITY_ERROR",
            false,
            Some("Sign in again"),
            true,
            LogLevel::Warn,
        ),
        AppError::LoginTimeout => (
            401,
            "LOGIN_TIMEOUT",
            true,
            Some("Check your connection and sign in again"),
            false,
            LogLevel::Warn,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::OrganizationNotFound(_) => "OrganizationNotFound",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Forbidden(_) => "Forbidden",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
            AppError::DuplicateSlug { .. } => "DuplicateSlug",
            AppError::AlreadyMember => "AlreadyMember",
            AppError::InvalidInviteCode => "InvalidInviteCode",
            AppError::InvalidStatusTransition { .. } => "InvalidStatusTransition",
            AppError::AiService(_) => "AiService",
            AppError::AiResponseInvalid(_) => "AiResponseInvalid",
            AppError::Identity(_) => "Identity",
            AppError::LoginTimeout => "LoginTimeout",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        // Add source error chain
        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::OrganizationNotFound(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::Forbidden(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
            AppError::DuplicateSlug { name, slug } => {
                format!(
                    "An organization named '{}' already exists; a new slug was derived from '{}'",
                    name, slug
                )
            }
            AppError::AlreadyMember => {
                "You are already a member of this organization".to_string()
            }
            AppError::InvalidInviteCode => "Invalid or expired invite code".to_string(),
            AppError::InvalidStatusTransition { from, to } => {
                format!("Incident cannot move from '{}' to '{}'", from, to)
            }
            AppError::AiService(_) => "Failed to analyze file content".to_string(),
            AppError::AiResponseInvalid(_) => "Failed to analyze file content".to_string(),
            AppError::Identity(_) => "Authentication failed".to_string(),
            AppError::LoginTimeout => "Login timed out".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        #[cfg(feature = "sqlx")]
        let err = AppError::from(sqlx::Error::PoolClosed);
        #[cfg(not(feature = "sqlx"))]
        let err = AppError::Database("pool closed".to_string());
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_invalid_invite() {
        let err = AppError::InvalidInviteCode;
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_INVITE_CODE");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Invalid or expired invite code");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_ai_failures_share_client_message() {
        // Both upstream failure and parse failure surface the same generic
        // message to the caller; internals differ only in logs.
        let upstream = AppError::AiService("status 500".to_string());
        let parse = AppError::AiResponseInvalid("expected value at line 1".to_string());
        assert_eq!(upstream.client_message(), "Failed to analyze file content");
        assert_eq!(parse.client_message(), "Failed to analyze file content");
        assert_eq!(upstream.http_status_code(), 500);
        assert_eq!(parse.http_status_code(), 500);
    }

    #[test]
    fn test_error_metadata_status_transition() {
        let err = AppError::InvalidStatusTransition {
            from: "closed".to_string(),
            to: "open".to_string(),
        };
        assert_eq!(err.http_status_code(), 400);
        assert!(err.client_message().contains("closed"));
        assert!(err.client_message().contains("open"));
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_suggested_actions() {
        let err1 = AppError::NotFound("test".to_string());
        assert_eq!(err1.suggested_action(), Some("Verify the resource ID exists"));

        let err2 = AppError::AlreadyMember;
        assert_eq!(
            err2.suggested_action(),
            Some("Open the organization from your dashboard")
        );
    }
}
