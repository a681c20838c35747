//! Shared error type used across all gateway crates, plus the wire-level
//! [`GatewayError`] returned to channel adapters and HTTP callers.

use serde::{Deserialize, Serialize};

/// Internal error type used for `Result` plumbing between crates.
///
/// This is distinct from [`GatewayError`]: `Error` is for `?`-propagation
/// inside the core, `GatewayError` is the fixed wire taxonomy every caller
/// (adapter, HTTP handler) ultimately sees. Every internal error has a
/// `From` conversion into a `GatewayError` via [`Error::into_gateway_error`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already claimed: {0}")]
    AlreadyClaimed(String),

    #[error("answer service: {0}")]
    AnswerService(String),

    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn into_gateway_error(self) -> GatewayError {
        let (code, recoverable) = match &self {
            Error::Io(_) => (ErrorCode::InternalError, false),
            Error::Json(_) => (ErrorCode::ValidationError, true),
            Error::Timeout(_) => (ErrorCode::RagServiceError, true),
            Error::Validation(_) => (ErrorCode::ValidationError, true),
            Error::NotFound(_) => (ErrorCode::ResourceNotFound, true),
            Error::AlreadyClaimed(_) => (ErrorCode::ResourceExists, true),
            Error::AnswerService(_) => (ErrorCode::RagServiceError, true),
            Error::ChannelUnavailable(_) => (ErrorCode::ChannelUnavailable, true),
            Error::Config(_) => (ErrorCode::InternalError, false),
            Error::Auth(_) => (ErrorCode::AuthenticationFailed, true),
            Error::Other(_) => (ErrorCode::InternalError, false),
        };
        GatewayError {
            error_code: code,
            error_message: self.to_string(),
            recoverable,
            details: None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire error taxonomy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The fixed error-code enum every layer translates into at the core
/// boundary: a single enum, not free-form strings, fixes the
/// ambiguity between structured and stringly-typed error
/// representations that channel adapters and HTTP handlers would
/// otherwise invent independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimitExceeded,
    InvalidMessage,
    AuthenticationFailed,
    AuthorizationFailed,
    ValidationError,
    MessageTooLarge,
    RagServiceError,
    InternalError,
    ServiceUnavailable,
    ChannelUnavailable,
    PiiDetected,
    RequiresHumanEscalation,
    ResourceNotFound,
    ResourceExists,
}

impl ErrorCode {
    /// HTTP status mapping for the escalation and feedback HTTP surface.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::InvalidMessage | ErrorCode::ValidationError => 400,
            ErrorCode::AuthenticationFailed => 401,
            ErrorCode::AuthorizationFailed => 403,
            ErrorCode::ResourceNotFound => 404,
            ErrorCode::ResourceExists => 409,
            ErrorCode::MessageTooLarge => 413,
            ErrorCode::RateLimitExceeded => 429,
            ErrorCode::InternalError => 500,
            ErrorCode::RagServiceError => 502,
            ErrorCode::ServiceUnavailable | ErrorCode::ChannelUnavailable => 503,
            ErrorCode::PiiDetected => 400,
            ErrorCode::RequiresHumanEscalation => 200,
        }
    }
}

/// The error payload returned on the wire (HTTP body, or the `Err` arm of
/// `process_message`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    pub error_code: ErrorCode,
    pub error_message: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl GatewayError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code: code,
            error_message: message.into(),
            recoverable: !matches!(
                code,
                ErrorCode::InternalError | ErrorCode::ChannelUnavailable
            ),
            details: None,
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    pub fn rag_service_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RagServiceError, message)
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.error_code, self.error_message)
    }
}

impl std::error::Error for GatewayError {}
