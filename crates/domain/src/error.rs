use serde::{Deserialize, Serialize};

/// Shared error type used across all CoreSell crates.
///
/// Every error that crosses a component boundary is one of these variants;
/// the API layer maps them to HTTP responses via [`Error::code`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("validation: {0}")]
    Validation(String),

    #[error("cooldown active: next session available in {seconds_remaining}s")]
    CooldownActive {
        seconds_remaining: u64,
        elapsed_seconds: u64,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conversation {0} is closed")]
    ClosedConversation(uuid::Uuid),

    #[error("upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("upstream {service}: {message}")]
    Upstream { service: String, message: String },

    #[error("store: {message}")]
    Store { message: String, retriable: bool },

    #[error("experiment: {0}")]
    Experiment(String),

    #[error("config: {0}")]
    Config(String),

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether a caller may safely retry the failed operation.
    ///
    /// User-input and invariant errors are never retriable; transient
    /// transport and store failures are.
    pub fn retriable(&self) -> bool {
        match self {
            Error::Store { retriable, .. } => *retriable,
            Error::UpstreamTimeout(_) | Error::Http(_) => true,
            Error::Upstream { .. } => false,
            Error::Validation(_)
            | Error::CooldownActive { .. }
            | Error::NotFound(_)
            | Error::ClosedConversation(_)
            | Error::Experiment(_)
            | Error::Config(_)
            | Error::Invariant(_)
            | Error::Json(_) => false,
        }
    }

    /// The wire-level error code the API layer should surface.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Validation(_) => ErrorCode::ValidationError,
            Error::CooldownActive { .. } => ErrorCode::CooldownActive,
            Error::NotFound(_) => ErrorCode::NotFound,
            Error::ClosedConversation(_) => ErrorCode::ClosedConversation,
            Error::UpstreamTimeout(_) => ErrorCode::UpstreamTimeout,
            Error::Config(_) => ErrorCode::BadRequest,
            Error::Upstream { .. }
            | Error::Store { .. }
            | Error::Experiment(_)
            | Error::Invariant(_)
            | Error::Http(_)
            | Error::Json(_) => ErrorCode::InternalServerError,
        }
    }
}

/// Error codes exposed at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    ValidationError,
    TooManyRequests,
    InternalServerError,
    CooldownActive,
    ClosedConversation,
    UpstreamTimeout,
}
