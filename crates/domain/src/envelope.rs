//! JSON response envelope contract for the (external) API layer.
//!
//! The transport surface lives outside this workspace; it wraps every
//! response in this envelope and maps [`Error`] values mechanically via
//! [`Error::code`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorCode};

/// `{ success, data?, error? }` wire envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Error payload inside the envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: &Error) -> Self {
        let details = match error {
            Error::CooldownActive {
                seconds_remaining,
                elapsed_seconds,
            } => Some(serde_json::json!({
                "seconds_remaining": seconds_remaining,
                "elapsed_seconds": elapsed_seconds,
            })),
            _ => None,
        };
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: error.code(),
                message: error.to_string(),
                details,
            }),
        }
    }
}
