//! Per-touchpoint platform configuration.
//!
//! Attached at session start and immutable thereafter; the orchestrator
//! reads the limits and feature toggles from here for the life of the
//! conversation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Where the conversation originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Web,
    Mobile,
    Api,
    Whatsapp,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SourceType::Web => "web",
            SourceType::Mobile => "mobile",
            SourceType::Api => "api",
            SourceType::Whatsapp => "whatsapp",
        };
        write!(f, "{s}")
    }
}

/// Interaction mode for the touchpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationMode {
    Text,
    Voice,
}

/// Per-touchpoint configuration. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformContext {
    pub source: SourceType,
    pub max_duration_secs: u64,
    pub enable_voice: bool,
    pub enable_transfer: bool,
    pub mode: ConversationMode,
}

impl PlatformContext {
    /// Default configuration for a touchpoint source.
    pub fn for_source(source: SourceType) -> Self {
        match source {
            SourceType::Web => Self {
                source,
                max_duration_secs: 1800,
                enable_voice: true,
                enable_transfer: true,
                mode: ConversationMode::Text,
            },
            SourceType::Mobile => Self {
                source,
                max_duration_secs: 900,
                enable_voice: true,
                enable_transfer: true,
                mode: ConversationMode::Voice,
            },
            SourceType::Api => Self {
                source,
                max_duration_secs: 1800,
                enable_voice: false,
                enable_transfer: false,
                mode: ConversationMode::Text,
            },
            SourceType::Whatsapp => Self {
                source,
                max_duration_secs: 3600,
                enable_voice: false,
                enable_transfer: true,
                mode: ConversationMode::Text,
            },
        }
    }

    pub fn with_max_duration(mut self, secs: u64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_duration_secs == 0 {
            return Err(Error::Validation(
                "platform max_duration_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_invalid() {
        let ctx = PlatformContext::for_source(SourceType::Web).with_max_duration(0);
        assert!(ctx.validate().is_err());
    }

    #[test]
    fn api_source_disables_voice_and_transfer() {
        let ctx = PlatformContext::for_source(SourceType::Api);
        assert!(!ctx.enable_voice);
        assert!(!ctx.enable_transfer);
    }
}
