use serde::{Deserialize, Serialize};

/// Settings consumed by the external API layer (documented here so one
/// config file covers the whole deployment).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// JWT signing secret. Required in production.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default = "d_jwt_algorithm")]
    pub jwt_algorithm: String,

    #[serde(default = "d_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,

    #[serde(default = "d_rate_limit_per_hour")]
    pub rate_limit_per_hour: u32,

    /// IPs exempt from rate limiting.
    #[serde(default)]
    pub rate_limit_whitelist_ips: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_algorithm: d_jwt_algorithm(),
            rate_limit_per_minute: d_rate_limit_per_minute(),
            rate_limit_per_hour: d_rate_limit_per_hour(),
            rate_limit_whitelist_ips: Vec::new(),
        }
    }
}

fn d_jwt_algorithm() -> String {
    "HS256".into()
}
fn d_rate_limit_per_minute() -> u32 {
    60
}
fn d_rate_limit_per_hour() -> u32 {
    1000
}
