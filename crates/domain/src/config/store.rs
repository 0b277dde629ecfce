use serde::{Deserialize, Serialize};

/// Remote row-store connection and reliability policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the row-store API.
    #[serde(default = "d_base_url")]
    pub base_url: String,

    /// API key sent as `X-Api-Key`, when required.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum retry attempts for transient failures.
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,

    /// Base backoff delay; attempt `n` waits `base * 2^(n-1)` plus jitter.
    #[serde(default = "d_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// How often the reconciler attempts to flush staged writes.
    #[serde(default = "d_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            api_key: None,
            timeout_ms: d_timeout_ms(),
            max_retries: d_max_retries(),
            backoff_base_ms: d_backoff_base_ms(),
            reconcile_interval_secs: d_reconcile_interval_secs(),
        }
    }
}

fn d_base_url() -> String {
    "http://localhost:9000".into()
}
fn d_timeout_ms() -> u64 {
    10_000
}
fn d_max_retries() -> u32 {
    3
}
fn d_backoff_base_ms() -> u64 {
    250
}
fn d_reconcile_interval_secs() -> u64 {
    30
}
