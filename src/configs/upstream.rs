use serde::{Deserialize, Serialize};

/// Upstream provider the resolver talks to.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the provider API, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Ordered delivery servers to search. Index order is search order.
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,
    /// Per-request timeout for resolution calls.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            servers: default_servers(),
            timeout_ms: default_timeout_ms(),
            user_agent: None,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3001/api".to_string()
}

fn default_servers() -> Vec<String> {
    vec![
        "vidcloud".to_string(),
        "vidstreaming".to_string(),
        "streamsb".to_string(),
    ]
}

fn default_timeout_ms() -> u64 {
    12_000
}
