use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub filters: Option<String>,
    /// Append log output to this file in addition to stdout.
    #[serde(default)]
    pub file: Option<String>,
}
