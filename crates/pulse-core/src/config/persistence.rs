//! Persistence API configuration.

use serde::{Deserialize, Serialize};

/// Persistence (durable store) API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Base URL of the persistence REST API.
    pub base_url: String,
    /// Request timeout in seconds. A stalled downstream API must not pin
    /// a handler indefinitely.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    10
}
