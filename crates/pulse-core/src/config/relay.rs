//! Relay engine configuration.

use serde::{Deserialize, Serialize};

/// Relay (presence/fanout) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Whether connections without a credential may proceed with the
    /// guest identity. Security-relevant: off by default.
    #[serde(default)]
    pub allow_anonymous: bool,
    /// Display name assigned to guest connections.
    #[serde(default = "default_guest_name")]
    pub guest_display_name: String,
    /// Per-connection outbound queue capacity. Sends to a full queue are
    /// dropped, never awaited.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            allow_anonymous: false,
            guest_display_name: default_guest_name(),
            outbound_buffer_size: default_outbound_buffer(),
        }
    }
}

fn default_guest_name() -> String {
    "guest".to_string()
}

fn default_outbound_buffer() -> usize {
    256
}
