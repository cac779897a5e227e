use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Preview-side settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewConfig {
    /// Quiet period before buffered keystrokes are reported
    #[serde(default = "default_coalescing_window_ms")]
    pub coalescing_window_ms: u64,

    /// Origin this preview stamps on outgoing messages
    #[serde(default = "default_origin")]
    pub origin: String,

    /// The only origin incoming messages are accepted from
    #[serde(default = "default_control_panel_origin")]
    pub control_panel_origin: String,
}

fn default_coalescing_window_ms() -> u64 {
    300
}

fn default_origin() -> String {
    "preview".to_string()
}

fn default_control_panel_origin() -> String {
    "control-panel".to_string()
}

impl PreviewConfig {
    pub fn coalescing_window(&self) -> Duration {
        Duration::from_millis(self.coalescing_window_ms)
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            coalescing_window_ms: default_coalescing_window_ms(),
            origin: default_origin(),
            control_panel_origin: default_control_panel_origin(),
        }
    }
}
