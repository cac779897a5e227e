use serde::{Deserialize, Serialize};

/// Control-panel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Origin this control panel stamps on outgoing messages
    #[serde(default = "default_origin")]
    pub origin: String,

    /// The only origin incoming messages are accepted from
    #[serde(default = "default_preview_origin")]
    pub preview_origin: String,

    /// Maximum undo levels (0 = unlimited)
    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,
}

fn default_origin() -> String {
    "control-panel".to_string()
}

fn default_preview_origin() -> String {
    "preview".to_string()
}

fn default_undo_levels() -> usize {
    100
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            preview_origin: default_preview_origin(),
            undo_levels: default_undo_levels(),
        }
    }
}
