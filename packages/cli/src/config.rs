use blockframe_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "blockframe.config.json";

/// Blockframe configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding template definitions (*.json)
    #[serde(default = "default_templates_dir")]
    pub templates_dir: String,

    /// Origin stamped on control-panel messages
    #[serde(default = "default_control_panel_origin")]
    pub control_panel_origin: String,

    /// Origin the control panel accepts messages from
    #[serde(default = "default_preview_origin")]
    pub preview_origin: String,

    /// Maximum undo levels (0 = unlimited)
    #[serde(default = "default_undo_levels")]
    pub undo_levels: usize,
}

fn default_templates_dir() -> String {
    "templates".to_string()
}

fn default_control_panel_origin() -> String {
    EditorConfig::default().origin
}

fn default_preview_origin() -> String {
    EditorConfig::default().preview_origin
}

fn default_undo_levels() -> usize {
    EditorConfig::default().undo_levels
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Absolute path to the templates directory, unless overridden
    pub fn get_templates_dir(&self, cwd: &str, flag: Option<&PathBuf>) -> PathBuf {
        match flag {
            Some(dir) => dir.clone(),
            None => PathBuf::from(cwd).join(&self.templates_dir),
        }
    }

    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig {
            origin: self.control_panel_origin.clone(),
            preview_origin: self.preview_origin.clone(),
            undo_levels: self.undo_levels,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            templates_dir: default_templates_dir(),
            control_panel_origin: default_control_panel_origin(),
            preview_origin: default_preview_origin(),
            undo_levels: default_undo_levels(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "templatesDir": "site/templates",
            "previewOrigin": "https://preview.example",
            "undoLevels": 20
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.templates_dir, "site/templates");
        assert_eq!(config.preview_origin, "https://preview.example");
        assert_eq!(config.control_panel_origin, "control-panel");
        assert_eq!(config.undo_levels, 20);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.templates_dir, "templates");
        assert_eq!(config.editor_config(), EditorConfig::default());
    }

    #[test]
    fn test_templates_dir_flag_wins() {
        let config = Config::default();
        let flag = PathBuf::from("/elsewhere");
        assert_eq!(config.get_templates_dir("/site", Some(&flag)), flag);
        assert_eq!(config.get_templates_dir("/site", None), PathBuf::from("/site/templates"));
    }
}
