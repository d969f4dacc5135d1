//! Preview configuration.
//!
//! Read from `blockview.json` in the workspace root (or an explicit path).
//! Every field is optional; missing fields take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Config file looked up in the workspace root.
pub const CONFIG_FILE_NAME: &str = "blockview.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Model Preview".to_string(),
            width: 800,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub window: WindowConfig,
    /// RGBA clear color of the render surface.
    pub clear_color: [f64; 4],
    /// Model documents opened at startup, relative to the workspace.
    pub documents: Vec<String>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            documents: Vec::new(),
        }
    }
}

/// Values that take precedence over the file, e.g. from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub documents: Vec<String>,
}

impl PreviewConfig {
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `blockview.json` from `workspace`, or defaults when it is absent.
    pub fn load_or_default(workspace: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = workspace.as_ref().join(CONFIG_FILE_NAME);
        if !path.is_file() {
            log::debug!(
                "No {} in {}, using defaults",
                CONFIG_FILE_NAME,
                workspace.as_ref().display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width.max(1);
        }
        if let Some(height) = overrides.height {
            self.window.height = height.max(1);
        }
        if !overrides.documents.is_empty() {
            self.documents = overrides.documents.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_dir(name: &str) -> PathBuf {
        let dir_name = format!("blockview_config_{}_{}", std::process::id(), name);
        let dir = env::temp_dir().join(dir_name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_defaults() {
        let config = PreviewConfig::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert!(config.documents.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let json = r#"{"window":{"width":1024},"documents":["models/block/stone.json"]}"#;
        let config: PreviewConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.documents, vec!["models/block/stone.json".to_string()]);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = temp_dir("missing");
        let config = PreviewConfig::load_or_default(&dir).unwrap();
        assert_eq!(config, PreviewConfig::default());
    }

    #[test]
    fn test_load_reports_parse_error() {
        let dir = temp_dir("invalid");
        fs::write(dir.join(CONFIG_FILE_NAME), "{\"window\": 5}").unwrap();

        let err = PreviewConfig::load_or_default(&dir).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_overrides_win() {
        let mut config = PreviewConfig::default();
        config.documents = vec!["a.json".into()];
        config.apply(&ConfigOverrides {
            width: Some(640),
            height: None,
            documents: vec!["b.json".into()],
        });

        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 800);
        assert_eq!(config.documents, vec!["b.json".to_string()]);
    }
}
