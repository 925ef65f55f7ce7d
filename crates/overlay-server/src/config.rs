use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Server settings, read from a JSON file. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_canvas_width")]
    pub canvas_width: u32,
    #[serde(default = "ServerConfig::default_canvas_height")]
    pub canvas_height: u32,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
    /// Coarse grid step suggested to editors.
    #[serde(default = "ServerConfig::default_grid")]
    pub grid: u32,
    /// Undo snapshots kept.
    #[serde(default = "ServerConfig::default_history_limit")]
    pub history_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            canvas_width: Self::default_canvas_width(),
            canvas_height: Self::default_canvas_height(),
            port: Self::default_port(),
            grid: Self::default_grid(),
            history_limit: Self::default_history_limit(),
        }
    }
}

impl ServerConfig {
    const fn default_canvas_width() -> u32 {
        1920
    }

    const fn default_canvas_height() -> u32 {
        1080
    }

    const fn default_port() -> u16 {
        13337
    }

    const fn default_grid() -> u32 {
        10
    }

    const fn default_history_limit() -> usize {
        50
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    /// Load `path`, falling back to defaults when it does not exist. A file
    /// that exists but does not parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let cfg: ServerConfig = serde_json::from_str(r#"{"port": 8080, "moderatorToken": ""}"#).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.canvas_width, 1920);
        assert_eq!(cfg.canvas_height, 1080);
        assert_eq!(cfg.grid, 10);
        assert_eq!(cfg.history_limit, 50);
    }

    #[test]
    fn test_missing_file_is_default() {
        let cfg = ServerConfig::load_or_default("/nonexistent/overlay-live/config.json").unwrap();
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(ServerConfig::default()).unwrap();
        assert_eq!(value["canvasWidth"], 1920);
        assert_eq!(value["historyLimit"], 50);
    }
}
