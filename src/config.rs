use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

use crate::hours::{Hour, HourWindow};

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "SUBWAY_FLOW_CONFIG";

/// Defaults for source lookup and query parameters.
///
/// Stored as a JSON object on disk; every field is optional:
/// ```json
/// {
///   "source_candidates": ["/mnt/data/지하철데이터.csv", "지하철데이터.csv"],
///   "default_top_n": 10,
///   "default_window": ["08", "18"]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source_candidates: Vec<PathBuf>,
    pub default_top_n: usize,
    pub default_window: (String, String),
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_candidates: vec![
                PathBuf::from("/mnt/data/지하철데이터.csv"),
                PathBuf::from("지하철데이터.csv"),
            ],
            default_top_n: 10,
            default_window: ("08".to_string(), "18".to_string()),
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
        serde_json::from_str(&content).with_context(|| format!("parsing config '{path}'"))
    }

    /// Uses the file named by [`CONFIG_ENV`] when set, defaults otherwise.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn window(&self) -> Result<HourWindow> {
        let (start, end) = &self.default_window;
        let start: Hour = start.parse().map_err(anyhow::Error::msg)?;
        let end: Hour = end.parse().map_err(anyhow::Error::msg)?;
        Ok(HourWindow::new(start, end)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_top_n, 10);
        assert_eq!(config.source_candidates.len(), 2);
        assert_eq!(config.window().unwrap().to_string(), "08-18");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "default_top_n": 5, "default_window": ["23", "01"] }"#).unwrap();

        let config = PipelineConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.default_top_n, 5);
        assert_eq!(config.source_candidates.len(), 2);
        assert_eq!(config.window().unwrap().hours().len(), 3);
    }

    #[test]
    fn test_bad_window_is_error() {
        let config = PipelineConfig {
            default_window: ("02".to_string(), "05".to_string()),
            ..Default::default()
        };
        assert!(config.window().is_err());
    }
}
