//! Configuration for the operations layer.

use std::path::PathBuf;

use directories::ProjectDirs;
use semantic_tiles_layout::LayoutConfig;
use semantic_tiles_tessellation::TessellationConfig;
use serde::{Deserialize, Serialize};

use crate::error::{OpsError, OpsResult};

/// Configuration for Semantic Tiles operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default canvas width in pixels.
    #[serde(default = "default_width")]
    pub width: f64,

    /// Default canvas height in pixels.
    #[serde(default = "default_height")]
    pub height: f64,

    /// Directory holding the `.tiles` catalog.
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub tessellation: TessellationConfig,
}

fn default_width() -> f64 {
    800.0
}

fn default_height() -> f64 {
    600.0
}

fn default_store_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            store_root: default_store_root(),
            layout: LayoutConfig::default(),
            tessellation: TessellationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from disk with environment overrides.
    pub fn load() -> OpsResult<Self> {
        let config = match Self::config_file_path() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)?;
                serde_json::from_str(&contents)?
            }
            _ => Self::default(),
        };

        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Get the path to the configuration file.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "semantic-tiles", "semantic-tiles")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Apply `TILES_*` overrides read through `lookup`.
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> OpsResult<Self> {
        if let Some(root) = lookup("TILES_STORE_ROOT") {
            self.store_root = PathBuf::from(root);
        }
        if let Some(v) = lookup("TILES_WIDTH") {
            self.width = parse_var("TILES_WIDTH", &v)?;
        }
        if let Some(v) = lookup("TILES_HEIGHT") {
            self.height = parse_var("TILES_HEIGHT", &v)?;
        }
        if let Some(v) = lookup("TILES_SEED") {
            self.layout.seed = parse_var("TILES_SEED", &v)?;
        }
        if let Some(v) = lookup("TILES_MAX_ITERATIONS") {
            self.layout.max_iterations = parse_var("TILES_MAX_ITERATIONS", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check canvas size and layout parameters.
    pub fn validate(&self) -> OpsResult<()> {
        if !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
        {
            return Err(OpsError::Config(format!(
                "Canvas size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        self.layout
            .validate()
            .map_err(|e| OpsError::Config(e.to_string()))
    }

    /// Canvas size, preferring explicit values over the defaults.
    pub fn canvas(&self, width: Option<f64>, height: Option<f64>) -> (f64, f64) {
        (width.unwrap_or(self.width), height.unwrap_or(self.height))
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> OpsResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| OpsError::Config(format!("Invalid value for {}: {}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!((c.width, c.height), (800.0, 600.0));
        assert_eq!(c.layout.margin, 50.0);
        assert_eq!(c.layout.max_iterations, 300);
    }

    #[test]
    fn test_env_overrides() {
        let c = Config::default()
            .with_env_overrides(env(&[
                ("TILES_WIDTH", "1024"),
                ("TILES_SEED", "7"),
                ("TILES_STORE_ROOT", "/tmp/tiles"),
                ("TILES_MAX_ITERATIONS", "120"),
            ]))
            .unwrap();
        assert_eq!(c.width, 1024.0);
        assert_eq!(c.height, 600.0);
        assert_eq!(c.layout.seed, 7);
        assert_eq!(c.layout.max_iterations, 120);
        assert_eq!(c.store_root, PathBuf::from("/tmp/tiles"));
    }

    #[test]
    fn test_bad_env_value_is_config_error() {
        let err = Config::default()
            .with_env_overrides(env(&[("TILES_HEIGHT", "tall")]))
            .unwrap_err();
        assert!(matches!(err, OpsError::Config(_)));

        let err = Config::default()
            .with_env_overrides(env(&[("TILES_WIDTH", "-5")]))
            .unwrap_err();
        assert!(matches!(err, OpsError::Config(_)));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let c: Config = serde_json::from_str(r#"{"width": 1200, "layout": {"seed": 3}}"#).unwrap();
        assert_eq!(c.width, 1200.0);
        assert_eq!(c.height, 600.0);
        assert_eq!(c.layout.seed, 3);
        assert_eq!(c.layout.margin, 50.0);
        assert_eq!(c.tessellation, TessellationConfig::default());
    }

    #[test]
    fn test_canvas_prefers_explicit_size() {
        let c = Config::default();
        assert_eq!(c.canvas(Some(300.0), None), (300.0, 600.0));
    }
}
