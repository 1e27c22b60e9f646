//! Application-level configuration loading, including the selectable team color palette.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the crate looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "NEXTURNO_CONFIG_PATH";
/// Setup choice meaning "no color assigned".
pub const NO_COLOR: &str = "no-color";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    palette: Vec<String>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// baked-in default palette.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        count = app_config.palette.len(),
                        "loaded team color palette from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Selectable color tags, lowercase hyphenated.
    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    /// Whether `tag` is a selectable color.
    pub fn contains(&self, tag: &str) -> bool {
        self.palette.iter().any(|candidate| candidate == tag)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            palette: default_palette(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    colors: Vec<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let palette = value
            .colors
            .into_iter()
            .map(|tag| tag.trim().to_lowercase().replace(' ', "-"))
            .collect();
        Self { palette }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in palette shipped with the crate, matching the setup form options.
fn default_palette() -> Vec<String> {
    ["red", "blue", "yellow", "green", "orange", "purple", "pink", "lime"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_palette_contains_the_setup_options() {
        let config = AppConfig::default();
        assert_eq!(config.palette().len(), 8);
        assert!(config.contains("red"));
        assert!(config.contains("lime"));
        assert!(!config.contains("mauve"));
    }

    #[test]
    fn raw_config_tags_are_normalized() {
        let raw = RawConfig {
            colors: vec!["Sky Blue".into(), " RED ".into()],
        };
        let config = AppConfig::from(raw);
        assert!(config.contains("sky-blue"));
        assert!(config.contains("red"));
    }
}
