//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/parentage/parentage.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `PARENTAGE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{Formatting, DEFAULT_MODULE};

/// Unified configuration for parentage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Name shown for entities whose initializer never set one
    pub unknown_name: String,
    /// Separator between the names of a parent chain
    pub chain_separator: String,
    /// Module recorded on declared types that do not name one
    pub default_module: String,
}

impl Default for Settings {
    fn default() -> Self {
        let formatting = Formatting::default();
        Self {
            unknown_name: formatting.unknown_name,
            chain_separator: formatting.chain_separator,
            default_module: DEFAULT_MODULE.to_string(),
        }
    }
}

/// Raw settings for intermediate parsing (`None` → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub unknown_name: Option<String>,
    pub chain_separator: Option<String>,
    pub default_module: Option<String>,
}

/// Get the XDG config directory for parentage.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "parentage").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("parentage.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            unknown_name: overlay
                .unknown_name
                .clone()
                .unwrap_or_else(|| self.unknown_name.clone()),
            chain_separator: overlay
                .chain_separator
                .clone()
                .unwrap_or_else(|| self.chain_separator.clone()),
            default_module: overlay
                .default_module
                .clone()
                .unwrap_or_else(|| self.default_module.clone()),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file, must exist when given
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_layers(global_config_path().as_deref(), config_file)
    }

    /// Load settings from explicit layers; a missing global file is skipped.
    pub fn load_layers(
        global: Option<&Path>,
        config_file: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global {
            if global_path.exists() {
                let raw = load_raw_settings(global_path)?;
                current = current.merge_with(&raw);
            }
        }

        // 3. Explicit config file
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            let raw = load_raw_settings(path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables
        Self::apply_env_overrides(current)
    }

    /// Apply PARENTAGE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("PARENTAGE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("unknown_name") {
            settings.unknown_name = val;
        }
        if let Ok(val) = config.get_string("chain_separator") {
            settings.chain_separator = val;
        }
        if let Ok(val) = config.get_string("default_module") {
            settings.default_module = val;
        }

        Ok(settings)
    }

    /// Rendering options handed to the domain layer.
    pub fn formatting(&self) -> Formatting {
        Formatting {
            unknown_name: self.unknown_name.clone(),
            chain_separator: self.chain_separator.clone(),
        }
    }

    /// Serialize settings to TOML string.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize settings: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_formatting_then_matches_domain_defaults() {
        assert_eq!(Settings::default().formatting(), Formatting::default());
    }

    #[test]
    fn given_partial_overlay_when_merge_then_keeps_unspecified_fields() {
        let raw = RawSettings {
            chain_separator: Some(" < ".into()),
            ..Default::default()
        };
        let merged = Settings::default().merge_with(&raw);
        assert_eq!(merged.chain_separator, " < ");
        assert_eq!(merged.unknown_name, "UNKNOWN");
        assert_eq!(merged.default_module, DEFAULT_MODULE);
    }

    #[test]
    fn given_settings_when_to_toml_then_roundtrips_through_raw() {
        let settings = Settings::default();
        let rendered = settings.to_toml().unwrap();
        let raw: RawSettings = toml::from_str(&rendered).unwrap();
        assert_eq!(raw.unknown_name.as_deref(), Some("UNKNOWN"));
    }
}
