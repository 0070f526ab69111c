//! Scoring configuration
//!
//! Default values are defined in `config/default.toml`. A user file is merged
//! on top of them, so it only needs the keys it changes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LmError;

/// Default configuration TOML embedded from config/default.toml
const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// How sentence and phrase scoring treat input words missing from the
/// vocabulary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownWordPolicy {
    /// Map the word to `<unk>`. If the model stores no unigram for `<unk>`,
    /// the scorer's OOV constant applies.
    #[default]
    UnkTag,
    /// Score the word with `oov_word_log_prob` without consulting the model,
    /// and restart the context after it.
    Constant,
}

/// Configuration for a language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmConfig {
    /// Log10 probability returned when even the unigram lookup misses.
    /// Distinct from the probability the model assigns to `<unk>`.
    pub oov_word_log_prob: f32,
    /// Unknown input word handling
    #[serde(default)]
    pub unknown_words: UnknownWordPolicy,
}

impl Default for LmConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("embedded default.toml must be valid")
    }
}

/// Recursively merge `overlay` TOML values on top of `base`.
fn merge_toml(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(key) {
                    merge_toml(base_value, value);
                } else {
                    base_table.insert(key.clone(), value.clone());
                }
            }
        }
        (base, _) => {
            *base = overlay.clone();
        }
    }
}

/// Parse user TOML content merged on top of default.toml.
fn parse_with_defaults(user_content: &str) -> Result<LmConfig> {
    let mut base: toml::Value = toml::from_str(DEFAULT_CONFIG_TOML)?;
    let user: toml::Value = toml::from_str(user_content)?;
    merge_toml(&mut base, &user);
    let config: LmConfig = base.try_into()?;
    config.validate()?;
    Ok(config)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "katz-lm", "katz-lm")
}

impl LmConfig {
    /// Get the configuration file path (`<config dir>/katz-lm/config.toml`)
    pub fn config_file() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Parse a TOML string merged on top of the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        parse_with_defaults(content)
    }

    /// Load the configuration from the per-user config file.
    /// Falls back to the embedded defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_or_default(Self::config_file().as_deref())
    }

    fn load_or_default(config_file: Option<&Path>) -> Result<Self> {
        let Some(config_file) = config_file else {
            warn!("Could not determine config directory, using defaults");
            return Ok(Self::default());
        };

        if !config_file.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(config_file)
    }

    /// Load the configuration from a specific file, merged on top of defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let content = fs::read_to_string(path)?;
        parse_with_defaults(&content)
    }

    /// Reject values the scorer cannot return as a valid float.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.oov_word_log_prob.is_nan() {
            return Err(LmError::Config(
                "oov_word_log_prob must not be NaN".to_string(),
            ));
        }
        Ok(())
    }
}
