//! Profile configuration.
//!
//! Profiles name a master file (and optionally its localization archive
//! and a database override), so `fo76dm --profile pts diff --vs live`
//! can compare independent game installs. Resolution precedence:
//! explicit `--esm` flag, then `--profile NAME`, then the default
//! profile, then an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Profile '{0}' not found in config")]
    ProfileNotFound(String),

    #[error("No master file configured: pass --esm, or create a profile at {0}")]
    ConfigMissing(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Path to the master file.
    pub esm_path: PathBuf,

    /// Language token for string tables.
    #[serde(default = "default_language")]
    pub language: String,

    /// Localization BA2; when omitted, a sibling of the master file
    /// matching `* - Localization.ba2` is used.
    #[serde(default)]
    pub strings_ba2: Option<PathBuf>,

    /// Database override; when omitted, the path is derived from the
    /// master file.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Profile {
    fn for_esm(esm_path: PathBuf) -> Self {
        Self {
            esm_path,
            language: default_language(),
            strings_ba2: None,
            db_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Profile used when no `--profile` is passed.
    #[serde(default)]
    pub default_profile: Option<String>,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Config {
    /// Location of the config file.
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fo76dm")
            .join("config.toml")
    }

    /// Load the config, or an empty one when the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolve the active profile.
    pub fn resolve(
        &self,
        explicit_esm: Option<PathBuf>,
        profile_name: Option<&str>,
    ) -> Result<Profile, ConfigError> {
        if let Some(esm_path) = explicit_esm {
            return Ok(Profile::for_esm(esm_path));
        }
        if let Some(name) = profile_name {
            return self
                .profiles
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()));
        }
        if let Some(name) = &self.default_profile {
            return self
                .profiles
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::ProfileNotFound(name.clone()));
        }
        Err(ConfigError::ConfigMissing(
            Self::path().display().to_string(),
        ))
    }

    /// Look up a named profile (used by `diff --vs`).
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))
    }
}
