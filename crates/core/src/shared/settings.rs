use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::domain::access_token::AccessToken;
use crate::models::domain::model_config::{ComputeType, Device, ModelConfig, ModelSize};
use crate::shared::constants::{APP_DIR_NAME, DEFAULT_FALLBACK_LANGUAGE};
use crate::shared::model_resolver::ModelLocations;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("could not determine config directory")]
    NoConfigDir,
}

/// Persistent user preferences. Fields missing from the file take their
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model_size: ModelSize,
    pub device: Device,
    pub compute_type: ComputeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hf_token: Option<String>,
    pub fallback_language: String,
    /// Overrides the platform model cache directory.
    pub models_dir: Option<PathBuf>,
    /// Where exports go; next to the audio file when unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let model = ModelConfig::default();
        Self {
            model_size: model.model_size,
            device: model.device,
            compute_type: model.compute_type,
            hf_token: None,
            fallback_language: DEFAULT_FALLBACK_LANGUAGE.to_string(),
            models_dir: None,
            output_dir: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads the settings file from the platform config directory. A
    /// missing or unreadable file yields defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            log::warn!("{e}; using default settings");
            Self::default()
        })
    }

    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(SettingsError::Serialize)?;
        fs::write(path, json).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            model_size: self.model_size,
            device: self.device,
            compute_type: self.compute_type,
        }
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.hf_token.as_deref().and_then(AccessToken::new)
    }

    pub fn model_locations(&self) -> ModelLocations {
        ModelLocations {
            cache_dir: self.models_dir.clone(),
            bundled_dir: None,
        }
    }
}
