use crate::error::BeccaError;
use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::{Path, PathBuf},
};

pub const DEFAULT_ROOT_NOTE_ID: &str = "root";
pub const DEFAULT_HIDDEN_SUBTREE_ROOT: &str = "_hidden";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeccaConfig {
    pub root_note_id: String,
    pub hidden_subtree_root: String,
    /// Template applied to every note after its own templates (lowest precedence).
    pub default_template_note_id: Option<String>,
    pub search: SearchDefaults,
}

impl Default for BeccaConfig {
    fn default() -> Self {
        BeccaConfig {
            root_note_id: DEFAULT_ROOT_NOTE_ID.to_string(),
            hidden_subtree_root: DEFAULT_HIDDEN_SUBTREE_ROOT.to_string(),
            default_template_note_id: None,
            search: SearchDefaults::default(),
        }
    }
}

/// Search options used when a caller does not override them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchDefaults {
    pub include_archived: bool,
    pub include_hidden: bool,
    pub fast_search: bool,
    pub limit: Option<usize>,
}

impl BeccaConfig {
    pub fn from_toml_str(content: &str) -> Result<BeccaConfig, BeccaError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, BeccaError> {
        Ok(toml::to_string(self)?)
    }
}

pub trait ConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<BeccaConfig, BeccaError>;
    fn set_config(&self, config: &BeccaConfig) -> Result<(), BeccaError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        TomlConfigProvider {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<BeccaConfig, BeccaError> {
        tracing::debug!("Attempting to read config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(BeccaConfig::default());
        }
        let content = read_to_string(&self.path)?;
        BeccaConfig::from_toml_str(&content)
    }

    fn set_config(&self, config: &BeccaConfig) -> Result<(), BeccaError> {
        tracing::debug!("Attempting to write config to: {:?}", &self.path);
        write(&self.path, config.to_toml_string()?)?;
        Ok(())
    }
}
