use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::redirect::domain::FamilyDomain;

const DEFAULT_FAMILY_DOMAIN: &str = "slack.com";
const DEFAULT_CANONICAL_LABEL: &str = "app";
const DEFAULT_STORAGE_KEY_PREFIX: &str = "teamId_";
const DEFAULT_STORE_FILE: &str = "team_ids.yaml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RedirectConfig {
    family_domain: String,
    canonical_label: String,
    storage_key_prefix: String,
    store_path: PathBuf,
    max_cached_workspaces: Option<usize>,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            family_domain: DEFAULT_FAMILY_DOMAIN.to_string(),
            canonical_label: DEFAULT_CANONICAL_LABEL.to_string(),
            storage_key_prefix: DEFAULT_STORAGE_KEY_PREFIX.to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_FILE),
            max_cached_workspaces: None,
        }
    }
}

impl RedirectConfig {
    pub fn domain(&self) -> FamilyDomain {
        FamilyDomain::new(&self.family_domain, &self.canonical_label)
    }

    pub fn storage_key_prefix(&self) -> &str {
        &self.storage_key_prefix
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    pub fn max_cached_workspaces(&self) -> Option<usize> {
        self.max_cached_workspaces
    }

    /// Command line `--store` wins over the file setting.
    pub fn with_store_path(mut self, path: PathBuf) -> Self {
        self.store_path = path;
        self
    }
}

pub fn read_config(file_path: &Path) -> Result<RedirectConfig> {
    let yaml_content = fs::read_to_string(file_path)
        .with_context(|| format!("read config: {}", file_path.display()))?;

    if yaml_content.trim().is_empty() {
        return Ok(RedirectConfig::default());
    }

    let config: RedirectConfig = serde_yaml::from_str(&yaml_content)
        .with_context(|| format!("parse config: {}", file_path.display()))?;

    Ok(config)
}

/// Loads the config file when one is given, otherwise falls back to defaults.
pub fn load_config(file_path: Option<&Path>) -> Result<RedirectConfig> {
    match file_path {
        Some(path) => read_config(path),
        None => Ok(RedirectConfig::default()),
    }
}
