//! Dashboard configuration: where each branch's evaluations come from.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::locale::Locale;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    /// `source` is a local CSV or JSON path.
    #[default]
    File,
    /// `source` is the branch key in the evaluations table.
    Database,
    /// `source` is a URL returning JSON rows.
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BranchConfig {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default)]
    pub mode: ConnectionMode,
    #[serde(default)]
    pub locale: Locale,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default, rename = "branch")]
    pub branches: Vec<BranchConfig>,
}

fn default_cache_ttl_secs() -> u64 {
    30
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::default(),
            locale: Locale::default(),
            cache_ttl_secs: default_cache_ttl_secs(),
            branches: Vec::new(),
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        let config = Self::from_toml(&contents)?;
        debug!(
            path = %path.display(),
            mode = ?config.mode,
            branches = config.branches.len(),
            "loaded dashboard configuration"
        );
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: DashboardConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (index, branch) in self.branches.iter().enumerate() {
            if branch.name.trim().is_empty() {
                return Err(Error::Config(format!("branch #{} has no name", index + 1)));
            }
            if branch.source.trim().is_empty() {
                return Err(Error::Config(format!("branch `{}` has no source", branch.name)));
            }
            if self.branches[..index].iter().any(|b| b.name == branch.name) {
                return Err(Error::Config(format!("branch `{}` is listed twice", branch.name)));
            }
        }
        Ok(())
    }

    /// The named branch, or the first configured one when `name` is `None`.
    pub fn branch(&self, name: Option<&str>) -> Result<&BranchConfig> {
        match name {
            Some(name) => self
                .branches
                .iter()
                .find(|branch| branch.name == name)
                .ok_or_else(|| Error::UnknownBranch(name.to_string())),
            None => self
                .branches
                .first()
                .ok_or_else(|| Error::Config("no branches configured".to_string())),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
