//! Loader configuration and locator construction.
//!
//! A locator is the fetch address of a module: the configured base location
//! followed by either the module's path alias or the module id itself.
//!
//! ```toml
//! base_url = "./modules/"
//!
//! [paths]
//! jquery = "vendor/jquery-3.7.toml"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default base location for module locators.
pub const DEFAULT_BASE_URL: &str = "./";

/// Process-wide defaults consulted when computing locators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Prefix prepended to every locator.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-module path fragments replacing the id in the locator.
    #[serde(default)]
    pub paths: HashMap<String, String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            base_url: default_base_url(),
            paths: HashMap::new(),
        }
    }
}

impl LoaderConfig {
    /// Create a configuration with the given base and no path aliases.
    pub fn new(base_url: impl Into<String>) -> Self {
        LoaderConfig {
            base_url: base_url.into(),
            paths: HashMap::new(),
        }
    }

    /// Add a path alias for `id`.
    pub fn with_path(mut self, id: impl Into<String>, path: impl Into<String>) -> Self {
        self.paths.insert(id.into(), path.into());
        self
    }

    /// The path fragment used for `id`: its alias, or the id itself.
    pub fn path_for<'a>(&'a self, id: &'a str) -> &'a str {
        self.paths.get(id).map(String::as_str).unwrap_or(id)
    }

    /// Compute the fetch locator for a module id.
    pub fn locate(&self, id: &str) -> String {
        format!("{}{}", self.base_url, self.path_for(id))
    }

    /// Parse a configuration from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
