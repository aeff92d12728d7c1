//! Entity configuration via `entity.toml`
//!
//! Each managed collection is described by an [`EntityConfig`]: the entity
//! name used in derived codes and paths, the identity salts, and the paging
//! and retry bounds the orchestrator runs with. A config can be built in
//! code or read from a TOML file; missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::page::DEFAULT_PAGE_SIZE;

/// Config file name placed next to the collection's data
pub const CONFIG_FILE_NAME: &str = "entity.toml";

/// Default stamp attempt ceiling
pub const DEFAULT_MAX_STAMP_ATTEMPTS: u32 = 1000;

/// Default number of concurrent saves during a reboot
pub const DEFAULT_REBOOT_PARALLELISM: usize = 8;

/// Entity configuration loaded from `entity.toml`.
///
/// # Example
///
/// ```toml
/// name = "user"
/// title = "User"
/// difference = "user"
/// page_size = 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Entity name, used in `code` and `path`
    #[serde(default = "default_name")]
    pub name: String,
    /// Human-readable title
    #[serde(default = "default_title")]
    pub title: String,
    /// Salt for stamp and short code encoding; generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    /// Per-entity hash salt separating identical factors across entities
    #[serde(default = "default_name")]
    pub difference: String,
    /// Default page size for paginated reads
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    /// Ceiling on stamp collision retries
    #[serde(default = "default_max_stamp_attempts")]
    pub max_stamp_attempts: u32,
    /// Concurrent saves per reboot wave
    #[serde(default = "default_reboot_parallelism")]
    pub reboot_parallelism: usize,
    /// Whether update/modify resets log and skip individual save failures
    #[serde(default = "default_slack")]
    pub slack: bool,
}

fn default_name() -> String {
    "document".to_string()
}

fn default_title() -> String {
    "Document".to_string()
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_max_stamp_attempts() -> u32 {
    DEFAULT_MAX_STAMP_ATTEMPTS
}

fn default_reboot_parallelism() -> usize {
    DEFAULT_REBOOT_PARALLELISM
}

fn default_slack() -> bool {
    true
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            title: default_title(),
            salt: None,
            difference: default_name(),
            page_size: default_page_size(),
            max_stamp_attempts: default_max_stamp_attempts(),
            reboot_parallelism: default_reboot_parallelism(),
            slack: default_slack(),
        }
    }
}

impl EntityConfig {
    /// Config for a named entity; `difference` follows the name
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            difference: name.clone(),
            name,
            ..Self::default()
        }
    }

    /// Set the stamp salt
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    /// Set the default page size
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the stamp attempt ceiling
    pub fn with_max_stamp_attempts(mut self, attempts: u32) -> Self {
        self.max_stamp_attempts = attempts;
        self
    }

    /// Set the reboot wave width
    pub fn with_reboot_parallelism(mut self, parallelism: usize) -> Self {
        self.reboot_parallelism = parallelism;
        self
    }

    /// Set whether update/modify resets skip failed saves
    pub fn with_slack(mut self, slack: bool) -> Self {
        self.slack = slack;
        self
    }

    /// Check invariants the orchestrator relies on
    ///
    /// # Errors
    ///
    /// Returns `Config` if the name is empty or contains `/`, or if any
    /// bound is zero.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::Config("entity name must not be empty".to_string()));
        }
        if self.name.contains('/') {
            return Err(Error::Config(format!(
                "entity name '{}' must not contain '/'",
                self.name
            )));
        }
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        if self.max_stamp_attempts == 0 {
            return Err(Error::Config(
                "max_stamp_attempts must be at least 1".to_string(),
            ));
        }
        if self.reboot_parallelism == 0 {
            return Err(Error::Config(
                "reboot_parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Myelin entity configuration
#
# Entity name, used in derived codes (<name>-<stamp>) and paths (/<name>/<code>)
name = "document"
title = "Document"

# Hash salt distinguishing identical factor sets across entity types
difference = "document"

# Stamp encoding salt. Generated at startup when absent; set it to keep
# stamps stable across restarts.
# salt = "..."

# Default page size for list/search/sort reads
page_size = 5

# Stamp collision retry ceiling
max_stamp_attempts = 1000

# Concurrent saves per reboot wave
reboot_parallelism = 8

# Log and skip individual save failures during update/modify resets
slack = true
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: EntityConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
