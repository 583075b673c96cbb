//! Store configuration via `tempora.toml`
//!
//! A default file is written on request; edit it and reopen the store to
//! change settings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tempora_core::{Referential, TemporaError, TemporaResult};
use tracing::info;

/// Config file name placed next to the data it configures.
pub const CONFIG_FILE_NAME: &str = "tempora.toml";

/// Record store configuration loaded from `tempora.toml`.
///
/// # Example
///
/// ```toml
/// transactions = true
/// max_batch_items = 10000
/// default_referential = "now"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Validate per-identity revisions on commit.
    #[serde(default = "default_transactions")]
    pub transactions: bool,
    /// Upper bound on items in one insertion call.
    #[serde(default = "default_max_batch_items")]
    pub max_batch_items: usize,
    /// Referential for reads that do not name one: `"now"` or `"any"`.
    #[serde(default = "default_referential_str")]
    pub default_referential: String,
}

fn default_transactions() -> bool {
    true
}

fn default_max_batch_items() -> usize {
    10_000
}

fn default_referential_str() -> String {
    "now".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            transactions: default_transactions(),
            max_batch_items: default_max_batch_items(),
            default_referential: default_referential_str(),
        }
    }
}

impl StoreConfig {
    /// Parse the default referential string.
    ///
    /// `"now"` yields a fresh, unresolved `Now` on every call.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not `"now"` or `"any"`.
    pub fn default_referential(&self) -> TemporaResult<Referential> {
        match self.default_referential.as_str() {
            "now" => Ok(Referential::now()),
            "any" => Ok(Referential::any()),
            other => Err(TemporaError::config(format!(
                "Invalid default_referential '{}' in {}. Expected \"now\" or \"any\".",
                other, CONFIG_FILE_NAME
            ))),
        }
    }

    /// Check every field.
    pub fn validate(&self) -> TemporaResult<()> {
        if self.max_batch_items == 0 {
            return Err(TemporaError::config(format!(
                "max_batch_items in {} must be at least 1",
                CONFIG_FILE_NAME
            )));
        }
        self.default_referential()?;
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Tempora record store configuration
#
# Validate per-identity revisions on commit (default: true).
# When false, concurrent writers to one identity are not detected;
# every batch is still applied all or nothing.
transactions = true

# Maximum number of records in one insertion call (default: 10000).
max_batch_items = 10000

# Referential used by reads that do not pass one: "now" (default) or "any".
default_referential = "now"
"#
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be parsed or holds invalid values.
    pub fn from_toml_str(content: &str) -> TemporaResult<Self> {
        let config: StoreConfig = toml::from_str(content)
            .map_err(|e| TemporaError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> TemporaResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TemporaError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: StoreConfig = toml::from_str(&content).map_err(|e| {
            TemporaError::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        info!(
            target: "tempora::config",
            path = %path.display(),
            transactions = config.transactions,
            max_batch_items = config.max_batch_items,
            default_referential = %config.default_referential,
            "Loaded store config"
        );
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> TemporaResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                TemporaError::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            info!(target: "tempora::config", path = %path.display(), "Wrote default config");
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> TemporaResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TemporaError::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            TemporaError::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
