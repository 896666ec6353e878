//! Dashboard configuration
//!
//! Read from a TOML file; every field has a default so a missing file or a
//! partial one is fine. Command-line flags override the file.

use anyhow::{ensure, Context, Result};
use gov_model::seed::DEMO_ACCOUNT;
use gov_views::HISTORY_PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// History page size
    pub page_size: usize,
    /// Default tracing filter (`RUST_LOG` wins)
    pub log_filter: String,
    /// Closed proposals seeded into the demo DAO
    pub proposals: usize,
    /// Account the dashboard acts as
    pub account: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: HISTORY_PAGE_SIZE,
            log_filter: "info".to_string(),
            proposals: 62,
            account: DEMO_ACCOUNT.to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load from `path`
    ///
    /// # Errors
    /// - the file cannot be read or parsed
    /// - the values are invalid
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, defaults otherwise
    ///
    /// # Errors
    /// - see [`load`](Self::load)
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Apply command-line overrides
    #[must_use]
    pub fn with_overrides(mut self, page_size: Option<usize>, proposals: Option<usize>) -> Self {
        if let Some(page_size) = page_size {
            self.page_size = page_size;
        }
        if let Some(proposals) = proposals {
            self.proposals = proposals;
        }
        self
    }

    /// Check values
    ///
    /// # Errors
    /// - page size is zero
    /// - account is blank
    pub fn validate(&self) -> Result<()> {
        ensure!(self.page_size > 0, "page_size must be greater than zero");
        ensure!(!self.account.trim().is_empty(), "account must not be blank");
        Ok(())
    }
}
