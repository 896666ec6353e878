//! Controller configuration

use crate::error::ControllerError;
use serde::{Deserialize, Serialize};

/// Configuration of one subscription controller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Props whose change restarts the subscription (empty = never)
    #[serde(default)]
    pub watched_keys: Vec<String>,
    /// Page size for paginated controllers
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl ControllerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With watched keys
    #[must_use]
    pub fn with_watched_keys(mut self, keys: &[&str]) -> Self {
        self.watched_keys = keys.iter().map(|k| (*k).to_string()).collect();
        self
    }

    /// With page size
    #[inline]
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Validate watched keys
    ///
    /// # Errors
    /// - `ControllerError::Config` if a key is blank or repeated
    pub fn validate(&self) -> Result<(), ControllerError> {
        for (index, key) in self.watched_keys.iter().enumerate() {
            if key.trim().is_empty() {
                return Err(ControllerError::Config("watched key is blank".into()));
            }
            if self.watched_keys[..index].contains(key) {
                return Err(ControllerError::Config(format!(
                    "watched key `{key}` is repeated"
                )));
            }
        }
        Ok(())
    }

    /// Validate for pagination and return the page size
    ///
    /// # Errors
    /// - `ControllerError::Config` if the page size is missing or zero
    pub fn validate_paginated(&self) -> Result<usize, ControllerError> {
        self.validate()?;
        match self.page_size {
            Some(0) => Err(ControllerError::Config("page size must be positive".into())),
            Some(size) => Ok(size),
            None => Err(ControllerError::Config(
                "page size is required for pagination".into(),
            )),
        }
    }
}
