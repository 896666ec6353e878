//! Stream options recognized by data sources

use serde::{Deserialize, Serialize};

/// Page window for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of items to skip
    pub offset: usize,
    /// Maximum number of items to return
    pub limit: usize,
}

impl PageRequest {
    /// Create page request
    #[inline]
    #[must_use]
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// First page of the given size
    #[inline]
    #[must_use]
    pub fn first(limit: usize) -> Self {
        Self::new(0, limit)
    }
}

/// Options passed alongside every query
///
/// With `subscribe == false` a stream emits exactly one value and completes;
/// with `subscribe == true` it keeps emitting until dropped. Filter criteria
/// are part of each typed query rather than of the options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Keep emitting after the first value
    pub subscribe: bool,
    /// Optional page window
    pub page: Option<PageRequest>,
}

impl StreamOptions {
    /// One value, then complete
    #[inline]
    #[must_use]
    pub fn once() -> Self {
        Self::default()
    }

    /// Emit until dropped
    #[inline]
    #[must_use]
    pub fn live() -> Self {
        Self {
            subscribe: true,
            page: None,
        }
    }

    /// With page window
    #[inline]
    #[must_use]
    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }
}
