//! Error types for governance data streams
//!
//! Three kinds of failure cross a stream boundary:
//! - the source could not produce or maintain the stream
//! - a requested entity does not exist
//! - the subscription was superseded (internal only, never shown to a view)

/// Error carried by a [`DataStream`](crate::DataStream)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// Network or service failure in the data source
    #[error("source error: {0}")]
    Source(String),

    /// Requested entity does not exist
    #[error("{entity} not found. ID: {id}")]
    NotFound {
        /// Entity kind (e.g. "Plugin")
        entity: String,
        /// Identifier that was looked up
        id: String,
    },

    /// Emission belongs to a cancelled subscription
    #[error("subscription cancelled")]
    Cancelled,
}

impl StreamError {
    /// Create a source error
    #[inline]
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source(message.into())
    }

    /// Create a not-found error
    #[inline]
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Check if error is the internal cancellation signal
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if error is a missing entity
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if error may be shown to a view
    #[inline]
    #[must_use]
    pub fn is_surfaced(&self) -> bool {
        !self.is_cancelled()
    }
}

/// Result type alias for stream items
pub type StreamResult<T> = Result<T, StreamError>;
