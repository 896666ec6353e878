//! Governance data streams
//!
//! The boundary vocabulary shared by every data source and every view
//! controller:
//! - [`DataStream`]: a boxed, fallible, asynchronous sequence of values
//! - [`StreamOptions`]: subscribe / page options recognized by data sources
//! - [`StreamError`]: the error taxonomy surfaced to views
//! - combine-latest combinators merging N sources into one tuple stream
//!
//! # Example
//!
//! ```rust,ignore
//! use gov_stream::{combine_latest2, single};
//! use futures::StreamExt;
//!
//! # async fn example() {
//! let combined = combine_latest2(single(1_u32), single("dao"));
//! let first = combined.boxed().next().await;
//! assert_eq!(first, Some(Ok((1, "dao"))));
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod combine;
pub mod error;
pub mod options;
pub mod stream;

// Re-exports for convenience
pub use combine::{
    combine_latest2, combine_latest3, combine_latest4, combine_latest5, combine_latest6,
    combine_latest7, combine_latest_all, CombineLatest2, CombineLatest3, CombineLatest4,
    CombineLatest5, CombineLatest6, CombineLatest7, CombineLatestAll,
};
pub use error::{StreamError, StreamResult};
pub use options::{PageRequest, StreamOptions};
pub use stream::{empty, from_future, single, DataStream};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with governance data streams
    pub use crate::{
        combine_latest2, combine_latest3, combine_latest_all, single, DataStream, PageRequest,
        StreamError, StreamOptions,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
