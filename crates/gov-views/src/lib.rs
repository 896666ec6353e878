//! Governance views
//!
//! Views of the governance dashboard, each a factory plugged into a
//! subscription controller:
//! - [`DaoHistoryFactory`]: paginated history of closed proposals
//! - [`ProposalFeedFactory`]: one proposal card of the activity feed
//! - [`PluginContainerFactory`]: the page of one installed plugin
//!
//! # Example
//!
//! ```rust,ignore
//! use gov_views::{DaoHistoryFactory, DaoHistoryProps};
//! use std::sync::Arc;
//!
//! # async fn example(source: Arc<dyn gov_model::DataSource>) {
//! let history = DaoHistoryFactory::new(source).controller()?;
//! let mut view = history.binding();
//! history.mount(DaoHistoryProps::new("0xdao", None))?;
//! let first = view.wait_for(|s| s.is_ready()).await?;
//! if first.has_more_to_load {
//!     view.fetch_more();
//! }
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod clock;
pub mod dao_history;
pub mod plugin_container;
pub mod proposal_feed;

// Re-exports for convenience
pub use clock::{fixed_clock, format_date, system_clock, Clock};
pub use dao_history::{
    DaoHistory, DaoHistoryController, DaoHistoryFactory, DaoHistoryProps, HistoryRow,
    HISTORY_PAGE_SIZE,
};
pub use plugin_container::{
    PluginContainerController, PluginContainerFactory, PluginKind, PluginPageData,
    PluginPageProps, PluginTab, PluginView,
};
pub use proposal_feed::{
    ActionMenu, FeedEvent, FeedItemData, FeedItemProps, FeedItemView, ProposalFeedController,
    ProposalFeedFactory, ProposalRef,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for mounting views
    pub use crate::{
        DaoHistoryFactory, DaoHistoryProps, FeedItemProps, PluginContainerFactory,
        PluginPageProps, ProposalFeedFactory,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
