//! Subscription controller
//!
//! Binds a mounted view to asynchronous data:
//! - [`SubscriptionController`]: subscribe on mount, restart when watched
//!   props change, cancel on unmount; never applies a stale emission
//! - [`PaginatedController`]: accumulates pages of keyed items behind
//!   `fetch_more`, keeping fetched rows live
//! - [`ViewBinding`]: the snapshot channel a view renders from
//!
//! # Example
//!
//! ```rust,ignore
//! use gov_subscription::{ControllerConfig, SubscriptionController};
//!
//! # async fn example(factory: impl gov_subscription::SubscriptionFactory<Props = Props>) {
//! let controller = SubscriptionController::new(
//!     factory,
//!     ControllerConfig::new().with_watched_keys(&["event"]),
//! )?;
//! let mut view = controller.binding();
//! controller.mount(props)?;
//! let ready = view.wait_for(|s| s.is_ready()).await?;
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod binding;
pub mod config;
pub mod controller;
pub mod error;
pub mod handle;
pub mod identity;
pub mod pagination;
pub mod state;

// Re-exports for convenience
pub use binding::{TransitionEvent, TransitionObserver, ViewBinding, ViewSnapshot};
pub use config::ControllerConfig;
pub use controller::{
    Accumulator, ControllerStats, Replace, SubscriptionController, SubscriptionFactory,
};
pub use error::ControllerError;
pub use handle::{ActiveHandle, ControllerId};
pub use identity::IdentityKey;
pub use pagination::{
    AccumulatedList, Keyed, PageAccumulator, PageCursor, PageFactory, PaginatedController,
};
pub use state::{allowed_transitions, validate_transition, StateKind, SubscriptionState};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building controllers
    pub use crate::{
        ControllerConfig, ControllerError, Keyed, PageCursor, PageFactory, PaginatedController,
        StateKind, SubscriptionController, SubscriptionFactory, SubscriptionState, ViewBinding,
        ViewSnapshot,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
