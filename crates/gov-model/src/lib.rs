//! Governance model
//!
//! Governance records (DAOs, proposals, votes, stakes, members, plugins),
//! the [`DataSource`] boundary through which views obtain them as streams,
//! and [`MemoryDataSource`], an in-process source over a mutable store.
//!
//! # Example
//!
//! ```rust,ignore
//! use gov_model::{demo_store, now_unix, Address, DataSource, MemoryDataSource};
//! use gov_stream::StreamOptions;
//! use futures::StreamExt;
//!
//! # async fn example() {
//! let source = MemoryDataSource::new(demo_store(10, now_unix()));
//! let mut dao = source.dao_state(&Address::from("0xdao"), StreamOptions::live());
//! let state = dao.next().await;
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod filter;
pub mod memory;
pub mod seed;
pub mod source;
pub mod types;

// Re-exports for convenience
pub use filter::{PluginFilter, ProposalFilter, ProposalOrder, StakeFilter, VoteFilter};
pub use memory::{GovernanceStore, MemoryDataSource, StreamCounters};
pub use seed::{demo_proposal, demo_store, now_unix};
pub use source::{DataSource, QueryKind};
pub use types::{
    Address, DaoState, MemberState, Outcome, PluginState, ProposalStage, ProposalState, Stake,
    TokenAmount, Vote,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with governance data
    pub use crate::{
        Address, DataSource, MemoryDataSource, ProposalFilter, ProposalStage, ProposalState,
        TokenAmount,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
