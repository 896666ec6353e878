//! The DataSource boundary
//!
//! One method per query. Every method returns immediately with a lazy
//! stream; the source connects when the stream is first polled and releases
//! whatever it holds when the stream is dropped. Implementations are shared
//! process-wide behind an `Arc` and passed explicitly to whoever needs them.

use crate::filter::{PluginFilter, ProposalFilter, StakeFilter, VoteFilter};
use crate::types::{
    Address, DaoState, MemberState, PluginState, ProposalState, Stake, TokenAmount, Vote,
};
use gov_stream::{DataStream, StreamOptions};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Query kinds (used for diagnostics and fault injection)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKind {
    /// DAO state
    DaoState,
    /// Proposal list
    Proposals,
    /// Single proposal
    ProposalState,
    /// Vote list
    Votes,
    /// Stake list
    Stakes,
    /// Member state
    Member,
    /// Token balance
    TokenBalance,
    /// Token allowance
    Allowance,
    /// Plugin list
    Plugins,
    /// Single plugin
    PluginState,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DaoState => "dao_state",
            Self::Proposals => "proposals",
            Self::ProposalState => "proposal_state",
            Self::Votes => "votes",
            Self::Stakes => "stakes",
            Self::Member => "member",
            Self::TokenBalance => "token_balance",
            Self::Allowance => "allowance",
            Self::Plugins => "plugins",
            Self::PluginState => "plugin_state",
        };
        f.write_str(name)
    }
}

/// Indexed governance data and chain reads
pub trait DataSource: Send + Sync + fmt::Debug {
    /// State of a DAO (`NotFound` if unknown)
    fn dao_state(&self, dao: &Address, options: StreamOptions) -> DataStream<DaoState>;

    /// Proposals selected by `filter`, windowed by `options.page`
    fn proposals(
        &self,
        filter: &ProposalFilter,
        options: StreamOptions,
    ) -> DataStream<Vec<ProposalState>>;

    /// State of one proposal (`NotFound` if unknown)
    fn proposal_state(&self, id: &str, options: StreamOptions) -> DataStream<ProposalState>;

    /// Votes selected by `filter`
    fn votes(&self, filter: &VoteFilter, options: StreamOptions) -> DataStream<Vec<Vote>>;

    /// Stakes selected by `filter`
    fn stakes(&self, filter: &StakeFilter, options: StreamOptions) -> DataStream<Vec<Stake>>;

    /// Membership of `account` in `dao` (zero reputation if not a member)
    fn member(
        &self,
        dao: &Address,
        account: &Address,
        options: StreamOptions,
    ) -> DataStream<MemberState>;

    /// Governance token balance of `owner`
    fn token_balance(&self, owner: &Address, options: StreamOptions) -> DataStream<TokenAmount>;

    /// Governance token allowance from `owner` to `spender`
    fn allowance(
        &self,
        owner: &Address,
        spender: &Address,
        options: StreamOptions,
    ) -> DataStream<TokenAmount>;

    /// Plugins selected by `filter`
    fn plugins(&self, filter: &PluginFilter, options: StreamOptions)
        -> DataStream<Vec<PluginState>>;

    /// State of one plugin (`NotFound` if unknown)
    fn plugin_state(&self, id: &str, options: StreamOptions) -> DataStream<PluginState>;
}
