//! Governance records
//!
//! Plain state records as delivered by the indexed data service and the
//! chain client. Outcomes of voting and staking rules arrive already
//! computed (stage, winning outcome, totals).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Account, DAO, or contract address
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub String);

impl Address {
    /// Create address
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow as str
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Token amount in base units
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TokenAmount(pub u128);

impl TokenAmount {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Check if zero
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// DAO state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaoState {
    /// DAO identifier (avatar address)
    pub address: Address,
    /// Display name
    pub name: String,
    /// Number of reputation holders
    pub member_count: usize,
    /// Total reputation supply
    pub total_reputation: TokenAmount,
}

/// Proposal lifecycle stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStage {
    /// Expired while queued
    ExpiredInQueue,
    /// Executed
    Executed,
    /// Queued for voting
    Queued,
    /// Pre-boosted
    PreBoosted,
    /// Boosted
    Boosted,
    /// Quiet ending period
    QuietEndingPeriod,
}

impl ProposalStage {
    /// Stages shown on the DAO history page
    pub const HISTORY: [Self; 3] = [Self::ExpiredInQueue, Self::Executed, Self::Queued];
}

/// Voting or staking outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Outcome {
    /// No decision
    #[default]
    None,
    /// In favour
    Pass,
    /// Against
    Fail,
}

/// Proposal state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalState {
    /// Proposal identifier
    pub id: String,
    /// Owning DAO
    pub dao: Address,
    /// Plugin (scheme) the proposal was submitted to
    pub plugin_id: String,
    /// Plugin display name
    pub plugin_name: String,
    /// Proposer account
    pub proposer: Address,
    /// Title
    pub title: String,
    /// Markdown description
    pub description: String,
    /// Current stage
    pub stage: ProposalStage,
    /// Creation time (unix seconds)
    pub created_at: i64,
    /// Closing time (unix seconds)
    pub closing_at: i64,
    /// Reputation voted in favour
    pub votes_for: TokenAmount,
    /// Reputation voted against
    pub votes_against: TokenAmount,
    /// Tokens staked in favour
    pub stakes_for: TokenAmount,
    /// Tokens staked against
    pub stakes_against: TokenAmount,
    /// Winning outcome (already computed)
    pub winning_outcome: Outcome,
    /// Voting machine contract
    pub voting_machine: Address,
}

/// A vote on a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Vote identifier
    pub id: String,
    /// Proposal voted on
    pub proposal_id: String,
    /// Voter account
    pub voter: Address,
    /// Chosen outcome
    pub outcome: Outcome,
    /// Reputation used
    pub amount: TokenAmount,
}

/// A stake on a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    /// Stake identifier
    pub id: String,
    /// Proposal staked on
    pub proposal_id: String,
    /// Staker account
    pub staker: Address,
    /// Predicted outcome
    pub outcome: Outcome,
    /// Tokens staked
    pub amount: TokenAmount,
}

/// Membership of an account in a DAO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberState {
    /// DAO
    pub dao: Address,
    /// Member account
    pub address: Address,
    /// Reputation held
    pub reputation: TokenAmount,
}

/// Plugin (scheme) installed in a DAO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginState {
    /// Plugin identifier
    pub id: String,
    /// Owning DAO
    pub dao: Address,
    /// Contract name (e.g. "ContributionReward")
    pub name: String,
    /// Contract address
    pub address: Address,
    /// Time proposals may start being submitted (unix seconds)
    pub activation_time: i64,
    /// Rewarder contract for reward-extension plugins
    pub rewarder: Option<Address>,
}

impl PluginState {
    /// Check if plugin accepts proposals at `now`
    #[inline]
    #[must_use]
    pub fn is_active(&self, now: i64) -> bool {
        self.activation_time <= now
    }

    /// Check if plugin has a rewarder contract attached
    #[inline]
    #[must_use]
    pub fn has_rewarder(&self) -> bool {
        self.rewarder.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_display_and_from() {
        let addr = Address::from("0xdao");
        assert_eq!(addr.to_string(), "0xdao");
        assert_eq!(addr.as_str(), "0xdao");
    }

    #[test]
    fn plugin_activation() {
        let plugin = PluginState {
            id: "p1".to_string(),
            dao: Address::from("0xdao"),
            name: "ContributionReward".to_string(),
            address: Address::from("0xp1"),
            activation_time: 100,
            rewarder: None,
        };
        assert!(!plugin.is_active(99));
        assert!(plugin.is_active(100));
        assert!(!plugin.has_rewarder());
    }
}
