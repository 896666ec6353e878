//! Query filters
//!
//! Predicate-equivalent criteria for list queries. Each filter evaluates
//! locally (`matches`) so in-process sources and tests share one definition
//! of what a query selects.

use crate::types::{Address, PluginState, ProposalStage, ProposalState, Stake, Vote};
use serde::{Deserialize, Serialize};

/// Proposal ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProposalOrder {
    /// Latest closing time first
    #[default]
    ClosingAtDesc,
    /// Oldest creation time first
    CreatedAtAsc,
}

/// Proposal list filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalFilter {
    /// Restrict to DAO
    pub dao: Option<Address>,
    /// Restrict to plugin
    pub plugin: Option<String>,
    /// Allowed stages (empty = any)
    pub stages: Vec<ProposalStage>,
    /// Closing time at or before (unix seconds)
    pub closing_at_or_before: Option<i64>,
    /// Ordering
    pub order: ProposalOrder,
}

impl ProposalFilter {
    /// Filter for one DAO
    #[inline]
    #[must_use]
    pub fn for_dao(dao: Address) -> Self {
        Self {
            dao: Some(dao),
            ..Self::default()
        }
    }

    /// With plugin
    #[inline]
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    /// With allowed stages
    #[inline]
    #[must_use]
    pub fn with_stages(mut self, stages: &[ProposalStage]) -> Self {
        self.stages = stages.to_vec();
        self
    }

    /// With closing bound
    #[inline]
    #[must_use]
    pub fn closing_at_or_before(mut self, timestamp: i64) -> Self {
        self.closing_at_or_before = Some(timestamp);
        self
    }

    /// With ordering
    #[inline]
    #[must_use]
    pub fn ordered_by(mut self, order: ProposalOrder) -> Self {
        self.order = order;
        self
    }

    /// Check if proposal is selected
    #[must_use]
    pub fn matches(&self, proposal: &ProposalState) -> bool {
        self.dao.as_ref().map_or(true, |dao| &proposal.dao == dao)
            && self
                .plugin
                .as_ref()
                .map_or(true, |plugin| &proposal.plugin_id == plugin)
            && (self.stages.is_empty() || self.stages.contains(&proposal.stage))
            && self
                .closing_at_or_before
                .map_or(true, |bound| proposal.closing_at <= bound)
    }

    /// Sort proposals in filter order
    pub fn sort(&self, proposals: &mut [ProposalState]) {
        match self.order {
            ProposalOrder::ClosingAtDesc => proposals.sort_by(|a, b| {
                b.closing_at.cmp(&a.closing_at).then_with(|| a.id.cmp(&b.id))
            }),
            ProposalOrder::CreatedAtAsc => proposals.sort_by(|a, b| {
                a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
            }),
        }
    }
}

/// Vote list filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteFilter {
    /// Restrict to proposal
    pub proposal: Option<String>,
    /// Restrict to voter
    pub voter: Option<Address>,
}

impl VoteFilter {
    /// Votes by `voter` on `proposal`
    #[inline]
    #[must_use]
    pub fn by_voter_on(proposal: impl Into<String>, voter: Address) -> Self {
        Self {
            proposal: Some(proposal.into()),
            voter: Some(voter),
        }
    }

    /// Every vote by `voter`
    #[inline]
    #[must_use]
    pub fn by_voter(voter: Address) -> Self {
        Self {
            proposal: None,
            voter: Some(voter),
        }
    }

    /// Check if vote is selected
    #[must_use]
    pub fn matches(&self, vote: &Vote) -> bool {
        self.proposal.as_ref().map_or(true, |p| &vote.proposal_id == p)
            && self.voter.as_ref().map_or(true, |v| &vote.voter == v)
    }
}

/// Stake list filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeFilter {
    /// Restrict to proposal
    pub proposal: Option<String>,
    /// Restrict to staker
    pub staker: Option<Address>,
}

impl StakeFilter {
    /// Stakes by `staker` on `proposal`
    #[inline]
    #[must_use]
    pub fn by_staker_on(proposal: impl Into<String>, staker: Address) -> Self {
        Self {
            proposal: Some(proposal.into()),
            staker: Some(staker),
        }
    }

    /// Every stake by `staker`
    #[inline]
    #[must_use]
    pub fn by_staker(staker: Address) -> Self {
        Self {
            proposal: None,
            staker: Some(staker),
        }
    }

    /// Check if stake is selected
    #[must_use]
    pub fn matches(&self, stake: &Stake) -> bool {
        self.proposal.as_ref().map_or(true, |p| &stake.proposal_id == p)
            && self.staker.as_ref().map_or(true, |s| &stake.staker == s)
    }
}

/// Plugin list filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginFilter {
    /// Restrict to plugin id
    pub id: Option<String>,
    /// Restrict to DAO
    pub dao: Option<Address>,
    /// Restrict to contract name
    pub name: Option<String>,
}

impl PluginFilter {
    /// Plugin by id
    #[inline]
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Plugins of a DAO with a given contract name
    #[inline]
    #[must_use]
    pub fn named_in(dao: Address, name: impl Into<String>) -> Self {
        Self {
            id: None,
            dao: Some(dao),
            name: Some(name.into()),
        }
    }

    /// Check if plugin is selected
    #[must_use]
    pub fn matches(&self, plugin: &PluginState) -> bool {
        self.id.as_ref().map_or(true, |id| &plugin.id == id)
            && self.dao.as_ref().map_or(true, |dao| &plugin.dao == dao)
            && self.name.as_ref().map_or(true, |name| &plugin.name == name)
    }
}
