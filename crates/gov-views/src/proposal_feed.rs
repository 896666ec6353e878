//! Proposal feed item
//!
//! One card of the activity feed. The card watches its `event`: scrolling
//! or theme changes re-render it without touching the subscription, a new
//! event replaces it.
//!
//! Seven sources are combined into one update: the DAO, the live proposal,
//! the current account's stakes and votes on it, the account's membership,
//! and its governance token balance and allowance towards the proposal's
//! voting machine.

use crate::clock::{system_clock, Clock};
use async_trait::async_trait;
use futures::StreamExt;
use gov_model::{
    Address, DaoState, DataSource, MemberState, Outcome, ProposalState, Stake, StakeFilter,
    TokenAmount, Vote, VoteFilter,
};
use gov_stream::{combine_latest7, DataStream, StreamError, StreamOptions};
use gov_subscription::{ControllerConfig, ControllerError, SubscriptionController, SubscriptionFactory};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Characters of the description shown on a card
pub const DESCRIPTION_PREVIEW_CHARS: usize = 600;

/// Proposal as referenced by a feed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposalRef {
    /// Proposal identifier
    pub id: String,
    /// Plugin the proposal belongs to
    pub plugin_id: String,
    /// Plugin display name
    pub plugin_name: String,
    /// Proposer account
    pub proposer: Address,
    /// Title at the time of the event
    pub title: String,
    /// Voting machine contract
    pub voting_machine: Address,
}

impl From<&ProposalState> for ProposalRef {
    fn from(proposal: &ProposalState) -> Self {
        Self {
            id: proposal.id.clone(),
            plugin_id: proposal.plugin_id.clone(),
            plugin_name: proposal.plugin_name.clone(),
            proposer: proposal.proposer.clone(),
            title: proposal.title.clone(),
            voting_machine: proposal.voting_machine.clone(),
        }
    }
}

/// Feed event announcing a proposal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEvent {
    /// Event identifier
    pub id: String,
    /// DAO the event belongs to
    pub dao: Address,
    /// Proposal the event is about
    pub proposal: ProposalRef,
}

/// Props of a feed card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedItemProps {
    /// Connected account
    pub current_account: Address,
    /// Event shown by the card
    pub event: FeedEvent,
    /// Card is expanded in the feed
    pub expanded: bool,
}

impl FeedItemProps {
    /// Collapsed card for `event`
    #[must_use]
    pub fn new(current_account: Address, event: FeedEvent) -> Self {
        Self {
            current_account,
            event,
            expanded: false,
        }
    }
}

/// Latest values of the seven card sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItemData {
    pub dao: DaoState,
    pub proposal: ProposalState,
    pub stakes: Vec<Stake>,
    pub votes: Vec<Vote>,
    pub member: MemberState,
    pub balance: TokenAmount,
    pub allowance: TokenAmount,
}

type FeedTuple = (
    DaoState,
    ProposalState,
    Vec<Stake>,
    Vec<Vote>,
    MemberState,
    TokenAmount,
    TokenAmount,
);

impl From<FeedTuple> for FeedItemData {
    fn from((dao, proposal, stakes, votes, member, balance, allowance): FeedTuple) -> Self {
        Self {
            dao,
            proposal,
            stakes,
            votes,
            member,
            balance,
            allowance,
        }
    }
}

/// Inputs of the proposal action menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMenu {
    /// Account's vote, if any
    pub current_vote: Option<Outcome>,
    /// Voting closed
    pub expired: bool,
    /// Account membership
    pub member: MemberState,
    /// Account token balance
    pub balance: TokenAmount,
    /// Account allowance towards the voting machine
    pub allowance: TokenAmount,
    /// Account stakes on the proposal
    pub stakes: Vec<Stake>,
}

impl ActionMenu {
    /// Check if the account may vote
    #[inline]
    #[must_use]
    pub fn can_vote(&self) -> bool {
        !self.expired && self.current_vote.is_none() && !self.member.reputation.is_zero()
    }

    /// Check if the account may stake
    #[inline]
    #[must_use]
    pub fn can_stake(&self) -> bool {
        !self.expired && !self.balance.is_zero()
    }

    /// Check if staking needs an allowance first
    #[inline]
    #[must_use]
    pub fn needs_approval(&self) -> bool {
        self.allowance.is_zero()
    }
}

/// Rendered feed card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItemView {
    /// DAO name
    pub dao_name: String,
    /// Plugin name
    pub plugin_name: String,
    /// Title, or the proposal id when untitled
    pub title: String,
    /// Proposer account
    pub proposer: Address,
    /// Description, cut to the preview length
    pub description: String,
    /// Description was cut
    pub show_full_details: bool,
    /// Action menu
    pub actions: ActionMenu,
}

impl FeedItemView {
    /// Build the card from the latest data at time `now`
    #[must_use]
    pub fn build(props: &FeedItemProps, data: &FeedItemData, now: i64) -> Self {
        let current_vote = data
            .votes
            .iter()
            .find(|v| v.voter == props.current_account)
            .map(|v| v.outcome);
        let expired = data.proposal.closing_at <= now;
        let (description, show_full_details) = preview(&data.proposal.description);
        let title = if data.proposal.title.is_empty() {
            data.proposal.id.clone()
        } else {
            data.proposal.title.clone()
        };

        Self {
            dao_name: data.dao.name.clone(),
            plugin_name: props.event.proposal.plugin_name.clone(),
            title,
            proposer: props.event.proposal.proposer.clone(),
            description,
            show_full_details,
            actions: ActionMenu {
                current_vote,
                expired,
                member: data.member.clone(),
                balance: data.balance,
                allowance: data.allowance,
                stakes: data.stakes.clone(),
            },
        }
    }
}

/// First `DESCRIPTION_PREVIEW_CHARS` characters, and whether text was cut
fn preview(description: &str) -> (String, bool) {
    match description.char_indices().nth(DESCRIPTION_PREVIEW_CHARS) {
        Some((cut, _)) => (description[..cut].to_string(), true),
        None => (description.to_string(), false),
    }
}

/// Factory of the feed card stream
#[derive(Clone)]
pub struct ProposalFeedFactory {
    source: Arc<dyn DataSource>,
    clock: Clock,
}

impl ProposalFeedFactory {
    /// Create factory over `source`
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            clock: system_clock(),
        }
    }

    /// With clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time of this factory's clock
    #[must_use]
    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Controller configuration of the card
    #[must_use]
    pub fn config() -> ControllerConfig {
        ControllerConfig::new().with_watched_keys(&["event"])
    }

    /// Build the card controller
    ///
    /// # Errors
    /// - `ControllerError::Config` if the configuration is rejected
    pub fn controller(self) -> Result<ProposalFeedController, ControllerError> {
        SubscriptionController::new(self, Self::config())
    }
}

impl fmt::Debug for ProposalFeedFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProposalFeedFactory")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SubscriptionFactory for ProposalFeedFactory {
    type Props = FeedItemProps;
    type Data = FeedItemData;

    async fn create(&self, props: &FeedItemProps) -> Result<DataStream<FeedItemData>, StreamError> {
        let event = &props.event;
        let account = &props.current_account;
        let proposal_id = event.proposal.id.as_str();
        tracing::debug!(event = %event.id, proposal = proposal_id, "opening feed card");

        let combined = combine_latest7(
            self.source.dao_state(&event.dao, StreamOptions::once()),
            self.source.proposal_state(proposal_id, StreamOptions::live()),
            self.source.stakes(
                &StakeFilter::by_staker_on(proposal_id, account.clone()),
                StreamOptions::live(),
            ),
            self.source.votes(
                &VoteFilter::by_voter_on(proposal_id, account.clone()),
                StreamOptions::live(),
            ),
            self.source.member(&event.dao, account, StreamOptions::once()),
            self.source.token_balance(account, StreamOptions::once()),
            self.source
                .allowance(account, &event.proposal.voting_machine, StreamOptions::once()),
        );

        Ok(combined.map(|item| item.map(FeedItemData::from)).boxed())
    }
}

/// Controller of a feed card
pub type ProposalFeedController = SubscriptionController<ProposalFeedFactory>;
