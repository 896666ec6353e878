//! DAO history page
//!
//! Lists the DAO's closed proposals (expired in queue, executed, or queued
//! past their closing time), latest closing time first, fifty per page.
//! Each row carries the current account's vote and stakes on the proposal.
//! Every fetched page stays live: a vote recorded after its page loaded
//! updates that row in place.
//!
//! Nothing in the props is watched. A page opened for another DAO is a new
//! controller, not a prop update.

use crate::clock::{format_date, system_clock, Clock};
use async_trait::async_trait;
use futures::StreamExt;
use gov_model::{
    Address, DaoState, DataSource, ProposalFilter, ProposalOrder, ProposalStage, ProposalState,
    Stake, StakeFilter, TokenAmount, Vote, VoteFilter,
};
use gov_stream::{
    combine_latest2, combine_latest3, DataStream, PageRequest, StreamError, StreamOptions,
};
use gov_subscription::{
    ControllerConfig, ControllerError, Keyed, PageCursor, PageFactory, PaginatedController,
    SubscriptionFactory,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Proposals per history page
pub const HISTORY_PAGE_SIZE: usize = 50;

/// Props of the history page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaoHistoryProps {
    /// DAO whose history is shown
    pub dao: Address,
    /// Connected account, if any
    pub current_account: Option<Address>,
}

impl DaoHistoryProps {
    /// Props for `dao` viewed by `account`
    #[must_use]
    pub fn new(dao: impl Into<Address>, current_account: Option<Address>) -> Self {
        Self {
            dao: dao.into(),
            current_account,
        }
    }
}

/// One row of the history table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    /// The proposal
    pub proposal: ProposalState,
    /// Current account's vote
    pub account_vote: Option<Vote>,
    /// Current account's stakes
    pub account_stakes: Vec<Stake>,
}

impl HistoryRow {
    /// End date column
    #[must_use]
    pub fn closes_on(&self) -> String {
        format_date(self.proposal.closing_at)
    }

    /// Total staked by the current account
    #[must_use]
    pub fn account_staked(&self) -> TokenAmount {
        TokenAmount(self.account_stakes.iter().map(|s| s.amount.0).sum())
    }

    /// Check if the current account took part (voted or staked)
    #[inline]
    #[must_use]
    pub fn has_account_actions(&self) -> bool {
        self.account_vote.is_some() || !self.account_stakes.is_empty()
    }
}

impl Keyed for HistoryRow {
    type Key = String;

    fn key(&self) -> String {
        self.proposal.id.clone()
    }
}

/// Data rendered by the history page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaoHistory {
    /// DAO state, fetched once
    pub dao: DaoState,
    /// Accumulated rows
    pub rows: Vec<HistoryRow>,
}

impl DaoHistory {
    /// Check if the DAO has no closed proposals
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Placeholder shown instead of an empty table
    #[must_use]
    pub fn empty_message(&self) -> Option<String> {
        self.is_empty().then(|| {
            format!(
                "{} hasn't passed any proposals yet. Check the DAO's installed plugins for open proposals.",
                self.dao.name
            )
        })
    }
}

/// Attach the account's votes and stakes to each proposal
fn join_rows(proposals: Vec<ProposalState>, votes: &[Vote], stakes: &[Stake]) -> Vec<HistoryRow> {
    proposals
        .into_iter()
        .map(|proposal| {
            let account_vote = votes
                .iter()
                .find(|v| v.proposal_id == proposal.id)
                .cloned();
            let account_stakes = stakes
                .iter()
                .filter(|s| s.proposal_id == proposal.id)
                .cloned()
                .collect();
            HistoryRow {
                proposal,
                account_vote,
                account_stakes,
            }
        })
        .collect()
}

/// Factory of the history page streams
#[derive(Clone)]
pub struct DaoHistoryFactory {
    source: Arc<dyn DataSource>,
    clock: Clock,
    page_size: usize,
}

impl DaoHistoryFactory {
    /// Create factory over `source`
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            clock: system_clock(),
            page_size: HISTORY_PAGE_SIZE,
        }
    }

    /// With clock
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// With page size
    #[inline]
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Controller configuration of the page
    #[must_use]
    pub fn config(&self) -> ControllerConfig {
        ControllerConfig::new().with_page_size(self.page_size)
    }

    /// Build the page controller
    ///
    /// # Errors
    /// - `ControllerError::Config` if the page size is zero
    pub fn controller(self) -> Result<DaoHistoryController, ControllerError> {
        let config = self.config();
        PaginatedController::new(self, config)
    }

    /// Closed proposals of `dao`, evaluated against the current time
    fn filter(&self, dao: &Address) -> ProposalFilter {
        ProposalFilter::for_dao(dao.clone())
            .with_stages(&ProposalStage::HISTORY)
            .closing_at_or_before((self.clock)())
            .ordered_by(ProposalOrder::ClosingAtDesc)
    }

    /// Live rows of one page
    fn rows(&self, props: &DaoHistoryProps, page: PageRequest) -> DataStream<Vec<HistoryRow>> {
        let proposals = self.source.proposals(
            &self.filter(&props.dao),
            StreamOptions::live().with_page(page),
        );

        let Some(account) = props.current_account.as_ref() else {
            return proposals
                .map(|item| item.map(|proposals| join_rows(proposals, &[], &[])))
                .boxed();
        };

        let votes = self
            .source
            .votes(&VoteFilter::by_voter(account.clone()), StreamOptions::live());
        let stakes = self
            .source
            .stakes(&StakeFilter::by_staker(account.clone()), StreamOptions::live());

        combine_latest3(proposals, votes, stakes)
            .map(|item| item.map(|(proposals, votes, stakes)| join_rows(proposals, &votes, &stakes)))
            .boxed()
    }
}

impl fmt::Debug for DaoHistoryFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaoHistoryFactory")
            .field("source", &self.source)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SubscriptionFactory for DaoHistoryFactory {
    type Props = DaoHistoryProps;
    type Data = DaoHistory;

    async fn create(&self, props: &DaoHistoryProps) -> Result<DataStream<DaoHistory>, StreamError> {
        tracing::debug!(dao = %props.dao, page_size = self.page_size, "opening history");
        let first_page = self.rows(props, PageRequest::first(self.page_size));
        let dao = self.source.dao_state(&props.dao, StreamOptions::once());

        Ok(combine_latest2(first_page, dao)
            .map(|item| item.map(|(rows, dao)| DaoHistory { dao, rows }))
            .boxed())
    }
}

#[async_trait]
impl PageFactory for DaoHistoryFactory {
    type Item = HistoryRow;

    fn page_items(data: &DaoHistory) -> &[HistoryRow] {
        &data.rows
    }

    fn with_items(data: DaoHistory, items: Vec<HistoryRow>) -> DaoHistory {
        DaoHistory {
            dao: data.dao,
            rows: items,
        }
    }

    async fn fetch_page(
        &self,
        props: &DaoHistoryProps,
        cursor: PageCursor,
    ) -> Result<DataStream<Vec<HistoryRow>>, StreamError> {
        Ok(self.rows(props, cursor.request()))
    }
}

/// Controller of the history page
pub type DaoHistoryController = PaginatedController<DaoHistoryFactory>;

#[cfg(test)]
mod tests {
    use super::*;
    use gov_model::{demo_proposal, Outcome};

    fn vote(proposal: &str) -> Vote {
        Vote {
            id: format!("vote-{proposal}"),
            proposal_id: proposal.to_string(),
            voter: Address::from("0xalice"),
            outcome: Outcome::Fail,
            amount: TokenAmount(10),
        }
    }

    fn stake(proposal: &str, amount: u128) -> Stake {
        Stake {
            id: format!("stake-{proposal}-{amount}"),
            proposal_id: proposal.to_string(),
            staker: Address::from("0xalice"),
            outcome: Outcome::Pass,
            amount: TokenAmount(amount),
        }
    }

    #[test]
    fn join_attaches_account_actions() {
        let proposals = vec![
            demo_proposal(0, ProposalStage::Executed, 10),
            demo_proposal(1, ProposalStage::Queued, 5),
        ];
        let rows = join_rows(
            proposals,
            &[vote("proposal-0001")],
            &[stake("proposal-0001", 3), stake("proposal-0001", 4)],
        );

        assert!(!rows[0].has_account_actions());
        assert_eq!(rows[1].account_vote.as_ref().map(|v| v.outcome), Some(Outcome::Fail));
        assert_eq!(rows[1].account_staked(), TokenAmount(7));
    }

    #[test]
    fn row_key_is_proposal_id() {
        let rows = join_rows(vec![demo_proposal(7, ProposalStage::Executed, 0)], &[], &[]);
        assert_eq!(rows[0].key(), "proposal-0007");
        assert_eq!(rows[0].closes_on(), "1970-01-01");
    }

    #[test]
    fn empty_history_message_names_dao() {
        let history = DaoHistory {
            dao: DaoState {
                address: Address::from("0xdao"),
                name: "Genesis Alpha".to_string(),
                member_count: 0,
                total_reputation: TokenAmount::ZERO,
            },
            rows: Vec::new(),
        };
        assert!(history.is_empty());
        assert!(history
            .empty_message()
            .is_some_and(|m| m.starts_with("Genesis Alpha hasn't passed")));
    }
}
