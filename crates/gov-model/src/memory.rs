//! In-memory data source
//!
//! Holds a [`GovernanceStore`] in a `tokio::sync::watch` channel. Every
//! stream evaluates its query against the current store; live streams
//! re-evaluate on every store update and emit only when their result
//! changed. Open streams are counted so callers can observe that dropping a
//! stream releases it.

use crate::filter::{PluginFilter, ProposalFilter, StakeFilter, VoteFilter};
use crate::source::{DataSource, QueryKind};
use crate::types::{
    Address, DaoState, MemberState, Outcome, PluginState, ProposalState, Stake, TokenAmount, Vote,
};
use futures::stream::{self, StreamExt};
use gov_stream::{from_future, DataStream, PageRequest, StreamError, StreamOptions};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Governance records held by [`MemoryDataSource`]
#[derive(Debug, Clone, Default)]
pub struct GovernanceStore {
    /// DAOs by address
    pub daos: IndexMap<Address, DaoState>,
    /// Proposals by id
    pub proposals: IndexMap<String, ProposalState>,
    /// All votes
    pub votes: Vec<Vote>,
    /// All stakes
    pub stakes: Vec<Stake>,
    /// Members by (dao, account)
    pub members: IndexMap<(Address, Address), MemberState>,
    /// Token balances by owner
    pub balances: IndexMap<Address, TokenAmount>,
    /// Token allowances by (owner, spender)
    pub allowances: IndexMap<(Address, Address), TokenAmount>,
    /// Plugins by id
    pub plugins: IndexMap<String, PluginState>,
}

impl GovernanceStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace DAO
    pub fn insert_dao(&mut self, dao: DaoState) {
        self.daos.insert(dao.address.clone(), dao);
    }

    /// Insert or replace proposal
    pub fn insert_proposal(&mut self, proposal: ProposalState) {
        self.proposals.insert(proposal.id.clone(), proposal);
    }

    /// Insert or replace plugin
    pub fn insert_plugin(&mut self, plugin: PluginState) {
        self.plugins.insert(plugin.id.clone(), plugin);
    }

    /// Insert or replace member
    pub fn insert_member(&mut self, member: MemberState) {
        self.members
            .insert((member.dao.clone(), member.address.clone()), member);
    }

    /// Set token balance
    pub fn set_balance(&mut self, owner: Address, amount: TokenAmount) {
        self.balances.insert(owner, amount);
    }

    /// Set token allowance
    pub fn set_allowance(&mut self, owner: Address, spender: Address, amount: TokenAmount) {
        self.allowances.insert((owner, spender), amount);
    }

    /// Record a vote and update the proposal's totals
    pub fn record_vote(&mut self, vote: Vote) {
        if let Some(proposal) = self.proposals.get_mut(&vote.proposal_id) {
            match vote.outcome {
                Outcome::Pass => proposal.votes_for.0 += vote.amount.0,
                Outcome::Fail => proposal.votes_against.0 += vote.amount.0,
                Outcome::None => {}
            }
        }
        self.votes.push(vote);
    }

    /// Record a stake and update the proposal's totals
    pub fn record_stake(&mut self, stake: Stake) {
        if let Some(proposal) = self.proposals.get_mut(&stake.proposal_id) {
            match stake.outcome {
                Outcome::Pass => proposal.stakes_for.0 += stake.amount.0,
                Outcome::Fail => proposal.stakes_against.0 += stake.amount.0,
                Outcome::None => {}
            }
        }
        self.stakes.push(stake);
    }

    /// Proposals selected by `filter`, sorted, then windowed by `page`
    #[must_use]
    pub fn select_proposals(
        &self,
        filter: &ProposalFilter,
        page: Option<PageRequest>,
    ) -> Vec<ProposalState> {
        let mut selected: Vec<ProposalState> = self
            .proposals
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        filter.sort(&mut selected);

        match page {
            Some(page) => selected
                .into_iter()
                .skip(page.offset)
                .take(page.limit)
                .collect(),
            None => selected,
        }
    }
}

/// Stream bookkeeping shared by all streams of one source
#[derive(Debug, Default)]
pub struct StreamCounters {
    opened: AtomicUsize,
    open: AtomicUsize,
}

impl StreamCounters {
    /// Total streams ever created
    #[inline]
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Streams currently alive
    #[inline]
    #[must_use]
    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

/// Decrements the open-stream count when the owning stream is dropped
#[derive(Debug)]
struct OpenStreamGuard {
    counters: Arc<StreamCounters>,
}

impl OpenStreamGuard {
    fn new(counters: Arc<StreamCounters>) -> Self {
        counters.opened.fetch_add(1, Ordering::SeqCst);
        counters.open.fetch_add(1, Ordering::SeqCst);
        Self { counters }
    }
}

impl Drop for OpenStreamGuard {
    fn drop(&mut self) {
        self.counters.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Per-stream evaluation state
struct QueryState<T, Q> {
    receiver: watch::Receiver<GovernanceStore>,
    evaluate: Q,
    last: Option<T>,
    subscribe: bool,
    delay: Option<Duration>,
    finished: bool,
    _guard: OpenStreamGuard,
}

/// In-process [`DataSource`] over a mutable [`GovernanceStore`]
#[derive(Debug)]
pub struct MemoryDataSource {
    store: watch::Sender<GovernanceStore>,
    counters: Arc<StreamCounters>,
    failures: Mutex<HashMap<QueryKind, StreamError>>,
    latency: Option<Duration>,
}

impl MemoryDataSource {
    /// Create source over `store`
    #[must_use]
    pub fn new(store: GovernanceStore) -> Self {
        let (store, _) = watch::channel(store);
        Self {
            store,
            counters: Arc::new(StreamCounters::default()),
            failures: Mutex::new(HashMap::new()),
            latency: None,
        }
    }

    /// Delay every stream's first value
    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Mutate the store, waking every live stream
    pub fn update(&self, mutate: impl FnOnce(&mut GovernanceStore)) {
        self.store.send_modify(mutate);
    }

    /// Clone of the current store
    #[must_use]
    pub fn snapshot(&self) -> GovernanceStore {
        self.store.borrow().clone()
    }

    /// Make every new stream of `kind` fail with `error`
    pub fn inject_failure(&self, kind: QueryKind, error: StreamError) {
        self.failures.lock().insert(kind, error);
    }

    /// Stop failing streams of `kind`
    pub fn clear_failure(&self, kind: QueryKind) {
        self.failures.lock().remove(&kind);
    }

    /// Stream bookkeeping
    #[inline]
    #[must_use]
    pub fn counters(&self) -> &StreamCounters {
        &self.counters
    }

    /// Build a stream evaluating `evaluate` against the store
    fn query<T, Q>(&self, kind: QueryKind, options: StreamOptions, evaluate: Q) -> DataStream<T>
    where
        T: Clone + PartialEq + Send + 'static,
        Q: Fn(&GovernanceStore) -> Result<T, StreamError> + Send + 'static,
    {
        if let Some(error) = self.failures.lock().get(&kind).cloned() {
            tracing::debug!(query = %kind, %error, "injected failure");
            return from_future(async move { Err(error) });
        }

        tracing::trace!(query = %kind, subscribe = options.subscribe, "stream opened");
        let state = QueryState {
            receiver: self.store.subscribe(),
            evaluate,
            last: None,
            subscribe: options.subscribe,
            delay: self.latency,
            finished: false,
            _guard: OpenStreamGuard::new(Arc::clone(&self.counters)),
        };

        stream::unfold(state, |mut state| async move {
            if state.finished {
                return None;
            }
            if let Some(delay) = state.delay.take() {
                tokio::time::sleep(delay).await;
            }

            loop {
                let result = {
                    let store = state.receiver.borrow_and_update();
                    (state.evaluate)(&store)
                };

                match result {
                    Err(error) => {
                        state.finished = true;
                        return Some((Err(error), state));
                    }
                    Ok(value) if state.last.as_ref() != Some(&value) => {
                        state.last = Some(value.clone());
                        state.finished = !state.subscribe;
                        return Some((Ok(value), state));
                    }
                    Ok(_) => {}
                }

                if state.receiver.changed().await.is_err() {
                    return None;
                }
            }
        })
        .boxed()
    }
}

impl Default for MemoryDataSource {
    fn default() -> Self {
        Self::new(GovernanceStore::default())
    }
}

impl DataSource for MemoryDataSource {
    fn dao_state(&self, dao: &Address, options: StreamOptions) -> DataStream<DaoState> {
        let dao = dao.clone();
        self.query(QueryKind::DaoState, options, move |store| {
            store
                .daos
                .get(&dao)
                .cloned()
                .ok_or_else(|| StreamError::not_found("DAO", dao.as_str()))
        })
    }

    fn proposals(
        &self,
        filter: &ProposalFilter,
        options: StreamOptions,
    ) -> DataStream<Vec<ProposalState>> {
        let filter = filter.clone();
        let page = options.page;
        self.query(QueryKind::Proposals, options, move |store| {
            Ok(store.select_proposals(&filter, page))
        })
    }

    fn proposal_state(&self, id: &str, options: StreamOptions) -> DataStream<ProposalState> {
        let id = id.to_string();
        self.query(QueryKind::ProposalState, options, move |store| {
            store
                .proposals
                .get(&id)
                .cloned()
                .ok_or_else(|| StreamError::not_found("Proposal", id.as_str()))
        })
    }

    fn votes(&self, filter: &VoteFilter, options: StreamOptions) -> DataStream<Vec<Vote>> {
        let filter = filter.clone();
        self.query(QueryKind::Votes, options, move |store| {
            Ok(store
                .votes
                .iter()
                .filter(|v| filter.matches(v))
                .cloned()
                .collect())
        })
    }

    fn stakes(&self, filter: &StakeFilter, options: StreamOptions) -> DataStream<Vec<Stake>> {
        let filter = filter.clone();
        self.query(QueryKind::Stakes, options, move |store| {
            Ok(store
                .stakes
                .iter()
                .filter(|s| filter.matches(s))
                .cloned()
                .collect())
        })
    }

    fn member(
        &self,
        dao: &Address,
        account: &Address,
        options: StreamOptions,
    ) -> DataStream<MemberState> {
        let key = (dao.clone(), account.clone());
        self.query(QueryKind::Member, options, move |store| {
            Ok(store.members.get(&key).cloned().unwrap_or_else(|| MemberState {
                dao: key.0.clone(),
                address: key.1.clone(),
                reputation: TokenAmount::ZERO,
            }))
        })
    }

    fn token_balance(&self, owner: &Address, options: StreamOptions) -> DataStream<TokenAmount> {
        let owner = owner.clone();
        self.query(QueryKind::TokenBalance, options, move |store| {
            Ok(store.balances.get(&owner).copied().unwrap_or_default())
        })
    }

    fn allowance(
        &self,
        owner: &Address,
        spender: &Address,
        options: StreamOptions,
    ) -> DataStream<TokenAmount> {
        let key = (owner.clone(), spender.clone());
        self.query(QueryKind::Allowance, options, move |store| {
            Ok(store.allowances.get(&key).copied().unwrap_or_default())
        })
    }

    fn plugins(
        &self,
        filter: &PluginFilter,
        options: StreamOptions,
    ) -> DataStream<Vec<PluginState>> {
        let filter = filter.clone();
        self.query(QueryKind::Plugins, options, move |store| {
            Ok(store
                .plugins
                .values()
                .filter(|p| filter.matches(p))
                .cloned()
                .collect())
        })
    }

    fn plugin_state(&self, id: &str, options: StreamOptions) -> DataStream<PluginState> {
        let id = id.to_string();
        self.query(QueryKind::PluginState, options, move |store| {
            store
                .plugins
                .get(&id)
                .cloned()
                .ok_or_else(|| StreamError::not_found("Plugin", id.as_str()))
        })
    }
}
