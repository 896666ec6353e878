//! Pagination
//!
//! A paginated controller keeps an accumulated list of keyed items. The
//! first page arrives with the primary stream; every `fetch_more` opens a
//! stream for the next page and appends its items. Pages stay live: any
//! later emission of an already-fetched page updates its items in place by
//! key, so rows are never duplicated or reordered. Items with a key not yet
//! present are appended at the end.
//!
//! Fetches are serial. The cursor advances only once a page has delivered
//! its first emission; a failed fetch leaves the list, the cursor and
//! `has_more` untouched and records the error on the snapshot.

use crate::binding::{FetchMoreFn, ViewBinding};
use crate::config::ControllerConfig;
use crate::controller::{Accumulator, Shared, SubscriptionController, SubscriptionFactory};
use crate::error::ControllerError;
use crate::handle::ActiveHandle;
use crate::state::SubscriptionState;
use async_trait::async_trait;
use futures::StreamExt;
use gov_stream::{DataStream, PageRequest, StreamError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

/// Item with a stable identity
pub trait Keyed {
    /// Key type
    type Key: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static;

    /// Stable key of this item
    fn key(&self) -> Self::Key;
}

/// Factory for list-shaped data
///
/// The primary stream (from [`SubscriptionFactory::create`]) delivers the
/// first page inside `Data`; further pages come from
/// [`fetch_page`](Self::fetch_page).
#[async_trait]
pub trait PageFactory: SubscriptionFactory {
    /// List item
    type Item: Keyed + Clone + Send + Sync + 'static;

    /// Items of the first page inside a primary emission
    fn page_items(data: &Self::Data) -> &[Self::Item];

    /// Replace the list inside a primary emission
    fn with_items(data: Self::Data, items: Vec<Self::Item>) -> Self::Data;

    /// Create the stream for the page at `cursor`
    async fn fetch_page(
        &self,
        props: &Self::Props,
        cursor: PageCursor,
    ) -> Result<DataStream<Vec<Self::Item>>, StreamError>;
}

/// Offset of the last fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageCursor {
    /// Offset of the page
    pub offset: usize,
    /// Page size
    pub page_size: usize,
}

impl PageCursor {
    /// Cursor of the first page
    #[inline]
    #[must_use]
    pub fn first(page_size: usize) -> Self {
        Self {
            offset: 0,
            page_size,
        }
    }

    /// Cursor of the following page
    #[inline]
    #[must_use]
    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.page_size,
            page_size: self.page_size,
        }
    }

    /// As a data source page request
    #[inline]
    #[must_use]
    pub fn request(self) -> PageRequest {
        PageRequest::new(self.offset, self.page_size)
    }
}

/// Ordered list of items addressed by key
#[derive(Debug, Clone)]
pub struct AccumulatedList<K, T> {
    entries: IndexMap<K, T>,
}

impl<K: Eq + Hash, T: Clone> AccumulatedList<K, T> {
    /// Create empty list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Update the item with `key` in place, or append it; true if appended
    pub fn upsert(&mut self, key: K, item: T) -> bool {
        match self.entries.get_mut(&key) {
            Some(existing) => {
                *existing = item;
                false
            }
            None => {
                self.entries.insert(key, item);
                true
            }
        }
    }

    /// Item with `key`
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&T> {
        self.entries.get(key)
    }

    /// Items in order
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.entries.values().cloned().collect()
    }

    /// Number of items
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every item
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Eq + Hash, T: Clone> Default for AccumulatedList<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingPage {
    sequence: u64,
    cursor: PageCursor,
}

/// Accumulates the pages of a [`PageFactory`]
pub struct PageAccumulator<F: PageFactory> {
    page_size: usize,
    base: Option<F::Data>,
    list: AccumulatedList<<F::Item as Keyed>::Key, F::Item>,
    cursor: PageCursor,
    first_page_seen: bool,
    has_more: bool,
    pending: Option<PendingPage>,
    next_sequence: u64,
    fetch_more_error: Option<StreamError>,
}

impl<F: PageFactory> PageAccumulator<F> {
    /// Cursor of the last fetched page
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    /// Accumulated items
    #[inline]
    #[must_use]
    pub fn list(&self) -> &AccumulatedList<<F::Item as Keyed>::Key, F::Item> {
        &self.list
    }

    /// Reserve the next page; `None` while a fetch is outstanding
    fn begin_fetch(&mut self) -> Option<(u64, PageCursor)> {
        if self.pending.is_some() {
            return None;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let cursor = self.cursor.next();
        self.pending = Some(PendingPage { sequence, cursor });
        self.fetch_more_error = None;
        Some((sequence, cursor))
    }

    /// Fold a page emission into the list
    fn page(&mut self, sequence: u64, items: Vec<F::Item>) -> Option<(F::Data, bool)> {
        if let Some(pending) = self.pending.filter(|p| p.sequence == sequence) {
            self.cursor = pending.cursor;
            self.has_more = items.len() == self.page_size;
            self.pending = None;
        }
        for item in items {
            self.list.upsert(item.key(), item);
        }
        let base = self.base.clone()?;
        Some((F::with_items(base, self.list.items()), self.has_more))
    }

    /// Record a page failure; true if it was the outstanding fetch
    fn page_failed(&mut self, sequence: u64, error: StreamError) -> bool {
        if self.pending.is_some_and(|p| p.sequence == sequence) {
            self.pending = None;
            self.fetch_more_error = Some(error);
            true
        } else {
            false
        }
    }
}

impl<F: PageFactory> Accumulator<F> for PageAccumulator<F> {
    fn from_config(config: &ControllerConfig) -> Result<Self, ControllerError> {
        let page_size = config.validate_paginated()?;
        Ok(Self {
            page_size,
            base: None,
            list: AccumulatedList::new(),
            cursor: PageCursor::first(page_size),
            first_page_seen: false,
            has_more: false,
            pending: None,
            next_sequence: 0,
            fetch_more_error: None,
        })
    }

    fn reset(&mut self) {
        self.base = None;
        self.list.clear();
        self.cursor = PageCursor::first(self.page_size);
        self.first_page_seen = false;
        self.has_more = false;
        self.pending = None;
        self.fetch_more_error = None;
    }

    fn primary(&mut self, incoming: F::Data) -> (F::Data, bool) {
        let first_page = F::page_items(&incoming);
        if !self.first_page_seen {
            self.has_more = first_page.len() == self.page_size;
            self.first_page_seen = true;
        }
        for item in first_page {
            self.list.upsert(item.key(), item.clone());
        }

        let data = F::with_items(incoming.clone(), self.list.items());
        self.base = Some(incoming);
        (data, self.has_more)
    }

    fn fetching_more(&self) -> bool {
        self.pending.is_some()
    }

    fn fetch_more_error(&self) -> Option<&StreamError> {
        self.fetch_more_error.as_ref()
    }
}

impl<F: PageFactory> fmt::Debug for PageAccumulator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageAccumulator")
            .field("page_size", &self.page_size)
            .field("items", &self.list.len())
            .field("cursor", &self.cursor)
            .field("has_more", &self.has_more)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

/// Controller accumulating pages of a [`PageFactory`]
pub type PaginatedController<F> = SubscriptionController<F, PageAccumulator<F>>;

impl<F: PageFactory> Shared<F, PageAccumulator<F>> {
    pub(crate) fn fetch_more(self: &Arc<Self>) -> bool {
        let mut inner = self.inner.lock();
        let Some(generation) = inner.handle.as_ref().map(ActiveHandle::generation) else {
            return false;
        };
        if inner.torn_down || !inner.state.has_more() {
            tracing::debug!(controller = %self.id, "fetch more ignored: nothing to load");
            return false;
        }
        let Some(props) = inner.props.clone() else {
            return false;
        };
        let Some((sequence, cursor)) = inner.accumulator.begin_fetch() else {
            tracing::debug!(controller = %self.id, "fetch more ignored: page outstanding");
            return false;
        };
        self.publish(&inner);

        let task = tokio::spawn(Arc::clone(self).drive_page(generation, sequence, cursor, props));
        if let Some(handle) = inner.handle.as_mut() {
            handle.attach(task.abort_handle());
        }
        tracing::info!(controller = %self.id, generation, offset = cursor.offset, "page requested");
        true
    }

    async fn drive_page(
        self: Arc<Self>,
        generation: u64,
        sequence: u64,
        cursor: PageCursor,
        props: F::Props,
    ) {
        let mut stream = match self.factory.fetch_page(&props, cursor).await {
            Ok(stream) => stream,
            Err(error) => {
                self.page_failed(generation, sequence, error);
                return;
            }
        };

        let mut delivered = false;
        while let Some(item) = stream.next().await {
            delivered = true;
            let applied = match item {
                Ok(items) => self.apply_page(generation, sequence, items),
                Err(error) => {
                    self.page_failed(generation, sequence, error);
                    false
                }
            };
            if !applied {
                break;
            }
        }

        // An empty page stream must still release the outstanding fetch.
        if !delivered {
            self.page_failed(
                generation,
                sequence,
                StreamError::source("page stream ended without a value"),
            );
        }
    }

    fn apply_page(&self, generation: u64, sequence: u64, items: Vec<F::Item>) -> bool {
        let mut inner = self.inner.lock();
        if !inner.is_current(generation) {
            inner.stats.stale_dropped += 1;
            tracing::trace!(controller = %self.id, generation, "stale page dropped");
            return false;
        }

        let count = items.len();
        let Some((data, has_more)) = inner.accumulator.page(sequence, items) else {
            tracing::warn!(controller = %self.id, "page arrived before the first page");
            return false;
        };
        match self.transition(&mut inner, SubscriptionState::Ready { data, has_more }) {
            Ok(()) => {
                tracing::debug!(
                    controller = %self.id,
                    count,
                    total = inner.accumulator.list().len(),
                    has_more,
                    "page applied"
                );
                true
            }
            Err(error) => {
                tracing::error!(controller = %self.id, %error, "page rejected");
                false
            }
        }
    }

    fn page_failed(&self, generation: u64, sequence: u64, error: StreamError) {
        let mut inner = self.inner.lock();
        if error.is_cancelled() || !inner.is_current(generation) {
            return;
        }

        if inner.accumulator.page_failed(sequence, error.clone()) {
            tracing::warn!(controller = %self.id, %error, "fetch more failed");
            self.publish(&inner);
        } else {
            tracing::warn!(
                controller = %self.id,
                %error,
                "page stream failed; its rows keep their last values"
            );
        }
    }
}

impl<F: PageFactory> SubscriptionController<F, PageAccumulator<F>> {
    /// Request the next page; false if not ready, exhausted, or a fetch is
    /// outstanding
    pub fn fetch_more(&self) -> bool {
        self.shared.fetch_more()
    }

    /// Binding for the view, including `fetch_more`
    #[must_use]
    pub fn binding(&self) -> ViewBinding<F::Data> {
        let shared = Arc::downgrade(&self.shared);
        let fetch_more: FetchMoreFn =
            Arc::new(move || shared.upgrade().is_some_and(|shared| shared.fetch_more()));
        ViewBinding::new(self.shared.snapshots.subscribe(), Some(fetch_more))
    }

    /// Cursor of the last fetched page
    #[must_use]
    pub fn page_cursor(&self) -> PageCursor {
        self.shared.inner.lock().accumulator.cursor()
    }

    /// Number of accumulated items
    #[must_use]
    pub fn accumulated_len(&self) -> usize {
        self.shared.inner.lock().accumulator.list().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateKind;
    use futures::channel::mpsc;
    use parking_lot::Mutex;

    type Sender = mpsc::UnboundedSender<Result<Vec<Row>, StreamError>>;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        id: u32,
        value: u32,
    }

    impl Keyed for Row {
        type Key = u32;

        fn key(&self) -> u32 {
            self.id
        }
    }

    fn rows(range: std::ops::Range<u32>) -> Vec<Row> {
        range.map(|id| Row { id, value: 0 }).collect()
    }

    #[derive(Default)]
    struct Pages {
        primary: PrimarySenders,
        pages: PageSenders,
    }

    #[async_trait]
    impl SubscriptionFactory for Pages {
        type Props = ();
        type Data = Vec<Row>;

        async fn create(&self, _props: &()) -> Result<DataStream<Vec<Row>>, StreamError> {
            let (tx, rx) = mpsc::unbounded();
            self.primary.lock().push(tx);
            Ok(rx.boxed())
        }
    }

    #[async_trait]
    impl PageFactory for Pages {
        type Item = Row;

        fn page_items(data: &Vec<Row>) -> &[Row] {
            data
        }

        fn with_items(_data: Vec<Row>, items: Vec<Row>) -> Vec<Row> {
            items
        }

        async fn fetch_page(
            &self,
            _props: &(),
            cursor: PageCursor,
        ) -> Result<DataStream<Vec<Row>>, StreamError> {
            let (tx, rx) = mpsc::unbounded();
            self.pages.lock().push((cursor, tx));
            Ok(rx.boxed())
        }
    }

    async fn settle() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    type PrimarySenders = Arc<Mutex<Vec<Sender>>>;
    type PageSenders = Arc<Mutex<Vec<(PageCursor, Sender)>>>;

    fn paginated(page_size: usize) -> (PaginatedController<Pages>, PrimarySenders, PageSenders) {
        let factory = Pages::default();
        let primary = Arc::clone(&factory.primary);
        let pages = Arc::clone(&factory.pages);
        let controller =
            PaginatedController::new(factory, ControllerConfig::new().with_page_size(page_size))
                .unwrap();
        (controller, primary, pages)
    }

    #[test]
    fn cursor_steps_by_page_size() {
        let cursor = PageCursor::first(50).next().next();
        assert_eq!(cursor.offset, 100);
        assert_eq!(cursor.request(), PageRequest::new(100, 50));
    }

    #[test]
    fn upsert_keeps_position() {
        let mut list = AccumulatedList::new();
        assert!(list.upsert(1, "a"));
        assert!(list.upsert(2, "b"));
        assert!(!list.upsert(1, "A"));
        assert_eq!(list.items(), vec!["A", "b"]);
    }

    #[test]
    fn requires_page_size() {
        let result = PaginatedController::new(Pages::default(), ControllerConfig::new());
        assert!(matches!(result, Err(ControllerError::Config(_))));
    }

    #[tokio::test]
    async fn fetch_more_appends_next_page() {
        let (controller, primary, pages) = paginated(3);
        controller.mount(()).unwrap();
        assert!(!controller.fetch_more());
        settle().await;

        primary.lock()[0].unbounded_send(Ok(rows(0..3))).unwrap();
        settle().await;
        assert!(controller.state().has_more());

        assert!(controller.fetch_more());
        assert!(controller.snapshot().fetching_more);
        assert!(!controller.fetch_more());
        settle().await;

        let (cursor, tx) = pages.lock()[0].clone();
        assert_eq!(cursor.offset, 3);
        tx.unbounded_send(Ok(rows(3..5))).unwrap();
        settle().await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.data.unwrap().len(), 5);
        assert!(!snapshot.has_more_to_load);
        assert!(!snapshot.fetching_more);
        assert_eq!(controller.page_cursor().offset, 3);
        assert!(!controller.fetch_more());
    }

    #[tokio::test]
    async fn fetched_rows_update_in_place() {
        let (controller, primary, pages) = paginated(2);
        controller.mount(()).unwrap();
        settle().await;
        primary.lock()[0].unbounded_send(Ok(rows(0..2))).unwrap();
        settle().await;
        assert!(controller.fetch_more());
        settle().await;
        let tx = pages.lock()[0].1.clone();
        tx.unbounded_send(Ok(rows(2..4))).unwrap();
        settle().await;

        tx.unbounded_send(Ok(vec![Row { id: 2, value: 7 }, Row { id: 3, value: 0 }]))
            .unwrap();
        primary.lock()[0]
            .unbounded_send(Ok(vec![Row { id: 1, value: 9 }, Row { id: 0, value: 0 }]))
            .unwrap();
        settle().await;

        let data = controller.state().data().cloned().unwrap();
        let ids: Vec<_> = data.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(data[1].value, 9);
        assert_eq!(data[2].value, 7);
    }

    #[tokio::test]
    async fn page_error_keeps_data_and_cursor() {
        let (controller, primary, pages) = paginated(2);
        controller.mount(()).unwrap();
        settle().await;
        primary.lock()[0].unbounded_send(Ok(rows(0..2))).unwrap();
        settle().await;

        assert!(controller.fetch_more());
        settle().await;
        pages.lock()[0]
            .1
            .unbounded_send(Err(StreamError::source("timeout")))
            .unwrap();
        settle().await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.status, StateKind::Ready);
        assert_eq!(snapshot.data.map(|d| d.len()), Some(2));
        assert_eq!(snapshot.fetch_more_error, Some(StreamError::source("timeout")));
        assert!(snapshot.has_more_to_load);
        assert_eq!(controller.page_cursor().offset, 0);

        assert!(controller.fetch_more());
        assert!(controller.snapshot().fetch_more_error.is_none());
        settle().await;
        assert_eq!(pages.lock()[1].0.offset, 2);
    }
}
