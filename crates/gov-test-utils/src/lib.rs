//! Testing utilities for the governance dashboard workspace
//!
//! Scripted factories whose streams are fed by the test, a transition spy,
//! and small fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use gov_stream::{DataStream, StreamError};
use gov_subscription::{
    Keyed, PageCursor, PageFactory, StateKind, SubscriptionFactory, TransitionEvent,
    TransitionObserver, ViewBinding, ViewSnapshot,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

type Sender<T> = mpsc::UnboundedSender<Result<T, StreamError>>;

/// Lifecycle of a scripted stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEvent {
    Created(usize),
    Dropped(usize),
}

#[derive(Debug, Default)]
struct Journal {
    events: Mutex<Vec<StreamEvent>>,
}

impl Journal {
    fn record(&self, event: StreamEvent) {
        self.events.lock().push(event);
    }

    fn count(&self, predicate: impl Fn(&StreamEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }
}

struct DropGuard {
    journal: Arc<Journal>,
    index: usize,
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.journal.record(StreamEvent::Dropped(self.index));
    }
}

/// Channel-backed stream that journals its creation and drop
fn journaled<T: Send + 'static>(journal: &Arc<Journal>, index: usize) -> (Sender<T>, DataStream<T>) {
    let (tx, rx) = mpsc::unbounded();
    journal.record(StreamEvent::Created(index));
    let guard = DropGuard {
        journal: Arc::clone(journal),
        index,
    };
    let stream = rx
        .map(move |item| {
            let _keep = &guard;
            item
        })
        .boxed();
    (tx, stream)
}

struct Session<P, T> {
    props: P,
    sender: Sender<T>,
}

struct ScriptedInner<P, T> {
    sessions: Mutex<Vec<Session<P, T>>>,
    journal: Arc<Journal>,
    fail_next_create: Mutex<Option<StreamError>>,
}

/// Factory whose streams are driven by the test
///
/// Every `create` opens a new channel; the test pushes values into the
/// stream of session `index` with [`emit`](Self::emit).
pub struct ScriptedFactory<P, T> {
    inner: Arc<ScriptedInner<P, T>>,
}

impl<P, T> Clone for ScriptedFactory<P, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: Clone, T> ScriptedFactory<P, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScriptedInner {
                sessions: Mutex::new(Vec::new()),
                journal: Arc::new(Journal::default()),
                fail_next_create: Mutex::new(None),
            }),
        }
    }

    /// Streams created so far
    #[must_use]
    pub fn created(&self) -> usize {
        self.inner
            .journal
            .count(|e| matches!(e, StreamEvent::Created(_)))
    }

    /// Streams dropped so far
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.inner
            .journal
            .count(|e| matches!(e, StreamEvent::Dropped(_)))
    }

    /// Streams alive
    #[must_use]
    pub fn live(&self) -> usize {
        self.created() - self.dropped()
    }

    /// Creation and drop events in order
    #[must_use]
    pub fn events(&self) -> Vec<StreamEvent> {
        self.inner.journal.events.lock().clone()
    }

    /// Props passed to session `index`
    #[must_use]
    pub fn props_of(&self, index: usize) -> Option<P> {
        self.inner
            .sessions
            .lock()
            .get(index)
            .map(|s| s.props.clone())
    }

    /// Emit `value` on session `index`; false if the stream is gone
    pub fn emit(&self, index: usize, value: T) -> bool {
        self.send(index, Ok(value))
    }

    /// Emit `value` on the newest session
    pub fn emit_latest(&self, value: T) -> bool {
        let latest = self.inner.sessions.lock().len().saturating_sub(1);
        self.emit(latest, value)
    }

    /// Fail session `index`
    pub fn fail(&self, index: usize, error: StreamError) -> bool {
        self.send(index, Err(error))
    }

    /// Complete session `index`
    pub fn complete(&self, index: usize) {
        if let Some(session) = self.inner.sessions.lock().get(index) {
            session.sender.close_channel();
        }
    }

    /// Make the next `create` fail
    pub fn fail_next_create(&self, error: StreamError) {
        *self.inner.fail_next_create.lock() = Some(error);
    }

    fn send(&self, index: usize, item: Result<T, StreamError>) -> bool {
        self.inner
            .sessions
            .lock()
            .get(index)
            .is_some_and(|s| s.sender.unbounded_send(item).is_ok())
    }
}

impl<P: Clone, T> Default for ScriptedFactory<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> ScriptedFactory<P, T>
where
    P: Clone,
    T: Send + 'static,
{
    fn open(&self, props: &P) -> Result<DataStream<T>, StreamError> {
        if let Some(error) = self.inner.fail_next_create.lock().take() {
            return Err(error);
        }
        let mut sessions = self.inner.sessions.lock();
        let (sender, stream) = journaled(&self.inner.journal, sessions.len());
        sessions.push(Session {
            props: props.clone(),
            sender,
        });
        Ok(stream)
    }
}

#[async_trait]
impl<P, T> SubscriptionFactory for ScriptedFactory<P, T>
where
    P: Serialize + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    type Props = P;
    type Data = T;

    async fn create(&self, props: &P) -> Result<DataStream<T>, StreamError> {
        self.open(props)
    }
}

struct PageSession<I> {
    cursor: PageCursor,
    sender: Sender<Vec<I>>,
}

/// Paginated factory whose primary and page streams are driven by the test
pub struct ScriptedPageFactory<P, I> {
    primary: ScriptedFactory<P, Vec<I>>,
    pages: Arc<Mutex<Vec<PageSession<I>>>>,
    page_journal: Arc<Journal>,
    fail_next_page: Arc<Mutex<Option<StreamError>>>,
}

impl<P, I> Clone for ScriptedPageFactory<P, I> {
    fn clone(&self) -> Self {
        Self {
            primary: self.primary.clone(),
            pages: Arc::clone(&self.pages),
            page_journal: Arc::clone(&self.page_journal),
            fail_next_page: Arc::clone(&self.fail_next_page),
        }
    }
}

impl<P: Clone, I> ScriptedPageFactory<P, I> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            primary: ScriptedFactory::new(),
            pages: Arc::new(Mutex::new(Vec::new())),
            page_journal: Arc::new(Journal::default()),
            fail_next_page: Arc::new(Mutex::new(None)),
        }
    }

    /// Primary (first page) streams
    #[must_use]
    pub fn primary(&self) -> &ScriptedFactory<P, Vec<I>> {
        &self.primary
    }

    /// Cursors of every page request in order
    #[must_use]
    pub fn page_requests(&self) -> Vec<PageCursor> {
        self.pages.lock().iter().map(|p| p.cursor).collect()
    }

    /// Page streams alive
    #[must_use]
    pub fn live_pages(&self) -> usize {
        self.page_journal
            .count(|e| matches!(e, StreamEvent::Created(_)))
            - self
                .page_journal
                .count(|e| matches!(e, StreamEvent::Dropped(_)))
    }

    /// Emit `items` on page request `index`
    pub fn emit_page(&self, index: usize, items: Vec<I>) -> bool {
        self.pages
            .lock()
            .get(index)
            .is_some_and(|p| p.sender.unbounded_send(Ok(items)).is_ok())
    }

    /// Fail page request `index`
    pub fn fail_page(&self, index: usize, error: StreamError) -> bool {
        self.pages
            .lock()
            .get(index)
            .is_some_and(|p| p.sender.unbounded_send(Err(error)).is_ok())
    }

    /// Complete page request `index`
    pub fn complete_page(&self, index: usize) {
        if let Some(page) = self.pages.lock().get(index) {
            page.sender.close_channel();
        }
    }

    /// Make the next page request fail before opening a stream
    pub fn fail_next_page(&self, error: StreamError) {
        *self.fail_next_page.lock() = Some(error);
    }
}

impl<P: Clone, I> Default for ScriptedPageFactory<P, I> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<P, I> SubscriptionFactory for ScriptedPageFactory<P, I>
where
    P: Serialize + Clone + Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
{
    type Props = P;
    type Data = Vec<I>;

    async fn create(&self, props: &P) -> Result<DataStream<Vec<I>>, StreamError> {
        self.primary.open(props)
    }
}

#[async_trait]
impl<P, I> PageFactory for ScriptedPageFactory<P, I>
where
    P: Serialize + Clone + Send + Sync + 'static,
    I: Keyed + Clone + Send + Sync + 'static,
{
    type Item = I;

    fn page_items(data: &Vec<I>) -> &[I] {
        data
    }

    fn with_items(_data: Vec<I>, items: Vec<I>) -> Vec<I> {
        items
    }

    async fn fetch_page(
        &self,
        _props: &P,
        cursor: PageCursor,
    ) -> Result<DataStream<Vec<I>>, StreamError> {
        if let Some(error) = self.fail_next_page.lock().take() {
            return Err(error);
        }
        let mut pages = self.pages.lock();
        let (sender, stream) = journaled(&self.page_journal, pages.len());
        pages.push(PageSession { cursor, sender });
        Ok(stream)
    }
}

/// Records every transition of the controllers it observes
#[derive(Clone, Default)]
pub struct TransitionSpy {
    events: Arc<Mutex<Vec<TransitionEvent>>>,
}

impl TransitionSpy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observer to install on a controller
    #[must_use]
    pub fn observer(&self) -> TransitionObserver {
        let events = Arc::clone(&self.events);
        Arc::new(move |event: &TransitionEvent| events.lock().push(*event))
    }

    #[must_use]
    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().clone()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    /// Target states in order
    #[must_use]
    pub fn targets(&self) -> Vec<StateKind> {
        self.events.lock().iter().map(|e| e.to).collect()
    }
}

/// Let spawned tasks run until they block
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}

/// Wait until the binding publishes a snapshot satisfying `predicate`
///
/// Panics after five seconds or if the controller goes away.
pub async fn wait_until<T: Clone>(
    binding: &mut ViewBinding<T>,
    predicate: impl FnMut(&ViewSnapshot<T>) -> bool,
) -> ViewSnapshot<T> {
    tokio::time::timeout(Duration::from_secs(5), binding.wait_for(predicate))
        .await
        .expect("timed out waiting for snapshot")
        .expect("controller gone")
}

/// Props of a feed-like view watching `event`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedProps {
    pub event: u32,
    pub dao: String,
    pub theme: String,
}

#[must_use]
pub fn feed_props(event: u32, theme: &str) -> FeedProps {
    FeedProps {
        event,
        dao: "0xdao".to_string(),
        theme: theme.to_string(),
    }
}

/// Keyed list row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub value: u32,
}

impl Keyed for Row {
    type Key = u32;

    fn key(&self) -> u32 {
        self.id
    }
}

/// Rows with ids in `range` and value 0
#[must_use]
pub fn rows(range: std::ops::Range<u32>) -> Vec<Row> {
    range.map(|id| Row { id, value: 0 }).collect()
}
