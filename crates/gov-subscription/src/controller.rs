//! Subscription controller
//!
//! Owns the lifecycle of one view's subscription:
//! - mount: obtain a stream from the factory and observe it
//! - props update: restart only when the identity key changed
//! - unmount: cancel, after which nothing is applied
//!
//! Every stream is driven by a tokio task tagged with the generation it was
//! created for. Applying an emission re-checks that generation inside the
//! controller's critical section, so a value racing a cancellation is
//! dropped instead of applied.

use crate::binding::{TransitionEvent, TransitionObserver, ViewBinding, ViewSnapshot};
use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::handle::{ActiveHandle, ControllerId};
use crate::identity::IdentityKey;
use crate::state::{validate_transition, SubscriptionState};
use async_trait::async_trait;
use futures::StreamExt;
use gov_stream::{DataStream, StreamError};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Creates the combined stream for a view's props
#[async_trait]
pub trait SubscriptionFactory: Send + Sync + 'static {
    /// View input properties
    type Props: Serialize + Clone + Send + Sync + 'static;
    /// Combined value delivered to the view
    type Data: Clone + Send + Sync + 'static;

    /// Create the stream for `props`
    ///
    /// May resolve prerequisites first; an error here fails the
    /// subscription like a stream error would.
    async fn create(&self, props: &Self::Props) -> Result<DataStream<Self::Data>, StreamError>;
}

/// How emissions of the primary stream become view data
pub trait Accumulator<F: SubscriptionFactory>: Send + Sized + 'static {
    /// Build from configuration
    ///
    /// # Errors
    /// - `ControllerError::Config` if the configuration does not fit
    fn from_config(config: &ControllerConfig) -> Result<Self, ControllerError>;

    /// Forget everything accumulated (full re-subscription)
    fn reset(&mut self);

    /// Fold a primary emission; returns the data to publish and `has_more`
    fn primary(&mut self, incoming: F::Data) -> (F::Data, bool);

    /// A page fetch is outstanding
    fn fetching_more(&self) -> bool {
        false
    }

    /// Error of the last page fetch
    fn fetch_more_error(&self) -> Option<&StreamError> {
        None
    }
}

/// Publish every emission as is
#[derive(Debug, Clone, Copy, Default)]
pub struct Replace;

impl<F: SubscriptionFactory> Accumulator<F> for Replace {
    fn from_config(_config: &ControllerConfig) -> Result<Self, ControllerError> {
        Ok(Self)
    }

    fn reset(&mut self) {}

    fn primary(&mut self, incoming: F::Data) -> (F::Data, bool) {
        (incoming, false)
    }
}

/// Controller statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Subscriptions started (mounts, restarts, retries)
    pub subscriptions_created: usize,
    /// Live subscriptions cancelled (restarts, unmount)
    pub cancellations: usize,
    /// State transitions
    pub transitions: usize,
    /// Emissions dropped because their subscription was no longer current
    pub stale_dropped: usize,
}

pub(crate) struct Inner<F: SubscriptionFactory, A> {
    pub(crate) state: SubscriptionState<F::Data>,
    pub(crate) props: Option<F::Props>,
    pub(crate) identity: Option<IdentityKey>,
    pub(crate) handle: Option<ActiveHandle>,
    pub(crate) generation: u64,
    pub(crate) torn_down: bool,
    pub(crate) accumulator: A,
    pub(crate) stats: ControllerStats,
    pub(crate) observer: Option<TransitionObserver>,
}

impl<F: SubscriptionFactory, A> Inner<F, A> {
    fn new(accumulator: A) -> Self {
        Self {
            state: SubscriptionState::Idle,
            props: None,
            identity: None,
            handle: None,
            generation: 0,
            torn_down: false,
            accumulator,
            stats: ControllerStats::default(),
            observer: None,
        }
    }

    /// Check if `generation` is the live subscription
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        !self.torn_down
            && self
                .handle
                .as_ref()
                .is_some_and(|handle| handle.generation() == generation)
    }
}

pub(crate) struct Shared<F: SubscriptionFactory, A> {
    pub(crate) id: ControllerId,
    pub(crate) factory: F,
    pub(crate) config: ControllerConfig,
    pub(crate) inner: Mutex<Inner<F, A>>,
    pub(crate) snapshots: watch::Sender<ViewSnapshot<F::Data>>,
}

impl<F, A> Shared<F, A>
where
    F: SubscriptionFactory,
    A: Accumulator<F>,
{
    /// Move to `next`, notify the observer and publish a snapshot
    pub(crate) fn transition(
        &self,
        inner: &mut Inner<F, A>,
        next: SubscriptionState<F::Data>,
    ) -> Result<(), ControllerError> {
        let from = inner.state.kind();
        let to = next.kind();
        validate_transition(from, to)?;

        inner.state = next;
        inner.stats.transitions += 1;
        if let Some(observer) = &inner.observer {
            observer(&TransitionEvent {
                controller: self.id,
                generation: inner.generation,
                from,
                to,
            });
        }
        tracing::trace!(controller = %self.id, %from, %to, "transition");
        self.publish(inner);
        Ok(())
    }

    pub(crate) fn publish(&self, inner: &Inner<F, A>) {
        self.snapshots.send_replace(ViewSnapshot::from_state(
            &inner.state,
            inner.accumulator.fetching_more(),
            inner.accumulator.fetch_more_error().cloned(),
        ));
    }

    fn cancel_active(&self, inner: &mut Inner<F, A>) {
        if let Some(mut handle) = inner.handle.take() {
            handle.cancel();
            inner.stats.cancellations += 1;
            tracing::debug!(
                controller = %self.id,
                generation = handle.generation(),
                "subscription cancelled"
            );
        }
    }

    /// Cancel the live subscription and start a new one for `props`
    fn start(
        self: &Arc<Self>,
        inner: &mut Inner<F, A>,
        props: F::Props,
        identity: IdentityKey,
    ) -> Result<(), ControllerError> {
        self.cancel_active(inner);
        inner.accumulator.reset();

        inner.generation += 1;
        let generation = inner.generation;
        inner.handle = Some(ActiveHandle::new(generation));
        inner.props = Some(props.clone());
        inner.identity = Some(identity);
        inner.stats.subscriptions_created += 1;
        self.transition(inner, SubscriptionState::Loading)?;

        let task = tokio::spawn(Arc::clone(self).drive(generation, props));
        if let Some(handle) = inner.handle.as_mut() {
            handle.attach(task.abort_handle());
        }
        tracing::info!(controller = %self.id, generation, "subscription started");
        Ok(())
    }

    async fn drive(self: Arc<Self>, generation: u64, props: F::Props) {
        let mut stream = match self.factory.create(&props).await {
            Ok(stream) => stream,
            Err(error) => {
                self.fail(generation, error);
                return;
            }
        };

        while let Some(item) = stream.next().await {
            let applied = match item {
                Ok(value) => self.apply(generation, value),
                Err(error) => {
                    self.fail(generation, error);
                    false
                }
            };
            if !applied {
                break;
            }
        }
        tracing::trace!(controller = %self.id, generation, "primary stream finished");
    }

    fn apply(&self, generation: u64, value: F::Data) -> bool {
        let mut inner = self.inner.lock();
        if !inner.is_current(generation) {
            inner.stats.stale_dropped += 1;
            tracing::trace!(controller = %self.id, generation, "stale emission dropped");
            return false;
        }

        let (data, has_more) = inner.accumulator.primary(value);
        match self.transition(&mut inner, SubscriptionState::Ready { data, has_more }) {
            Ok(()) => {
                tracing::debug!(controller = %self.id, generation, has_more, "emission applied");
                true
            }
            Err(error) => {
                tracing::error!(controller = %self.id, %error, "emission rejected");
                false
            }
        }
    }

    fn fail(&self, generation: u64, error: StreamError) {
        let mut inner = self.inner.lock();
        if error.is_cancelled() || !inner.is_current(generation) {
            return;
        }

        tracing::warn!(controller = %self.id, generation, %error, "subscription failed");
        if let Some(mut handle) = inner.handle.take() {
            handle.cancel();
        }
        if let Err(err) = self.transition(&mut inner, SubscriptionState::Failed { error }) {
            tracing::error!(controller = %self.id, error = %err, "failure not recorded");
        }
    }

    pub(crate) fn unmount(&self) {
        let mut inner = self.inner.lock();
        if inner.torn_down {
            return;
        }
        inner.torn_down = true;
        self.cancel_active(&mut inner);
        tracing::info!(controller = %self.id, "unmounted");
    }
}

/// Binds one view instance to its data stream
///
/// Operations are synchronous and must be called within a tokio runtime;
/// stream work happens on spawned tasks. Dropping the controller unmounts
/// it.
pub struct SubscriptionController<F: SubscriptionFactory, A: Accumulator<F> = Replace> {
    pub(crate) shared: Arc<Shared<F, A>>,
}

impl<F, A> SubscriptionController<F, A>
where
    F: SubscriptionFactory,
    A: Accumulator<F>,
{
    /// Create an unmounted controller
    ///
    /// # Errors
    /// - `ControllerError::Config` if `config` is invalid for this controller
    pub fn new(factory: F, config: ControllerConfig) -> Result<Self, ControllerError> {
        config.validate()?;
        let accumulator = A::from_config(&config)?;
        let (snapshots, _) = watch::channel(ViewSnapshot::idle());

        Ok(Self {
            shared: Arc::new(Shared {
                id: ControllerId::new(),
                factory,
                config,
                inner: Mutex::new(Inner::new(accumulator)),
                snapshots,
            }),
        })
    }

    /// Controller ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> ControllerId {
        self.shared.id
    }

    /// Factory creating this controller's streams
    #[inline]
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.shared.factory
    }

    /// Observe every state transition
    pub fn set_observer(&self, observer: TransitionObserver) {
        self.shared.inner.lock().observer = Some(observer);
    }

    /// Subscribe for `props`
    ///
    /// Mounting a mounted controller restarts its subscription.
    ///
    /// # Errors
    /// - `ControllerError::Unmounted` after [`unmount`](Self::unmount)
    /// - `ControllerError::Props` if the props cannot be projected
    pub fn mount(&self, props: F::Props) -> Result<(), ControllerError> {
        let identity = IdentityKey::project(&props, &self.shared.config.watched_keys)?;
        let mut inner = self.shared.inner.lock();
        if inner.torn_down {
            return Err(ControllerError::Unmounted);
        }

        tracing::info!(controller = %self.shared.id, "mount");
        self.shared.start(&mut inner, props, identity)
    }

    /// Handle new props; returns true if the subscription was restarted
    ///
    /// Props whose watched keys are unchanged are kept as the latest props
    /// without touching the subscription.
    ///
    /// # Errors
    /// - `ControllerError::Unmounted` after [`unmount`](Self::unmount)
    /// - `ControllerError::NotMounted` before the first mount
    /// - `ControllerError::Props` if the props cannot be projected
    pub fn on_props_updated(&self, props: F::Props) -> Result<bool, ControllerError> {
        let identity = IdentityKey::project(&props, &self.shared.config.watched_keys)?;
        let mut inner = self.shared.inner.lock();
        if inner.torn_down {
            return Err(ControllerError::Unmounted);
        }
        if inner.props.is_none() {
            return Err(ControllerError::NotMounted);
        }

        if inner.identity.as_ref() == Some(&identity) {
            inner.props = Some(props);
            tracing::trace!(controller = %self.shared.id, "identity unchanged");
            return Ok(false);
        }

        tracing::info!(controller = %self.shared.id, "identity changed, restarting");
        self.shared.start(&mut inner, props, identity)?;
        Ok(true)
    }

    /// Re-run the mount sequence with the latest props
    ///
    /// # Errors
    /// - `ControllerError::Unmounted` after [`unmount`](Self::unmount)
    /// - `ControllerError::NotMounted` before the first mount
    pub fn retry(&self) -> Result<(), ControllerError> {
        let mut inner = self.shared.inner.lock();
        if inner.torn_down {
            return Err(ControllerError::Unmounted);
        }
        let Some(props) = inner.props.clone() else {
            return Err(ControllerError::NotMounted);
        };
        let identity = inner.identity.clone().unwrap_or_default();

        tracing::info!(controller = %self.shared.id, "retry");
        self.shared.start(&mut inner, props, identity)
    }

    /// Tear down; idempotent
    pub fn unmount(&self) {
        self.shared.unmount();
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SubscriptionState<F::Data> {
        self.shared.inner.lock().state.clone()
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> ViewSnapshot<F::Data> {
        self.shared.snapshots.borrow().clone()
    }

    /// Latest props
    #[must_use]
    pub fn props(&self) -> Option<F::Props> {
        self.shared.inner.lock().props.clone()
    }

    /// Check if mounted and not torn down
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        let inner = self.shared.inner.lock();
        inner.props.is_some() && !inner.torn_down
    }

    /// Generation of the latest subscription (0 before mount)
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.shared.inner.lock().generation
    }

    /// Statistics
    #[must_use]
    pub fn stats(&self) -> ControllerStats {
        self.shared.inner.lock().stats
    }
}

impl<F: SubscriptionFactory> SubscriptionController<F, Replace> {
    /// Binding for the view
    #[must_use]
    pub fn binding(&self) -> ViewBinding<F::Data> {
        ViewBinding::new(self.shared.snapshots.subscribe(), None)
    }
}

impl<F, A> Drop for SubscriptionController<F, A>
where
    F: SubscriptionFactory,
    A: Accumulator<F>,
{
    fn drop(&mut self) {
        self.shared.unmount();
    }
}

impl<F, A> fmt::Debug for SubscriptionController<F, A>
where
    F: SubscriptionFactory,
    A: Accumulator<F>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("SubscriptionController")
            .field("id", &self.shared.id)
            .field("state", &inner.state.kind())
            .field("generation", &inner.generation)
            .field("torn_down", &inner.torn_down)
            .finish_non_exhaustive()
    }
}
