//! What a view sees
//!
//! Controllers publish a [`ViewSnapshot`] after every change on a
//! `tokio::sync::watch` channel. A [`ViewBinding`] is the receiving end plus
//! the `fetch_more` action for paginated controllers.

use crate::error::ControllerError;
use crate::handle::ControllerId;
use crate::state::{StateKind, SubscriptionState};
use gov_stream::StreamError;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Render input for a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot<T> {
    /// Lifecycle status
    pub status: StateKind,
    /// Latest data when ready
    pub data: Option<T>,
    /// Error when failed
    pub error: Option<StreamError>,
    /// More pages can be fetched
    pub has_more_to_load: bool,
    /// A page fetch is outstanding
    pub fetching_more: bool,
    /// Error of the last page fetch
    pub fetch_more_error: Option<StreamError>,
}

impl<T: Clone> ViewSnapshot<T> {
    /// Build snapshot from controller state
    #[must_use]
    pub fn from_state(
        state: &SubscriptionState<T>,
        fetching_more: bool,
        fetch_more_error: Option<StreamError>,
    ) -> Self {
        Self {
            status: state.kind(),
            data: state.data().cloned(),
            error: state.error().cloned(),
            has_more_to_load: state.has_more(),
            fetching_more,
            fetch_more_error,
        }
    }
}

impl<T> ViewSnapshot<T> {
    /// Snapshot before mount
    #[must_use]
    pub fn idle() -> Self {
        Self {
            status: StateKind::Idle,
            data: None,
            error: None,
            has_more_to_load: false,
            fetching_more: false,
            fetch_more_error: None,
        }
    }

    /// Check if loading (or not yet mounted)
    #[inline]
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.status, StateKind::Idle | StateKind::Loading)
    }

    /// Check if ready
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status == StateKind::Ready
    }

    /// Check if failed
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.status == StateKind::Failed
    }
}

/// One state transition of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEvent {
    /// Controller that transitioned
    pub controller: ControllerId,
    /// Subscription generation at the time
    pub generation: u64,
    /// Previous state
    pub from: StateKind,
    /// New state
    pub to: StateKind,
}

/// Callback invoked on every transition
///
/// Runs inside the controller's critical section: it must not call back
/// into the controller.
pub type TransitionObserver = Arc<dyn Fn(&TransitionEvent) + Send + Sync>;

pub(crate) type FetchMoreFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Receiving end of a controller
#[derive(Clone)]
pub struct ViewBinding<T> {
    receiver: watch::Receiver<ViewSnapshot<T>>,
    fetch_more: Option<FetchMoreFn>,
}

impl<T: Clone> ViewBinding<T> {
    pub(crate) fn new(
        receiver: watch::Receiver<ViewSnapshot<T>>,
        fetch_more: Option<FetchMoreFn>,
    ) -> Self {
        Self {
            receiver,
            fetch_more,
        }
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> ViewSnapshot<T> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next published snapshot
    ///
    /// # Errors
    /// - `ControllerError::Unmounted` once the controller is gone
    pub async fn changed(&mut self) -> Result<ViewSnapshot<T>, ControllerError> {
        self.receiver
            .changed()
            .await
            .map_err(|_| ControllerError::Unmounted)?;
        Ok(self.receiver.borrow_and_update().clone())
    }

    /// Wait until a snapshot satisfies `predicate`
    ///
    /// # Errors
    /// - `ControllerError::Unmounted` if the controller goes away first
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&ViewSnapshot<T>) -> bool,
    ) -> Result<ViewSnapshot<T>, ControllerError> {
        self.receiver
            .wait_for(predicate)
            .await
            .map(|snapshot| (*snapshot).clone())
            .map_err(|_| ControllerError::Unmounted)
    }

    /// Request the next page; false if nothing was requested
    #[must_use]
    pub fn fetch_more(&self) -> bool {
        self.fetch_more.as_ref().map_or(false, |fetch| fetch())
    }

    /// Check if this binding can fetch more pages
    #[inline]
    #[must_use]
    pub fn is_paginated(&self) -> bool {
        self.fetch_more.is_some()
    }
}

impl<T: fmt::Debug> fmt::Debug for ViewBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewBinding")
            .field("snapshot", &*self.receiver.borrow())
            .field("paginated", &self.fetch_more.is_some())
            .finish()
    }
}
