//! Subscription state machine
//!
//! ```text
//! Idle -> Loading -> Ready <-> Ready
//!            ^  \       |
//!            |   -> Failed
//!            +------ (restart from Ready, Failed or Loading)
//! ```

use crate::error::ControllerError;
use gov_stream::StreamError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of one mounted view's subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionState<T> {
    /// Not yet mounted
    Idle,
    /// Waiting for the first combined emission
    Loading,
    /// Latest combined value
    Ready {
        /// Latest data, replaced wholesale on every emission
        data: T,
        /// More pages available
        has_more: bool,
    },
    /// Subscription failed; terminal for its handle
    Failed {
        /// Error as reported by the source
        error: StreamError,
    },
}

impl<T> Default for SubscriptionState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> SubscriptionState<T> {
    /// Discriminant of this state
    #[must_use]
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Idle => StateKind::Idle,
            Self::Loading => StateKind::Loading,
            Self::Ready { .. } => StateKind::Ready,
            Self::Failed { .. } => StateKind::Failed,
        }
    }

    /// Data if ready
    #[must_use]
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Ready { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Error if failed
    #[must_use]
    pub fn error(&self) -> Option<&StreamError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// More pages available (false unless ready)
    #[must_use]
    pub fn has_more(&self) -> bool {
        matches!(self, Self::Ready { has_more: true, .. })
    }
}

/// Discriminant of [`SubscriptionState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    /// Not yet mounted
    Idle,
    /// Waiting for data
    Loading,
    /// Data available
    Ready,
    /// Failed
    Failed,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: StateKind) -> Vec<StateKind> {
    use StateKind::{Failed, Idle, Loading, Ready};
    match from {
        Idle => vec![Loading],
        Loading => vec![Loading, Ready, Failed],
        Ready => vec![Loading, Ready, Failed],
        Failed => vec![Loading],
    }
}

/// Validate a state transition
///
/// # Errors
/// - `ControllerError::IllegalTransition` if `to` is not reachable from `from`
pub fn validate_transition(from: StateKind, to: StateKind) -> Result<(), ControllerError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ControllerError::IllegalTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_only_starts_loading() {
        assert!(validate_transition(StateKind::Idle, StateKind::Loading).is_ok());
        assert!(validate_transition(StateKind::Idle, StateKind::Ready).is_err());
        assert!(validate_transition(StateKind::Idle, StateKind::Failed).is_err());
    }

    #[test]
    fn failed_requires_restart() {
        assert!(validate_transition(StateKind::Failed, StateKind::Ready).is_err());
        assert!(validate_transition(StateKind::Failed, StateKind::Loading).is_ok());
    }

    #[test]
    fn nothing_returns_to_idle() {
        for from in [
            StateKind::Idle,
            StateKind::Loading,
            StateKind::Ready,
            StateKind::Failed,
        ] {
            assert!(!allowed_transitions(from).contains(&StateKind::Idle));
        }
    }

    #[test]
    fn accessors() {
        let ready: SubscriptionState<u32> = SubscriptionState::Ready {
            data: 3,
            has_more: true,
        };
        assert_eq!(ready.kind(), StateKind::Ready);
        assert_eq!(ready.data(), Some(&3));
        assert!(ready.has_more());

        let failed: SubscriptionState<u32> = SubscriptionState::Failed {
            error: StreamError::source("down"),
        };
        assert_eq!(failed.error(), Some(&StreamError::source("down")));
        assert!(!failed.has_more());
    }
}
