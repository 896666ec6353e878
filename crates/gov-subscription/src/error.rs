//! Error types for the subscription controller
//!
//! Stream failures are not controller errors: they are surfaced verbatim in
//! the `Failed` state. These errors cover misuse of the controller itself:
//! - props that cannot be projected onto the watched keys
//! - calls after teardown or before the first mount
//! - state transitions outside the lifecycle table
//! - invalid configuration

use crate::state::StateKind;

/// Controller error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    /// Props could not be serialized into an identity key
    #[error("invalid props: {0}")]
    Props(String),

    /// Controller was torn down
    #[error("controller is unmounted")]
    Unmounted,

    /// Operation requires a prior mount
    #[error("controller was never mounted")]
    NotMounted,

    /// Transition not in the lifecycle table
    #[error("illegal state transition: {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: StateKind,
        /// Requested state
        to: StateKind,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl ControllerError {
    /// Check if the controller can no longer be used
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unmounted)
    }

    /// Check if error stems from caller input rather than controller state
    #[inline]
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Props(_) | Self::Config(_) | Self::NotMounted)
    }
}

impl From<serde_json::Error> for ControllerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Props(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_display() {
        let err = ControllerError::IllegalTransition {
            from: StateKind::Idle,
            to: StateKind::Ready,
        };
        assert_eq!(err.to_string(), "illegal state transition: idle -> ready");
        assert!(!err.is_caller_error());
    }

    #[test]
    fn classification() {
        assert!(ControllerError::Unmounted.is_terminal());
        assert!(ControllerError::Config("page size".into()).is_caller_error());
        assert!(!ControllerError::NotMounted.is_terminal());
    }
}
