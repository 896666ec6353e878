//! Cancellation handles
//!
//! An [`ActiveHandle`] stands for the one live subscription of a controller.
//! It carries the generation the subscription was created for and the abort
//! handles of every task driving one of its streams (the primary stream and
//! any page streams). Cancelling aborts those tasks, which drops their
//! streams and so releases the sources behind them.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::task::AbortHandle;
use ulid::Ulid;

/// Controller identifier (used in logs and transition events)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControllerId(pub Ulid);

impl ControllerId {
    /// Generate new ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ControllerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctl-{}", self.0)
    }
}

/// The live subscription of a controller
#[derive(Debug)]
pub struct ActiveHandle {
    generation: u64,
    tasks: Vec<AbortHandle>,
    cancelled: bool,
}

impl ActiveHandle {
    /// Create handle for `generation`
    #[inline]
    #[must_use]
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            tasks: Vec::new(),
            cancelled: false,
        }
    }

    /// Generation this handle was created for
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Track a task driving one of this subscription's streams
    ///
    /// Attaching to a cancelled handle aborts the task immediately.
    pub fn attach(&mut self, task: AbortHandle) {
        if self.cancelled {
            task.abort();
        } else {
            self.tasks.retain(|t| !t.is_finished());
            self.tasks.push(task);
        }
    }

    /// Number of tracked tasks still running
    #[must_use]
    pub fn running_tasks(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_finished()).count()
    }

    /// Abort every tracked task (idempotent)
    pub fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Check if cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Drop for ActiveHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
