//! Combine-latest stream combinators
//!
//! Merges N independent sources into one stream of N-tuples:
//! - nothing is emitted until every source has emitted at least once
//! - afterwards every emission of any source produces exactly one combined
//!   value carrying the latest value of every other source
//! - the first error from any source is yielded once and every remaining
//!   source is dropped immediately
//! - dropping the combined stream drops all sources
//!
//! A source that completes without ever emitting keeps the combined stream
//! silent until the remaining sources complete too. Callers must make sure
//! each source emits an initial value.

use crate::error::StreamError;
use crate::stream::DataStream;
use futures::stream::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Outcome of polling one source slot
enum SlotPoll {
    /// Source produced a value (stored as latest)
    Emitted,
    /// Source pending, completed, or already released
    Idle,
    /// Source failed
    Failed(StreamError),
}

/// Poll one source, storing its value into `latest`
///
/// A completed source is released by setting the slot to `None`.
fn poll_slot<T>(
    source: &mut Option<DataStream<T>>,
    latest: &mut Option<T>,
    cx: &mut Context<'_>,
) -> SlotPoll {
    let Some(stream) = source.as_mut() else {
        return SlotPoll::Idle;
    };

    match stream.poll_next_unpin(cx) {
        Poll::Ready(Some(Ok(value))) => {
            *latest = Some(value);
            SlotPoll::Emitted
        }
        Poll::Ready(Some(Err(error))) => SlotPoll::Failed(error),
        Poll::Ready(None) => {
            *source = None;
            SlotPoll::Idle
        }
        Poll::Pending => SlotPoll::Idle,
    }
}

macro_rules! combine_latest_tuple {
    (
        $(#[$meta:meta])*
        $name:ident, $func:ident, $arity:literal;
        $($idx:tt: $ty:ident => $field:ident),+ $(,)?
    ) => {
        $(#[$meta])*
        #[must_use = "streams do nothing unless polled"]
        pub struct $name<$($ty),+> {
            $($field: Option<DataStream<$ty>>,)+
            latest: ($(Option<$ty>,)+),
            next_slot: usize,
            terminated: bool,
        }

        // Only boxed streams are polled; `latest` is never pinned.
        impl<$($ty),+> Unpin for $name<$($ty),+> {}

        impl<$($ty),+> $name<$($ty),+> {
            fn release_all(&mut self) {
                $(self.$field = None;)+
            }

            fn all_complete(&self) -> bool {
                true $(&& self.$field.is_none())+
            }
        }

        #[doc = concat!("Combine ", stringify!($arity), " sources with combine-latest semantics")]
        pub fn $func<$($ty),+>($($field: DataStream<$ty>),+) -> $name<$($ty),+> {
            $name {
                $($field: Some($field),)+
                latest: ($(None::<$ty>,)+),
                next_slot: 0,
                terminated: false,
            }
        }

        impl<$($ty: Clone),+> Stream for $name<$($ty),+> {
            type Item = Result<($($ty,)+), StreamError>;

            fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
                let this = self.get_mut();
                if this.terminated {
                    return Poll::Ready(None);
                }

                loop {
                    let mut progressed = false;

                    for offset in 0..$arity {
                        let slot = (this.next_slot + offset) % $arity;
                        let outcome = match slot {
                            $($idx => poll_slot(&mut this.$field, &mut this.latest.$idx, cx),)+
                            _ => SlotPoll::Idle,
                        };

                        match outcome {
                            SlotPoll::Emitted => {
                                progressed = true;
                                if let ($(Some($field),)+) = &this.latest {
                                    // Rotate so a chatty source cannot starve the rest
                                    this.next_slot = (slot + 1) % $arity;
                                    return Poll::Ready(Some(Ok(($($field.clone(),)+))));
                                }
                            }
                            SlotPoll::Failed(error) => {
                                this.release_all();
                                this.terminated = true;
                                return Poll::Ready(Some(Err(error)));
                            }
                            SlotPoll::Idle => {}
                        }
                    }

                    if !progressed {
                        break;
                    }
                }

                if this.all_complete() {
                    this.terminated = true;
                    return Poll::Ready(None);
                }

                Poll::Pending
            }
        }
    };
}

combine_latest_tuple!(
    /// Combine-latest over two sources
    CombineLatest2, combine_latest2, 2;
    0: A => a, 1: B => b
);

combine_latest_tuple!(
    /// Combine-latest over three sources
    CombineLatest3, combine_latest3, 3;
    0: A => a, 1: B => b, 2: C => c
);

combine_latest_tuple!(
    /// Combine-latest over four sources
    CombineLatest4, combine_latest4, 4;
    0: A => a, 1: B => b, 2: C => c, 3: D => d
);

combine_latest_tuple!(
    /// Combine-latest over five sources
    CombineLatest5, combine_latest5, 5;
    0: A => a, 1: B => b, 2: C => c, 3: D => d, 4: E => e
);

combine_latest_tuple!(
    /// Combine-latest over six sources
    CombineLatest6, combine_latest6, 6;
    0: A => a, 1: B => b, 2: C => c, 3: D => d, 4: E => e, 5: F => f
);

combine_latest_tuple!(
    /// Combine-latest over seven sources
    CombineLatest7, combine_latest7, 7;
    0: A => a, 1: B => b, 2: C => c, 3: D => d, 4: E => e, 5: F => f, 6: G => g
);

/// Combine-latest over any number of sources of the same type
#[must_use = "streams do nothing unless polled"]
pub struct CombineLatestAll<T> {
    sources: Vec<Option<DataStream<T>>>,
    latest: Vec<Option<T>>,
    next_slot: usize,
    terminated: bool,
}

impl<T> Unpin for CombineLatestAll<T> {}

/// Combine many sources of the same type into a stream of `Vec<T>`
///
/// With no sources the stream completes immediately.
pub fn combine_latest_all<T>(sources: Vec<DataStream<T>>) -> CombineLatestAll<T> {
    let latest = sources.iter().map(|_| None).collect();
    CombineLatestAll {
        sources: sources.into_iter().map(Some).collect(),
        latest,
        next_slot: 0,
        terminated: false,
    }
}

impl<T> CombineLatestAll<T> {
    /// Number of sources still attached
    #[inline]
    #[must_use]
    pub fn live_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.is_some()).count()
    }

    fn snapshot(&self) -> Option<Vec<T>>
    where
        T: Clone,
    {
        self.latest.iter().cloned().collect()
    }
}

impl<T: Clone> Stream for CombineLatestAll<T> {
    type Item = Result<Vec<T>, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.terminated {
            return Poll::Ready(None);
        }

        let arity = this.sources.len();
        loop {
            let mut progressed = false;

            for offset in 0..arity {
                let slot = (this.next_slot + offset) % arity;
                match poll_slot(&mut this.sources[slot], &mut this.latest[slot], cx) {
                    SlotPoll::Emitted => {
                        progressed = true;
                        if let Some(values) = this.snapshot() {
                            this.next_slot = (slot + 1) % arity;
                            return Poll::Ready(Some(Ok(values)));
                        }
                    }
                    SlotPoll::Failed(error) => {
                        this.sources.iter_mut().for_each(|s| *s = None);
                        this.terminated = true;
                        return Poll::Ready(Some(Err(error)));
                    }
                    SlotPoll::Idle => {}
                }
            }

            if !progressed {
                break;
            }
        }

        if this.live_sources() == 0 {
            this.terminated = true;
            return Poll::Ready(None);
        }

        Poll::Pending
    }
}
