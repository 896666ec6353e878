//! Boxed data stream type and small constructors

use crate::error::StreamError;
use futures::stream::{self, BoxStream, StreamExt};
use std::future::Future;

/// Fallible asynchronous sequence of values
///
/// Dropping the stream is the unsubscribe: sources release whatever they
/// hold for it (watchers, connections) when it is dropped.
pub type DataStream<T> = BoxStream<'static, Result<T, StreamError>>;

/// Stream emitting one value then completing
#[must_use]
pub fn single<T: Send + 'static>(value: T) -> DataStream<T> {
    stream::once(async move { Ok(value) }).boxed()
}

/// Stream emitting the outcome of a future then completing
#[must_use]
pub fn from_future<T, F>(future: F) -> DataStream<T>
where
    T: Send + 'static,
    F: Future<Output = Result<T, StreamError>> + Send + 'static,
{
    stream::once(future).boxed()
}

/// Stream completing without emitting
#[must_use]
pub fn empty<T: Send + 'static>() -> DataStream<T> {
    stream::empty().boxed()
}
