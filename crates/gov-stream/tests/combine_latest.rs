//! Combine-latest property tests
//!
//! Feeds one source emission at a time and checks the combined output
//! against a model of "latest value per source".

use futures::channel::mpsc;
use futures::{FutureExt, StreamExt};
use gov_stream::{combine_latest3, StreamError};
use proptest::prelude::*;

type Sender = mpsc::UnboundedSender<Result<u32, StreamError>>;

fn source() -> (Sender, gov_stream::DataStream<u32>) {
    let (tx, rx) = mpsc::unbounded();
    (tx, rx.boxed())
}

proptest! {
    #[test]
    fn combined_tracks_latest_per_source(events in prop::collection::vec((0usize..3, 0u32..1000), 1..64)) {
        let (tx_a, a) = source();
        let (tx_b, b) = source();
        let (tx_c, c) = source();
        let senders = [tx_a, tx_b, tx_c];
        let mut combined = combine_latest3(a, b, c);
        let mut model: [Option<u32>; 3] = [None; 3];

        for (slot, value) in events {
            senders[slot].unbounded_send(Ok(value)).unwrap();
            model[slot] = Some(value);

            let polled = combined.next().now_or_never();
            match model {
                [Some(x), Some(y), Some(z)] => {
                    prop_assert_eq!(polled, Some(Some(Ok((x, y, z)))));
                }
                _ => prop_assert!(polled.is_none()),
            }
        }
    }
}

#[test]
fn first_emission_waits_for_slowest_source() {
    let (tx_a, a) = source();
    let (tx_b, b) = source();
    let (tx_c, c) = source();
    let mut combined = combine_latest3(a, b, c);

    tx_a.unbounded_send(Ok(1)).unwrap();
    assert!(combined.next().now_or_never().is_none());
    tx_b.unbounded_send(Ok(2)).unwrap();
    assert!(combined.next().now_or_never().is_none());
    tx_c.unbounded_send(Ok(3)).unwrap();
    assert_eq!(combined.next().now_or_never(), Some(Some(Ok((1, 2, 3)))));
}
