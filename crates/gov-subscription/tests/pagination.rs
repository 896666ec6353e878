//! Pagination tests: serial fetches, page accounting, identity resets

use gov_stream::StreamError;
use gov_subscription::{ControllerConfig, PageCursor, PaginatedController, StateKind};
use gov_test_utils::{feed_props, rows, settle, FeedProps, Row, ScriptedPageFactory};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

type Factory = ScriptedPageFactory<FeedProps, Row>;

fn paginated(page_size: usize) -> (PaginatedController<Factory>, Factory) {
    let factory = Factory::new();
    let controller = PaginatedController::new(
        factory.clone(),
        ControllerConfig::new()
            .with_watched_keys(&["event"])
            .with_page_size(page_size),
    )
    .unwrap();
    (controller, factory)
}

fn ids(controller: &PaginatedController<Factory>) -> Vec<u32> {
    controller
        .state()
        .data()
        .map(|rows| rows.iter().map(|r| r.id).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn second_fetch_while_outstanding_is_noop() {
    let (controller, factory) = paginated(10);
    controller.mount(feed_props(1, "light")).unwrap();
    settle().await;
    factory.primary().emit(0, rows(0..10));
    settle().await;

    assert!(controller.fetch_more());
    assert!(!controller.fetch_more());
    settle().await;
    assert!(!controller.fetch_more());
    assert_eq!(factory.page_requests().len(), 1);

    factory.emit_page(0, rows(10..20));
    settle().await;
    assert!(controller.fetch_more());
    settle().await;
    assert_eq!(
        factory.page_requests(),
        vec![
            PageCursor {
                offset: 10,
                page_size: 10
            },
            PageCursor {
                offset: 20,
                page_size: 10
            }
        ]
    );
}

#[tokio::test]
async fn fifty_then_twelve_exhausts() {
    let (controller, factory) = paginated(50);
    let binding = controller.binding();
    controller.mount(feed_props(1, "light")).unwrap();
    settle().await;

    factory.primary().emit(0, rows(0..50));
    settle().await;
    assert!(binding.snapshot().has_more_to_load);

    assert!(binding.fetch_more());
    settle().await;
    factory.emit_page(0, rows(50..62));
    settle().await;

    let snapshot = binding.snapshot();
    assert_eq!(snapshot.data.as_ref().map(Vec::len), Some(62));
    assert!(!snapshot.has_more_to_load);
    assert!(!binding.fetch_more());
    assert_eq!(factory.page_requests().len(), 1);
}

#[tokio::test]
async fn short_first_page_has_no_more() {
    let (controller, factory) = paginated(50);
    controller.mount(feed_props(1, "light")).unwrap();
    settle().await;
    factory.primary().emit(0, rows(0..7));
    settle().await;

    assert_eq!(controller.state().kind(), StateKind::Ready);
    assert!(!controller.state().has_more());
    assert!(!controller.fetch_more());
}

#[tokio::test]
async fn identity_change_resets_list_and_cursor() {
    let (controller, factory) = paginated(5);
    controller.mount(feed_props(1, "light")).unwrap();
    settle().await;
    factory.primary().emit(0, rows(0..5));
    settle().await;
    assert!(controller.fetch_more());
    settle().await;
    factory.emit_page(0, rows(5..10));
    settle().await;
    assert_eq!(controller.accumulated_len(), 10);
    assert_eq!(controller.page_cursor().offset, 5);

    assert!(controller.on_props_updated(feed_props(2, "light")).unwrap());
    assert_eq!(controller.accumulated_len(), 0);
    assert_eq!(controller.page_cursor().offset, 0);
    settle().await;
    assert_eq!(factory.live_pages(), 0);

    // Late page emissions of the old subscription are dropped.
    let _ = factory.emit_page(0, rows(100..105));
    factory.primary().emit(1, rows(200..205));
    settle().await;
    assert_eq!(ids(&controller), (200..205).collect::<Vec<_>>());
    assert!(controller.fetch_more());
    settle().await;
    assert_eq!(factory.page_requests().last().map(|c| c.offset), Some(5));
}

#[tokio::test]
async fn live_rows_update_across_pages() {
    let (controller, factory) = paginated(3);
    controller.mount(feed_props(1, "light")).unwrap();
    settle().await;
    factory.primary().emit(0, rows(0..3));
    settle().await;
    assert!(controller.fetch_more());
    settle().await;
    factory.emit_page(0, rows(3..6));
    settle().await;

    factory.emit_page(0, vec![Row { id: 4, value: 40 }, Row { id: 3, value: 0 }]);
    factory
        .primary()
        .emit(0, vec![Row { id: 9, value: 1 }, Row { id: 0, value: 5 }]);
    settle().await;

    let data = controller.state().data().cloned().unwrap();
    assert_eq!(
        data.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![0, 1, 2, 3, 4, 5, 9]
    );
    assert_eq!(data[0].value, 5);
    assert_eq!(data[4].value, 40);
}

#[tokio::test]
async fn failed_page_request_is_scoped_to_the_attempt() {
    let (controller, factory) = paginated(2);
    controller.mount(feed_props(1, "light")).unwrap();
    settle().await;
    factory.primary().emit(0, rows(0..2));
    settle().await;

    factory.fail_next_page(StreamError::source("rate limited"));
    assert!(controller.fetch_more());
    settle().await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, StateKind::Ready);
    assert_eq!(snapshot.fetch_more_error, Some(StreamError::source("rate limited")));
    assert!(snapshot.has_more_to_load);
    assert!(!snapshot.fetching_more);
    assert_eq!(ids(&controller), vec![0, 1]);

    assert!(controller.fetch_more());
    settle().await;
    assert_eq!(factory.page_requests().last().map(|c| c.offset), Some(2));
}

#[tokio::test]
async fn empty_page_stream_releases_the_fetch() {
    let (controller, factory) = paginated(2);
    controller.mount(feed_props(1, "light")).unwrap();
    settle().await;
    factory.primary().emit(0, rows(0..2));
    settle().await;

    assert!(controller.fetch_more());
    settle().await;
    factory.complete_page(0);
    settle().await;

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, StateKind::Ready);
    assert!(!snapshot.fetching_more);
    assert_eq!(
        snapshot.fetch_more_error,
        Some(StreamError::source("page stream ended without a value"))
    );
    assert!(snapshot.has_more_to_load);
    assert_eq!(controller.page_cursor().offset, 0);
    assert_eq!(ids(&controller), vec![0, 1]);

    assert!(controller.fetch_more());
    settle().await;
    assert_eq!(factory.page_requests().len(), 2);
    assert_eq!(factory.page_requests().last().map(|c| c.offset), Some(2));
}

proptest! {
    #[test]
    fn full_pages_accumulate(page_size in 1_usize..8, full_pages in 1_usize..6, tail in 0_usize..8) {
        let tail = tail % page_size;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let (controller, factory) = paginated(page_size);
            controller.mount(feed_props(1, "light")).unwrap();
            settle().await;

            let size = u32::try_from(page_size).unwrap();
            factory.primary().emit(0, rows(0..size));
            settle().await;

            for page in 1..full_pages {
                prop_assert!(controller.state().has_more());
                prop_assert!(controller.fetch_more());
                settle().await;
                let start = u32::try_from(page).unwrap() * size;
                factory.emit_page(page - 1, rows(start..start + size));
                settle().await;
            }
            prop_assert_eq!(controller.accumulated_len(), full_pages * page_size);
            prop_assert!(controller.state().has_more());

            prop_assert!(controller.fetch_more());
            settle().await;
            let start = u32::try_from(full_pages * page_size).unwrap();
            let end = start + u32::try_from(tail).unwrap();
            factory.emit_page(full_pages - 1, rows(start..end));
            settle().await;

            prop_assert_eq!(controller.accumulated_len(), full_pages * page_size + tail);
            prop_assert!(!controller.state().has_more());
            prop_assert!(!controller.fetch_more());
            Ok::<(), TestCaseError>(())
        })?;
    }
}
