//! DAO history page over the in-memory source

use gov_model::seed::{DEMO_ACCOUNT, DEMO_DAO};
use gov_model::{demo_store, Address, MemoryDataSource, Outcome, TokenAmount, Vote};
use gov_test_utils::{settle, wait_until};
use gov_views::{fixed_clock, DaoHistoryFactory, DaoHistoryProps};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const NOW: i64 = 1_700_000_000;

fn history(closed: usize) -> (Arc<MemoryDataSource>, gov_views::DaoHistoryController) {
    let source = Arc::new(MemoryDataSource::new(demo_store(closed, NOW)));
    let controller = DaoHistoryFactory::new(source.clone())
        .with_clock(fixed_clock(NOW))
        .controller()
        .unwrap();
    (source, controller)
}

fn alice() -> DaoHistoryProps {
    DaoHistoryProps::new(DEMO_DAO, Some(Address::from(DEMO_ACCOUNT)))
}

#[tokio::test]
async fn pages_until_exhausted() {
    let (_source, controller) = history(62);
    let mut view = controller.binding();
    controller.mount(alice()).unwrap();

    let first = wait_until(&mut view, |s| s.is_ready()).await;
    let page = first.data.unwrap();
    assert_eq!(page.dao.name, "Genesis Alpha");
    assert_eq!(page.rows.len(), 50);
    assert!(first.has_more_to_load);
    assert_eq!(page.rows[0].proposal.id, "proposal-0000");
    assert!(page.rows[0].has_account_actions());
    assert!(page.rows.windows(2).all(|w| {
        w[0].proposal.closing_at >= w[1].proposal.closing_at
    }));

    assert!(view.fetch_more());
    let done = wait_until(&mut view, |s| {
        s.data.as_ref().is_some_and(|d| d.rows.len() == 62)
    })
    .await;
    assert!(!done.has_more_to_load);
    assert!(!done.fetching_more);
    assert!(!view.fetch_more());
    assert_eq!(controller.page_cursor().offset, 50);
}

#[tokio::test]
async fn vote_after_load_updates_row_in_place() {
    let (source, controller) = history(62);
    let mut view = controller.binding();
    controller.mount(alice()).unwrap();
    wait_until(&mut view, |s| s.is_ready()).await;
    assert!(view.fetch_more());
    wait_until(&mut view, |s| !s.has_more_to_load && !s.fetching_more).await;

    // Row 55 came from the second page.
    source.update(|store| {
        store.record_vote(Vote {
            id: "vote-55".to_string(),
            proposal_id: "proposal-0055".to_string(),
            voter: Address::from(DEMO_ACCOUNT),
            outcome: Outcome::Fail,
            amount: TokenAmount(1_500),
        });
    });

    let updated = wait_until(&mut view, |s| {
        s.data
            .as_ref()
            .is_some_and(|d| d.rows[55].account_vote.is_some())
    })
    .await;
    let rows = updated.data.unwrap().rows;
    assert_eq!(rows.len(), 62);
    assert_eq!(rows[55].proposal.id, "proposal-0055");
    assert_eq!(rows[55].proposal.votes_against, TokenAmount(1_500));
    assert_eq!(controller.stats().subscriptions_created, 1);
}

#[tokio::test]
async fn anonymous_visitor_sees_rows_without_actions() {
    let (_source, controller) = history(3);
    let mut view = controller.binding();
    controller.mount(DaoHistoryProps::new(DEMO_DAO, None)).unwrap();

    let ready = wait_until(&mut view, |s| s.is_ready()).await;
    let rows = ready.data.unwrap().rows;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| !r.has_account_actions()));
    assert!(!ready.has_more_to_load);
}

#[tokio::test]
async fn empty_history_shows_placeholder() {
    let (_source, controller) = history(0);
    let mut view = controller.binding();
    controller.mount(alice()).unwrap();

    let ready = wait_until(&mut view, |s| s.is_ready()).await;
    let history = ready.data.unwrap();
    assert!(history.is_empty());
    assert!(history.empty_message().is_some());
    assert!(!ready.has_more_to_load);
}

#[tokio::test]
async fn unknown_dao_fails_page() {
    let (_source, controller) = history(5);
    let mut view = controller.binding();
    controller
        .mount(DaoHistoryProps::new("0xnowhere", None))
        .unwrap();

    let failed = wait_until(&mut view, |s| s.is_failed()).await;
    assert_eq!(
        failed.error.unwrap().to_string(),
        "DAO not found. ID: 0xnowhere"
    );
}

#[tokio::test]
async fn unmount_releases_every_stream() {
    let (source, controller) = history(62);
    let mut view = controller.binding();
    controller.mount(alice()).unwrap();
    wait_until(&mut view, |s| s.is_ready()).await;
    assert!(view.fetch_more());
    wait_until(&mut view, |s| !s.fetching_more).await;
    assert!(source.counters().open() > 0);

    controller.unmount();
    settle().await;
    assert_eq!(source.counters().open(), 0);
}
