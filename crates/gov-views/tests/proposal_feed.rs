//! Proposal feed card over the in-memory source

use gov_model::seed::{DEMO_ACCOUNT, DEMO_DAO};
use gov_model::{demo_store, Address, MemoryDataSource, Outcome, QueryKind, TokenAmount};
use gov_stream::StreamError;
use gov_test_utils::{settle, wait_until};
use gov_views::{
    fixed_clock, FeedEvent, FeedItemProps, FeedItemView, ProposalFeedFactory, ProposalRef,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const NOW: i64 = 1_700_000_000;

fn event(source: &MemoryDataSource, proposal: &str) -> FeedEvent {
    let store = source.snapshot();
    FeedEvent {
        id: format!("event-{proposal}"),
        dao: Address::from(DEMO_DAO),
        proposal: ProposalRef::from(&store.proposals[proposal]),
    }
}

fn card() -> (Arc<MemoryDataSource>, ProposalFeedFactory) {
    let source = Arc::new(MemoryDataSource::new(demo_store(5, NOW)));
    let factory = ProposalFeedFactory::new(source.clone()).with_clock(fixed_clock(NOW));
    (source, factory)
}

#[tokio::test]
async fn card_combines_seven_sources() {
    let (source, factory) = card();
    let now = factory.now();
    let controller = factory.controller().unwrap();
    let mut view = controller.binding();
    let props = FeedItemProps::new(
        Address::from(DEMO_ACCOUNT),
        event(&source, "proposal-0000"),
    );
    controller.mount(props.clone()).unwrap();

    let ready = wait_until(&mut view, |s| s.is_ready()).await;
    let data = ready.data.unwrap();
    assert_eq!(data.votes.len(), 1);
    assert_eq!(data.stakes.len(), 1);
    assert_eq!(data.member.reputation, TokenAmount(1_500));
    assert_eq!(data.balance, TokenAmount(250));
    assert_eq!(data.allowance, TokenAmount(100));

    let card = FeedItemView::build(&props, &data, now);
    assert_eq!(card.dao_name, "Genesis Alpha");
    assert_eq!(card.actions.current_vote, Some(Outcome::Pass));
    assert!(card.actions.expired);
    assert!(!card.show_full_details);
}

#[tokio::test]
async fn open_proposal_is_not_expired() {
    let (source, factory) = card();
    let now = factory.now();
    let controller = factory.controller().unwrap();
    let mut view = controller.binding();
    // Indices 5..8 are the open proposals.
    let props = FeedItemProps::new(Address::from("0xbob"), event(&source, "proposal-0005"));
    controller.mount(props.clone()).unwrap();

    let data = wait_until(&mut view, |s| s.is_ready()).await.data.unwrap();
    let card = FeedItemView::build(&props, &data, now);
    assert!(!card.actions.expired);
    assert!(card.actions.can_vote());
    assert_eq!(card.actions.current_vote, None);
}

#[tokio::test]
async fn only_a_new_event_restarts_the_card() {
    let (source, factory) = card();
    let controller = factory.controller().unwrap();
    let mut view = controller.binding();
    let props = FeedItemProps::new(
        Address::from(DEMO_ACCOUNT),
        event(&source, "proposal-0000"),
    );
    controller.mount(props.clone()).unwrap();
    wait_until(&mut view, |s| s.is_ready()).await;

    let expanded = FeedItemProps {
        expanded: true,
        ..props.clone()
    };
    assert!(!controller.on_props_updated(expanded).unwrap());
    assert_eq!(controller.stats().subscriptions_created, 1);

    let next = FeedItemProps {
        event: event(&source, "proposal-0001"),
        ..props
    };
    assert!(controller.on_props_updated(next).unwrap());
    let ready = wait_until(&mut view, |s| {
        s.data
            .as_ref()
            .is_some_and(|d| d.proposal.id == "proposal-0001")
    })
    .await;
    assert!(ready.data.unwrap().votes.is_empty());
    assert_eq!(controller.stats().subscriptions_created, 2);
    assert_eq!(controller.stats().cancellations, 1);
}

#[tokio::test]
async fn missing_proposal_fails_card() {
    let (source, factory) = card();
    let controller = factory.controller().unwrap();
    let mut view = controller.binding();
    let mut event = event(&source, "proposal-0000");
    event.proposal.id = "proposal-9999".to_string();
    controller
        .mount(FeedItemProps::new(Address::from(DEMO_ACCOUNT), event))
        .unwrap();

    let failed = wait_until(&mut view, |s| s.is_failed()).await;
    assert_eq!(
        failed.error.unwrap().to_string(),
        "Proposal not found. ID: proposal-9999"
    );
    settle().await;
    assert_eq!(source.counters().open(), 0);
}

#[tokio::test]
async fn chain_read_failure_surfaces_verbatim() {
    let (source, factory) = card();
    source.inject_failure(QueryKind::TokenBalance, StreamError::source("rpc timeout"));
    let controller = factory.controller().unwrap();
    let mut view = controller.binding();
    controller
        .mount(FeedItemProps::new(
            Address::from(DEMO_ACCOUNT),
            event(&source, "proposal-0000"),
        ))
        .unwrap();

    let failed = wait_until(&mut view, |s| s.is_failed()).await;
    assert_eq!(failed.error, Some(StreamError::source("rpc timeout")));

    source.clear_failure(QueryKind::TokenBalance);
    controller.retry().unwrap();
    wait_until(&mut view, |s| s.is_ready()).await;
}
