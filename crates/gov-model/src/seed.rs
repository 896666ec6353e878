//! Demo governance data
//!
//! A deterministic store used by the command-line driver and by tests: one
//! DAO with three members, one plugin of every kind the dashboard knows, a
//! configurable number of closed proposals plus a few open ones.

use crate::memory::GovernanceStore;
use crate::types::{
    Address, DaoState, MemberState, Outcome, PluginState, ProposalStage, ProposalState, Stake,
    TokenAmount, Vote,
};

/// Demo DAO address
pub const DEMO_DAO: &str = "0xdao";

/// Demo account (the "current account" of the dashboard)
pub const DEMO_ACCOUNT: &str = "0xalice";

/// Demo voting machine
pub const DEMO_VOTING_MACHINE: &str = "0xgenesis-protocol";

/// Proposal plugin of the demo DAO
pub const DEMO_PROPOSAL_PLUGIN: &str = "contribution-reward";

/// Rewarder plugin of the demo DAO
pub const DEMO_REWARDER_PLUGIN: &str = "competition";

/// Open proposals seeded in addition to the closed ones
const OPEN_PROPOSALS: usize = 3;

/// Current time as unix seconds
#[must_use]
pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

fn plugin(id: &str, name: &str, activation_time: i64, rewarder: Option<&str>) -> PluginState {
    PluginState {
        id: id.to_string(),
        dao: Address::from(DEMO_DAO),
        name: name.to_string(),
        address: Address::new(format!("0x{id}")),
        activation_time,
        rewarder: rewarder.map(Address::from),
    }
}

/// Proposal of the demo DAO closing at `closing_at`
#[must_use]
pub fn demo_proposal(index: usize, stage: ProposalStage, closing_at: i64) -> ProposalState {
    let (plugin_id, plugin_name) = if index % 4 == 3 {
        (DEMO_REWARDER_PLUGIN, "ContributionRewardExt")
    } else {
        (DEMO_PROPOSAL_PLUGIN, "ContributionReward")
    };

    ProposalState {
        id: format!("proposal-{index:04}"),
        dao: Address::from(DEMO_DAO),
        plugin_id: plugin_id.to_string(),
        plugin_name: plugin_name.to_string(),
        proposer: Address::new(if index % 2 == 0 { "0xbob" } else { "0xcarol" }),
        title: format!("Proposal #{index}"),
        description: format!("Funding request number {index}."),
        stage,
        created_at: closing_at - 7 * 24 * 3600,
        closing_at,
        votes_for: TokenAmount::ZERO,
        votes_against: TokenAmount::ZERO,
        stakes_for: TokenAmount::ZERO,
        stakes_against: TokenAmount::ZERO,
        winning_outcome: if stage == ProposalStage::Executed && index % 3 != 2 {
            Outcome::Pass
        } else {
            Outcome::Fail
        },
        voting_machine: Address::from(DEMO_VOTING_MACHINE),
    }
}

/// Store with `closed_proposals` history proposals closing before `now`
#[must_use]
pub fn demo_store(closed_proposals: usize, now: i64) -> GovernanceStore {
    let mut store = GovernanceStore::new();
    let dao = Address::from(DEMO_DAO);

    store.insert_dao(DaoState {
        address: dao.clone(),
        name: "Genesis Alpha".to_string(),
        member_count: 3,
        total_reputation: TokenAmount(3_000),
    });

    for (account, reputation) in [(DEMO_ACCOUNT, 1_500), ("0xbob", 1_000), ("0xcarol", 500)] {
        store.insert_member(MemberState {
            dao: dao.clone(),
            address: Address::from(account),
            reputation: TokenAmount(reputation),
        });
    }

    store.insert_plugin(plugin(DEMO_PROPOSAL_PLUGIN, "ContributionReward", 0, None));
    store.insert_plugin(plugin("scheme-factory", "SchemeFactory", 0, None));
    store.insert_plugin(plugin("reputation-from-token", "ReputationFromToken", 0, None));
    store.insert_plugin(plugin("bounties", "StandardBounties", 0, None));
    store.insert_plugin(plugin("registry", "TokenRegistry", now + 3600, None));
    store.insert_plugin(plugin(
        DEMO_REWARDER_PLUGIN,
        "ContributionRewardExt",
        0,
        Some("0xcompetition-rewarder"),
    ));

    for index in 0..closed_proposals {
        let stage = ProposalStage::HISTORY[index % ProposalStage::HISTORY.len()];
        let closing_at = now - 3600 * (i64::try_from(index).unwrap_or(i64::MAX / 7200) + 1);
        store.insert_proposal(demo_proposal(index, stage, closing_at));
    }

    for offset in 0..OPEN_PROPOSALS {
        let index = closed_proposals + offset;
        let stage = [
            ProposalStage::Boosted,
            ProposalStage::PreBoosted,
            ProposalStage::QuietEndingPeriod,
        ][offset];
        let closing_at = now + 3600 * (i64::try_from(offset).unwrap_or(0) + 1);
        store.insert_proposal(demo_proposal(index, stage, closing_at));
    }

    if closed_proposals > 0 {
        store.record_vote(Vote {
            id: "vote-0".to_string(),
            proposal_id: demo_proposal(0, ProposalStage::Executed, 0).id,
            voter: Address::from(DEMO_ACCOUNT),
            outcome: Outcome::Pass,
            amount: TokenAmount(1_500),
        });
        store.record_stake(Stake {
            id: "stake-0".to_string(),
            proposal_id: demo_proposal(0, ProposalStage::Executed, 0).id,
            staker: Address::from(DEMO_ACCOUNT),
            outcome: Outcome::Pass,
            amount: TokenAmount(100),
        });
    }

    store.set_balance(Address::from(DEMO_ACCOUNT), TokenAmount(250));
    store.set_allowance(
        Address::from(DEMO_ACCOUNT),
        Address::from(DEMO_VOTING_MACHINE),
        TokenAmount(100),
    );

    store
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ProposalFilter;

    #[test]
    fn seeds_requested_history() {
        let now = 1_700_000_000;
        let store = demo_store(62, now);
        let filter = ProposalFilter::for_dao(Address::from(DEMO_DAO))
            .with_stages(&ProposalStage::HISTORY)
            .closing_at_or_before(now);

        assert_eq!(store.select_proposals(&filter, None).len(), 62);
        assert_eq!(store.proposals.len(), 62 + OPEN_PROPOSALS);
    }

    #[test]
    fn first_proposal_carries_account_vote() {
        let store = demo_store(5, 1_700_000_000);
        let first = &store.proposals["proposal-0000"];
        assert_eq!(first.votes_for, TokenAmount(1_500));
        assert_eq!(first.stakes_for, TokenAmount(100));
    }

    #[test]
    fn empty_history() {
        let store = demo_store(0, 1_700_000_000);
        assert!(store.votes.is_empty());
        assert_eq!(store.proposals.len(), OPEN_PROPOSALS);
    }
}
