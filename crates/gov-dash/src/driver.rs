//! Scripted sessions over a seeded in-memory source

use crate::config::DashboardConfig;
use anyhow::{bail, Context, Result};
use gov_model::seed::DEMO_DAO;
use gov_model::{demo_store, now_unix, Address, MemoryDataSource, Outcome, TokenAmount, Vote};
use gov_subscription::{ControllerStats, ViewBinding, ViewSnapshot};
use gov_views::{
    fixed_clock, DaoHistoryFactory, DaoHistoryProps, PluginContainerFactory, PluginPageProps,
    PluginView,
};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

/// Longest wait for a view to settle
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

async fn settle<T: Clone>(
    binding: &mut ViewBinding<T>,
    predicate: impl FnMut(&ViewSnapshot<T>) -> bool,
) -> Result<ViewSnapshot<T>> {
    let snapshot = tokio::time::timeout(STEP_TIMEOUT, binding.wait_for(predicate))
        .await
        .context("view did not settle")?
        .context("view was torn down")?;
    if let Some(error) = snapshot.error.clone() {
        bail!(error);
    }
    Ok(snapshot)
}

fn seeded(config: &DashboardConfig, now: i64) -> Arc<MemoryDataSource> {
    Arc::new(MemoryDataSource::new(demo_store(config.proposals, now)))
}

/// Outcome of a history session
#[derive(Debug, Clone)]
pub struct SimulationReport {
    /// DAO name
    pub dao: String,
    /// Rows after each page
    pub pages: Vec<usize>,
    /// Proposal that received the live vote
    pub voted_on: Option<String>,
    /// Vote reached its row without a re-subscription
    pub live_update_applied: bool,
    /// Controller counters
    pub stats: ControllerStats,
    /// Streams still open after unmount
    pub open_after_unmount: usize,
}

impl SimulationReport {
    /// Total rows loaded
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.pages.last().copied().unwrap_or_default()
    }

    /// Check if the session ended cleanly
    #[must_use]
    pub fn passed(&self) -> bool {
        self.open_after_unmount == 0
            && self.stats.subscriptions_created == 1
            && (self.voted_on.is_none() || self.live_update_applied)
    }

    /// Text report
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "DAO History: {}", self.dao);
        for (index, rows) in self.pages.iter().enumerate() {
            let _ = writeln!(out, "  Page {}: {} rows", index + 1, rows);
        }
        let _ = writeln!(out, "  Total rows: {}", self.total_rows());
        match &self.voted_on {
            Some(id) => {
                let _ = writeln!(
                    out,
                    "  Live vote on {id}: {}",
                    if self.live_update_applied { "applied" } else { "missing" }
                );
            }
            None => {
                let _ = writeln!(out, "  Live vote: skipped (no rows)");
            }
        }
        let _ = writeln!(out, "  Subscriptions: {}", self.stats.subscriptions_created);
        let _ = writeln!(out, "  Transitions: {}", self.stats.transitions);
        let _ = writeln!(out, "  Stale emissions dropped: {}", self.stats.stale_dropped);
        let _ = writeln!(out, "  Open streams after unmount: {}", self.open_after_unmount);
        let _ = write!(out, "  Status: {}", if self.passed() { "PASSED" } else { "FAILED" });
        out
    }
}

/// Mount the history page, load every page, then vote on the last row
///
/// # Errors
/// - the page fails or does not settle in time
pub async fn simulate(config: &DashboardConfig) -> Result<SimulationReport> {
    config.validate()?;
    let now = now_unix();
    let source = seeded(config, now);
    let account = Address::new(config.account.clone());

    let controller = DaoHistoryFactory::new(source.clone())
        .with_clock(fixed_clock(now))
        .with_page_size(config.page_size)
        .controller()?;
    let mut view = controller.binding();
    controller.mount(DaoHistoryProps::new(DEMO_DAO, Some(account.clone())))?;

    let mut snapshot = settle(&mut view, |s| s.is_ready() || s.is_failed()).await?;
    let dao = snapshot
        .data
        .as_ref()
        .map(|d| d.dao.name.clone())
        .unwrap_or_default();
    let mut pages = vec![snapshot.data.as_ref().map_or(0, |d| d.rows.len())];
    tracing::info!(rows = pages[0], has_more = snapshot.has_more_to_load, "first page");

    while snapshot.has_more_to_load {
        if !view.fetch_more() {
            break;
        }
        snapshot = settle(&mut view, |s| !s.fetching_more).await?;
        if let Some(error) = snapshot.fetch_more_error.take() {
            bail!("fetch more failed: {error}");
        }
        let rows = snapshot.data.as_ref().map_or(0, |d| d.rows.len());
        tracing::info!(rows, has_more = snapshot.has_more_to_load, "page loaded");
        pages.push(rows);
    }

    let target = snapshot
        .data
        .as_ref()
        .and_then(|d| d.rows.last())
        .map(|row| row.proposal.id.clone());
    let mut live_update_applied = false;
    if let Some(id) = target.clone() {
        source.update(|store| {
            store.record_vote(Vote {
                id: format!("vote-{id}-live"),
                proposal_id: id.clone(),
                voter: account.clone(),
                outcome: Outcome::Pass,
                amount: TokenAmount(1),
            });
        });
        settle(&mut view, |s| {
            s.data.as_ref().is_some_and(|d| {
                d.rows
                    .iter()
                    .any(|row| row.proposal.id == id && row.account_vote.is_some())
            })
        })
        .await?;
        live_update_applied = true;
    }

    let stats = controller.stats();
    controller.unmount();
    drop(controller);
    for _ in 0..64 {
        if source.counters().open() == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }

    Ok(SimulationReport {
        dao,
        pages,
        voted_on: target,
        live_update_applied,
        stats,
        open_after_unmount: source.counters().open(),
    })
}

/// Resolved plugin page
#[derive(Debug, Clone)]
pub struct PluginReport {
    /// Plugin id
    pub id: String,
    /// Plugin page
    pub view: PluginView,
}

impl PluginReport {
    /// Text report
    #[must_use]
    pub fn render(&self) -> String {
        let view = &self.view;
        let mut out = String::new();
        let _ = writeln!(out, "Plugin {} ({})", self.id, view.name);
        let _ = writeln!(out, "  Kind: {}", view.kind);
        let _ = writeln!(out, "  Tabs: {}", view.tab_labels().join(" | "));
        let _ = writeln!(
            out,
            "  Default tab: {}",
            view.default_tab.as_ref().map_or_else(|| "-".to_string(), |t| t.label())
        );
        let _ = writeln!(out, "  New proposal: {}", view.can_create_proposal);
        let _ = write!(out, "  Edit plugin: {}", view.can_edit);
        out
    }
}

/// Mount the page of plugin `id` and resolve its kind and tabs
///
/// # Errors
/// - the plugin does not exist or the page does not settle in time
pub async fn inspect_plugin(config: &DashboardConfig, id: &str) -> Result<PluginReport> {
    let now = now_unix();
    let source = seeded(config, now);
    let controller = PluginContainerFactory::new(source).controller()?;
    let mut view = controller.binding();
    controller.mount(PluginPageProps::new(DEMO_DAO, id))?;

    let snapshot = settle(&mut view, |s| s.is_ready() || s.is_failed()).await?;
    let data = snapshot.data.context("plugin page has no data")?;
    tracing::info!(plugin = id, kind = %data.kind, "plugin page ready");

    Ok(PluginReport {
        id: id.to_string(),
        view: PluginView::build(&data, now),
    })
}
