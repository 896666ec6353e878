//! Plugin container
//!
//! The page of one installed plugin. The plugin is looked up once when the
//! page mounts (an unknown id fails the page with `Plugin not found`) and
//! its [`PluginKind`] is fixed from that first state. The page then follows
//! three sources:
//! - the plugin state, live
//! - the DAO's `SchemeFactory` plugin, if installed
//! - approved proposals: executed proposals of this plugin that passed,
//!   followed only when the plugin has a rewarder contract
//!
//! The page watches `plugin_id`.

use async_trait::async_trait;
use futures::StreamExt;
use gov_model::{
    Address, DataSource, Outcome, PluginFilter, PluginState, ProposalFilter, ProposalOrder,
    ProposalStage, ProposalState,
};
use gov_stream::{combine_latest3, single, DataStream, StreamError, StreamOptions};
use gov_subscription::{ControllerConfig, ControllerError, SubscriptionController, SubscriptionFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Contract names of plugins that accept proposals
pub const PROPOSAL_PLUGIN_NAMES: [&str; 5] = [
    "ContributionReward",
    "ContributionRewardExt",
    "GenericScheme",
    "SchemeRegistrar",
    "SchemeFactory",
];

/// Contract name of the plugin managing the DAO's plugins
pub const SCHEME_FACTORY: &str = "SchemeFactory";

/// Display name of the rewarder tab
const REWARDER_TAB_NAME: &str = "Competition";

/// Kind of plugin page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginKind {
    /// Redeem reputation for tokens (dedicated page, no tabs)
    ReputationFromToken,
    /// Accepts proposals
    Proposal,
    /// Standard bounties
    Bounty,
    /// Proposal plugin extended by a rewarder contract
    RewarderExtension,
    /// Parameters only
    InfoOnly,
}

impl PluginKind {
    /// Resolve the kind of `plugin`
    #[must_use]
    pub fn resolve(plugin: &PluginState) -> Self {
        match plugin.name.as_str() {
            "ReputationFromToken" => Self::ReputationFromToken,
            "StandardBounties" => Self::Bounty,
            _ if plugin.has_rewarder() => Self::RewarderExtension,
            name if PROPOSAL_PLUGIN_NAMES.contains(&name) => Self::Proposal,
            _ => Self::InfoOnly,
        }
    }

    /// Check if the page lists proposals
    #[inline]
    #[must_use]
    pub fn accepts_proposals(self) -> bool {
        matches!(self, Self::Proposal | Self::RewarderExtension)
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReputationFromToken => "reputation-from-token",
            Self::Proposal => "proposal",
            Self::Bounty => "bounty",
            Self::RewarderExtension => "rewarder-extension",
            Self::InfoOnly => "info-only",
        };
        f.write_str(name)
    }
}

/// Tab of a plugin page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginTab {
    /// Proposals of the plugin
    Proposals,
    /// Plugin parameters
    Information,
    /// Open bounties
    OpenBounties,
    /// Rewarder listing with its approved proposal count
    Rewarder {
        /// Tab name
        name: String,
        /// Approved proposals
        approved: usize,
    },
}

impl PluginTab {
    /// Tab label
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Proposals => "Proposals".to_string(),
            Self::Information => "Information".to_string(),
            Self::OpenBounties => "Open Bounties".to_string(),
            Self::Rewarder { name, approved } => format!("{name} ({approved})"),
        }
    }
}

/// Props of the plugin page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginPageProps {
    /// DAO the plugin is installed in
    pub dao: Address,
    /// Plugin shown
    pub plugin_id: String,
    /// Connected account, if any
    pub current_account: Option<Address>,
}

impl PluginPageProps {
    /// Props for `plugin_id` of `dao`
    #[must_use]
    pub fn new(dao: impl Into<Address>, plugin_id: impl Into<String>) -> Self {
        Self {
            dao: dao.into(),
            plugin_id: plugin_id.into(),
            current_account: None,
        }
    }
}

/// Data rendered by the plugin page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPageData {
    /// Kind fixed when the page mounted
    pub kind: PluginKind,
    /// Plugin state
    pub plugin: PluginState,
    /// The DAO's plugin manager
    pub scheme_factory: Option<PluginState>,
    /// Approved proposals (rewarder plugins only)
    pub approved: Vec<ProposalState>,
}

/// Rendered plugin page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginView {
    /// Resolved kind
    pub kind: PluginKind,
    /// Plugin name
    pub name: String,
    /// Tabs in display order
    pub tabs: Vec<PluginTab>,
    /// Tab opened first; `None` when the page has no tabs
    pub default_tab: Option<PluginTab>,
    /// "New proposal" enabled
    pub can_create_proposal: bool,
    /// "Edit plugin" available
    pub can_edit: bool,
}

impl PluginView {
    /// Build the page at time `now`
    #[must_use]
    pub fn build(data: &PluginPageData, now: i64) -> Self {
        let kind = data.kind;
        let tabs = match kind {
            PluginKind::ReputationFromToken => Vec::new(),
            PluginKind::Proposal => vec![PluginTab::Proposals, PluginTab::Information],
            PluginKind::Bounty => vec![PluginTab::Information, PluginTab::OpenBounties],
            PluginKind::RewarderExtension => vec![
                PluginTab::Proposals,
                PluginTab::Information,
                PluginTab::Rewarder {
                    name: REWARDER_TAB_NAME.to_string(),
                    approved: data.approved.len(),
                },
            ],
            PluginKind::InfoOnly => vec![PluginTab::Information],
        };
        let default_tab = if kind.accepts_proposals() {
            Some(PluginTab::Proposals)
        } else if kind == PluginKind::ReputationFromToken {
            None
        } else {
            Some(PluginTab::Information)
        };

        Self {
            kind,
            name: data.plugin.name.clone(),
            tabs,
            default_tab,
            can_create_proposal: kind.accepts_proposals() && data.plugin.is_active(now),
            can_edit: kind.accepts_proposals() && data.scheme_factory.is_some(),
        }
    }

    /// Tab labels in order
    #[must_use]
    pub fn tab_labels(&self) -> Vec<String> {
        self.tabs.iter().map(PluginTab::label).collect()
    }
}

/// Factory of the plugin page stream
#[derive(Debug, Clone)]
pub struct PluginContainerFactory {
    source: Arc<dyn DataSource>,
}

impl PluginContainerFactory {
    /// Create factory over `source`
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    /// Controller configuration of the page
    #[must_use]
    pub fn config() -> ControllerConfig {
        ControllerConfig::new().with_watched_keys(&["plugin_id"])
    }

    /// Build the page controller
    ///
    /// # Errors
    /// - `ControllerError::Config` if the configuration is rejected
    pub fn controller(self) -> Result<PluginContainerController, ControllerError> {
        SubscriptionController::new(self, Self::config())
    }

    /// Look the plugin up once
    async fn resolve(&self, plugin_id: &str) -> Result<PluginState, StreamError> {
        let found = self
            .source
            .plugins(&PluginFilter::by_id(plugin_id), StreamOptions::once())
            .next()
            .await
            .transpose()?
            .and_then(|plugins| plugins.into_iter().next());

        found.ok_or_else(|| StreamError::not_found("Plugin", plugin_id))
    }

    /// The DAO's `SchemeFactory` plugin, or `None`
    fn scheme_factory(&self, dao: &Address) -> DataStream<Option<PluginState>> {
        self.source
            .plugins(
                &PluginFilter::named_in(dao.clone(), SCHEME_FACTORY),
                StreamOptions::once(),
            )
            .map(|item| item.map(|plugins| plugins.into_iter().next()))
            .boxed()
    }

    /// Executed proposals of `plugin` that passed
    fn approved_proposals(&self, plugin: &PluginState) -> DataStream<Vec<ProposalState>> {
        if !plugin.has_rewarder() {
            return single(Vec::new());
        }

        let filter = ProposalFilter::for_dao(plugin.dao.clone())
            .with_plugin(plugin.id.clone())
            .with_stages(&[ProposalStage::Executed])
            .ordered_by(ProposalOrder::ClosingAtDesc);
        self.source
            .proposals(&filter, StreamOptions::live())
            .map(|item| {
                item.map(|proposals| {
                    proposals
                        .into_iter()
                        .filter(|p| p.winning_outcome == Outcome::Pass)
                        .collect()
                })
            })
            .boxed()
    }
}

#[async_trait]
impl SubscriptionFactory for PluginContainerFactory {
    type Props = PluginPageProps;
    type Data = PluginPageData;

    async fn create(&self, props: &PluginPageProps) -> Result<DataStream<PluginPageData>, StreamError> {
        let plugin = self.resolve(&props.plugin_id).await?;
        let kind = PluginKind::resolve(&plugin);
        tracing::debug!(plugin = %plugin.id, name = %plugin.name, %kind, "plugin resolved");

        let combined = combine_latest3(
            self.source.plugin_state(&plugin.id, StreamOptions::live()),
            self.scheme_factory(&props.dao),
            self.approved_proposals(&plugin),
        );

        Ok(combined
            .map(move |item| {
                item.map(|(plugin, scheme_factory, approved)| PluginPageData {
                    kind,
                    plugin,
                    scheme_factory,
                    approved,
                })
            })
            .boxed())
    }
}

/// Controller of the plugin page
pub type PluginContainerController = SubscriptionController<PluginContainerFactory>;

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin(name: &str, rewarder: Option<&str>) -> PluginState {
        PluginState {
            id: name.to_lowercase(),
            dao: Address::from("0xdao"),
            name: name.to_string(),
            address: Address::from("0xplugin"),
            activation_time: 100,
            rewarder: rewarder.map(Address::from),
        }
    }

    fn page(plugin: PluginState, scheme_factory: bool) -> PluginPageData {
        PluginPageData {
            kind: PluginKind::resolve(&plugin),
            scheme_factory: scheme_factory.then(|| self::plugin(SCHEME_FACTORY, None)),
            plugin,
            approved: Vec::new(),
        }
    }

    #[test]
    fn resolves_kinds() {
        let cases = [
            (plugin("ReputationFromToken", None), PluginKind::ReputationFromToken),
            (plugin("StandardBounties", None), PluginKind::Bounty),
            (plugin("ContributionRewardExt", Some("0xr")), PluginKind::RewarderExtension),
            (plugin("ContributionRewardExt", None), PluginKind::Proposal),
            (plugin("GenericScheme", None), PluginKind::Proposal),
            (plugin("TokenRegistry", None), PluginKind::InfoOnly),
        ];
        for (plugin, expected) in cases {
            assert_eq!(PluginKind::resolve(&plugin), expected, "{}", plugin.name);
        }
    }

    #[test]
    fn proposal_plugin_tabs() {
        let view = PluginView::build(&page(plugin("ContributionReward", None), true), 100);
        assert_eq!(view.tab_labels(), vec!["Proposals", "Information"]);
        assert_eq!(view.default_tab, Some(PluginTab::Proposals));
        assert!(view.can_create_proposal);
        assert!(view.can_edit);
    }

    #[test]
    fn inactive_plugin_disables_new_proposal() {
        let view = PluginView::build(&page(plugin("GenericScheme", None), false), 99);
        assert!(!view.can_create_proposal);
        assert!(!view.can_edit);
    }

    #[test]
    fn rewarder_tab_counts_approved() {
        let mut data = page(plugin("ContributionRewardExt", Some("0xr")), false);
        data.approved = vec![gov_model::demo_proposal(3, ProposalStage::Executed, 0)];
        let view = PluginView::build(&data, 100);
        assert_eq!(
            view.tab_labels(),
            vec!["Proposals", "Information", "Competition (1)"]
        );
    }

    #[test]
    fn info_only_and_bounty_default_to_information() {
        let bounty = PluginView::build(&page(plugin("StandardBounties", None), false), 100);
        assert_eq!(bounty.tab_labels(), vec!["Information", "Open Bounties"]);
        assert_eq!(bounty.default_tab, Some(PluginTab::Information));

        let info = PluginView::build(&page(plugin("TokenRegistry", None), false), 100);
        assert_eq!(info.tabs, vec![PluginTab::Information]);
        assert!(!info.can_create_proposal);

        let redeem = PluginView::build(&page(plugin("ReputationFromToken", None), false), 100);
        assert!(redeem.tabs.is_empty());
        assert_eq!(redeem.default_tab, None);
    }
}
