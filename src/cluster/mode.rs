//! Configure-mode selection for create and edit requests.

use crate::catalog::TopologyCatalog;
use crate::error::Result;
use crate::placement::node_counts_by_zone;
use crate::types::{Cluster, NodeRecord, RegionId, UniverseDefinition, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info};

/// How the reconciler distributes nodes for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfigureMode {
    /// Round-robin the intent's node count over the placement; a full move on edits.
    NewConfig,
    /// Honor the intent's node count, re-deriving per-zone counts.
    UpdateFromUserIntent,
    /// Honor the per-zone counts of the desired placement.
    UpdateFromPlacementInfo,
    /// Operator-authored placement for the primary cluster.
    NewConfigFromPlacementInfo,
}

impl ConfigureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigureMode::NewConfig => "new_config",
            ConfigureMode::UpdateFromUserIntent => "update_from_user_intent",
            ConfigureMode::UpdateFromPlacementInfo => "update_from_placement_info",
            ConfigureMode::NewConfigFromPlacementInfo => "new_config_from_placement_info",
        }
    }

    /// Whether the mode replaces the cluster's entire node set.
    pub fn is_full_replacement(&self) -> bool {
        matches!(
            self,
            ConfigureMode::NewConfig | ConfigureMode::NewConfigFromPlacementInfo
        )
    }
}

impl fmt::Display for ConfigureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a request into a [`ConfigureMode`].
///
/// Selection is a pure function of its inputs, so calling it twice with the
/// same definitions yields the same mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeSelector;

impl ModeSelector {
    pub fn new() -> Self {
        Self
    }

    /// Decide between a pure expand or shrink and a full reconfiguration.
    ///
    /// `old` is the persisted definition on edits and `None` on creates. Node
    /// counts are taken from `old` on edits and from `new` otherwise.
    pub fn select_mode(
        &self,
        old: Option<&UniverseDefinition>,
        new: &UniverseDefinition,
        cluster: &Cluster,
    ) -> ConfigureMode {
        let placement = match cluster.placement_info.as_ref() {
            Some(placement) => placement,
            None => return ConfigureMode::NewConfig,
        };
        let intent = &cluster.user_intent;

        let nodes: Vec<&NodeRecord> = match old {
            Some(old) => {
                let existing = match old.cluster(cluster.id) {
                    Some(existing) => &existing.user_intent,
                    None => {
                        debug!(cluster = %cluster.id, "Cluster not in persisted definition");
                        return ConfigureMode::NewConfig;
                    }
                };
                let mut normalized = intent.clone();
                normalized.num_nodes = existing.num_nodes;
                if normalized != *existing || intent.num_nodes == existing.num_nodes {
                    info!(cluster = %cluster.id, "Intent changed beyond node count");
                    return ConfigureMode::NewConfig;
                }
                old.nodes_in_cluster(cluster.id).collect()
            }
            None => new.nodes_in_cluster(cluster.id).collect(),
        };
        let is_edit = old.is_some();

        let current = node_counts_by_zone(nodes.iter().copied());
        let mut count_changed = false;

        for (zone_id, &present) in &current {
            let zone = match placement.find_zone(*zone_id) {
                Some(zone) => zone,
                None => {
                    info!(zone = %zone_id, "Zone not in desired placement");
                    return ConfigureMode::NewConfig;
                }
            };
            let difference = zone.num_nodes_in_az as i64 - present as i64;
            let tservers = active_tserver_only_in_zone(&nodes, *zone_id);
            debug!(
                zone = %zone.name,
                desired = zone.num_nodes_in_az,
                difference,
                tservers,
                "Zone check"
            );
            if difference != 0 {
                count_changed = true;
            }
            if is_edit && difference < 0 && -difference > tservers as i64 {
                info!(zone = %zone.name, "Shrink would remove a master");
                return ConfigureMode::NewConfig;
            }
        }

        // A zone absent from the current distribution counts as changed only
        // when it now asks for nodes.
        if placement
            .zones()
            .any(|z| !current.contains_key(&z.id) && z.num_nodes_in_az > 0)
        {
            count_changed = true;
        }

        let placement_count = placement.node_count();
        let mode = if intent.num_nodes == placement_count && count_changed {
            ConfigureMode::UpdateFromPlacementInfo
        } else if intent.num_nodes != placement_count {
            ConfigureMode::UpdateFromUserIntent
        } else {
            ConfigureMode::NewConfig
        };

        info!(
            num_nodes = intent.num_nodes,
            placement_count,
            existing = nodes.len(),
            %mode,
            "Selected configure mode"
        );
        mode
    }

    /// Whether the provider or region set of the cluster's existing nodes
    /// differs from its intent.
    ///
    /// A cluster without existing nodes has nothing to compare and is never a
    /// change.
    pub fn is_provider_or_region_change(
        &self,
        cluster: &Cluster,
        nodes: &[NodeRecord],
        catalog: &dyn TopologyCatalog,
    ) -> Result<bool> {
        let cluster_nodes: Vec<&NodeRecord> = nodes
            .iter()
            .filter(|n| n.is_in_cluster(cluster.id) && !n.is_to_be_removed())
            .collect();
        let first = match cluster_nodes.first() {
            Some(first) => first,
            None => return Ok(false),
        };

        let node_provider = catalog.provider_of_zone(first.zone_id)?;
        if node_provider.id != cluster.user_intent.provider {
            info!(
                intent = %cluster.user_intent.provider,
                existing = %node_provider.id,
                cluster = %cluster.id,
                "Provider changed"
            );
            return Ok(true);
        }

        let mut node_regions: HashSet<RegionId> = HashSet::new();
        for node in &cluster_nodes {
            node_regions.insert(catalog.require_zone(node.zone_id)?.region_id);
        }
        let intent_regions: HashSet<RegionId> =
            cluster.user_intent.region_list.iter().copied().collect();

        debug!(?intent_regions, ?node_regions, cluster = %cluster.id, "Comparing regions");
        Ok(intent_regions != node_regions)
    }
}

fn active_tserver_only_in_zone(nodes: &[&NodeRecord], zone: ZoneId) -> usize {
    nodes
        .iter()
        .filter(|n| n.zone_id == zone && n.is_active_tserver_only())
        .count()
}
