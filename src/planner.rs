//! End-to-end planning of a universe definition.
//!
//! [`UniversePlanner::configure`] takes the definition a caller wants, the
//! persisted universe it edits (if any) and the cluster being configured, and
//! rewrites the definition's working node set and the cluster's placement in
//! place. Nothing is persisted; the caller stores the definition afterwards.
//!
//! ```rust
//! use meridian::catalog::{InMemoryCatalog, UnboundedInventory};
//! use meridian::cluster::ConfigureMode;
//! use meridian::config::PlannerConfig;
//! use meridian::planner::UniversePlanner;
//! use meridian::types::{CloudType, Cluster, UniverseDefinition, UserIntent};
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut catalog = InMemoryCatalog::new();
//! let provider = catalog.add_provider("aws", CloudType::Aws);
//! let region = catalog.add_region(provider, "us-west-2");
//! catalog.add_zone(region, "us-west-2a", "subnet-a");
//!
//! let intent = UserIntent::new("orders", provider, CloudType::Aws, 3, 3)
//!     .with_regions(vec![region]);
//! let cluster = Cluster::primary(intent);
//! let cluster_id = cluster.id;
//! let mut definition = UniverseDefinition::new(vec![cluster]);
//!
//! let mut planner = UniversePlanner::new(
//!     &catalog,
//!     &UnboundedInventory,
//!     PlannerConfig::default(),
//!     StdRng::seed_from_u64(1),
//! );
//! let outcome = planner.configure(&mut definition, None, 1, cluster_id).unwrap();
//!
//! assert_eq!(outcome.mode, ConfigureMode::NewConfig);
//! assert_eq!(definition.nodes.len(), 3);
//! assert_eq!(definition.nodes[0].node_name, "mdn-1-orders-n1");
//! ```

use crate::catalog::{InstanceInventory, TopologyCatalog};
use crate::cluster::{
    ConfigureMode, EditValidator, MasterElector, ModeSelector, NodeReconciler, ReconcileRequest,
    ReconcileSummary,
};
use crate::config::PlannerConfig;
use crate::error::{InventoryShortfall, MeridianError, Result};
use crate::observability;
use crate::placement::{did_affinitized_leaders_change, PlacementGenerator, PlacementTree};
use crate::types::{Cluster, ClusterId, NodeState, Universe, UniverseDefinition, UserIntent, ZoneId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Result of one planning call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanOutcome {
    pub cluster_id: ClusterId,
    pub mode: ConfigureMode,
    /// The cluster's placement was generated during this call.
    pub placement_regenerated: bool,
    pub summary: ReconcileSummary,
}

/// Plans universes against a catalog and on-prem inventory.
pub struct UniversePlanner<'a, R: Rng> {
    catalog: &'a dyn TopologyCatalog,
    inventory: &'a dyn InstanceInventory,
    config: PlannerConfig,
    rng: R,
}

impl<'a> UniversePlanner<'a, StdRng> {
    /// Planner seeded from `config.random_seed`, or from entropy when unset.
    pub fn from_config(
        catalog: &'a dyn TopologyCatalog,
        inventory: &'a dyn InstanceInventory,
        config: PlannerConfig,
    ) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(catalog, inventory, config, rng)
    }
}

impl<'a, R: Rng> UniversePlanner<'a, R> {
    pub fn new(
        catalog: &'a dyn TopologyCatalog,
        inventory: &'a dyn InstanceInventory,
        config: PlannerConfig,
        rng: R,
    ) -> Self {
        Self {
            catalog,
            inventory,
            config,
            rng,
        }
    }

    /// Node prefix shared by every node of a customer's universe.
    pub fn node_prefix(&self, customer_id: u64, universe_name: &str) -> String {
        format!("{}-{}-{}", self.config.node_prefix_base, customer_id, universe_name)
    }

    /// Generate a fresh placement for an intent.
    pub fn generate_placement(&mut self, intent: &UserIntent) -> Result<PlacementTree> {
        PlacementGenerator::new(self.catalog).generate(intent, &mut self.rng)
    }

    /// Plan the cluster `cluster_id` of `definition`.
    ///
    /// `universe` is the persisted state when editing an existing universe.
    /// On failure the definition may be partially rewritten and should be
    /// discarded.
    pub fn configure(
        &mut self,
        definition: &mut UniverseDefinition,
        universe: Option<&Universe>,
        customer_id: u64,
        cluster_id: ClusterId,
    ) -> Result<PlanOutcome> {
        match self.configure_cluster(definition, universe, customer_id, cluster_id) {
            Ok(outcome) => {
                observability::record_plan(outcome.mode);
                observability::record_nodes_planned(
                    outcome.summary.added.len(),
                    outcome.summary.removed.len(),
                );
                Ok(outcome)
            }
            Err(e) => {
                if e.is_caller_fixable() {
                    warn!(cluster = %cluster_id, error = %e, "Planning rejected");
                } else {
                    error!(cluster = %cluster_id, error = %e, "Planning failed");
                }
                observability::record_plan_failure(&e);
                Err(e)
            }
        }
    }

    fn configure_cluster(
        &mut self,
        definition: &mut UniverseDefinition,
        universe: Option<&Universe>,
        customer_id: u64,
        cluster_id: ClusterId,
    ) -> Result<PlanOutcome> {
        if definition.universe_id.is_none() {
            definition.universe_id = Some(universe.map(|u| u.universe_id).unwrap_or_else(Uuid::new_v4));
        }
        populate_cluster_indices(definition);

        let mut cluster = definition
            .cluster(cluster_id)
            .cloned()
            .ok_or_else(|| MeridianError::NotFound(format!("cluster {}", cluster_id)))?;

        let universe_name = match universe {
            Some(u) => u.primary_cluster().map(|c| c.user_intent.universe_name.clone()),
            None => definition
                .primary_cluster()
                .map(|c| c.user_intent.universe_name.clone()),
        }
        .ok_or_else(|| MeridianError::NotFound("primary cluster".to_string()))?;
        definition.node_prefix = self.node_prefix(customer_id, &universe_name);

        // Present only when the cluster already exists in the persisted universe.
        let edit_universe =
            universe.filter(|u| u.details.cluster(cluster_id).is_some());
        let is_primary_edit = universe.is_some() && cluster.is_primary();
        info!(
            cluster = %cluster.id,
            primary = cluster.is_primary(),
            edit = edit_universe.is_some(),
            user_az_selected = definition.user_az_selected,
            "Configuring cluster"
        );

        let mut placement_regenerated = false;
        let mut placement_reset = false;
        let selector = ModeSelector::new();

        let mode = if cluster.placement_info.is_none() && !is_primary_edit {
            definition.nodes.retain(|n| !n.is_in_cluster(cluster_id));
            cluster.placement_info = Some(self.generate_placement(&cluster.user_intent)?);
            placement_regenerated = true;
            info!(cluster = %cluster.id, "Placement created");
            ConfigureMode::NewConfig
        } else if is_primary_edit && definition.user_az_selected {
            let universe = edit_universe.ok_or_else(|| {
                MeridianError::NotFound(format!("cluster {} in persisted universe", cluster_id))
            })?;
            if cluster.placement_info.is_none() {
                cluster.placement_info = Some(self.generate_placement(&cluster.user_intent)?);
                placement_regenerated = true;
                placement_reset = true;
            }
            replace_cluster_nodes(definition, universe, cluster_id);
            ConfigureMode::NewConfigFromPlacementInfo
        } else if is_primary_edit {
            let universe = edit_universe.ok_or_else(|| {
                MeridianError::NotFound(format!("cluster {} in persisted universe", cluster_id))
            })?;
            let old = universe
                .primary_cluster()
                .ok_or_else(|| MeridianError::NotFound("persisted primary cluster".to_string()))?;
            EditValidator::new().validate_edit(old, &cluster)?;
            replace_cluster_nodes(definition, universe, cluster_id);

            if cluster.placement_info.is_none() {
                info!(cluster = %cluster.id, "Placement cleared, new placement for full move");
                cluster.placement_info = Some(self.generate_placement(&cluster.user_intent)?);
                placement_regenerated = true;
                ConfigureMode::NewConfig
            } else if selector.is_provider_or_region_change(&cluster, universe.nodes(), self.catalog)? {
                info!(cluster = %cluster.id, "Provider or region changed, new placement for full move");
                cluster.placement_info = Some(self.generate_placement(&cluster.user_intent)?);
                placement_regenerated = true;
                ConfigureMode::NewConfig
            } else if affinity_only_change(old, &cluster) {
                ConfigureMode::UpdateFromPlacementInfo
            } else {
                selector.select_mode(Some(&universe.details), definition, &cluster)
            }
        } else {
            let existing_nodes = match edit_universe {
                Some(u) => u.nodes(),
                None => definition.nodes.as_slice(),
            };
            if selector.is_provider_or_region_change(&cluster, existing_nodes, self.catalog)? {
                info!(cluster = %cluster.id, "Provider or region changed, new placement");
                cluster.placement_info = Some(self.generate_placement(&cluster.user_intent)?);
                placement_regenerated = true;
                ConfigureMode::NewConfig
            } else {
                selector.select_mode(edit_universe.map(|u| &u.details), definition, &cluster)
            }
        };

        if mode == ConfigureMode::NewConfig {
            definition.nodes.retain(|n| !n.is_in_cluster(cluster_id));
        }

        let node_prefix = definition.node_prefix.clone();
        let request = ReconcileRequest {
            mode,
            node_prefix: &node_prefix,
            universe: edit_universe,
            placement_reset,
        };
        let reconciler = NodeReconciler::new(
            self.inventory,
            MasterElector::new(self.config.max_master_subnets),
        );
        let summary = reconciler.reconcile(&request, &mut cluster, &mut definition.nodes)?;

        let slot = definition
            .cluster_mut(cluster_id)
            .ok_or_else(|| MeridianError::NotFound(format!("cluster {}", cluster_id)))?;
        *slot = cluster;

        let cluster = definition
            .cluster(cluster_id)
            .ok_or_else(|| MeridianError::NotFound(format!("cluster {}", cluster_id)))?;
        check_node_params_valid(definition, cluster, self.catalog, self.inventory)?;

        info!(
            cluster = %cluster_id,
            %mode,
            added = summary.added.len(),
            removed = summary.removed.len(),
            masters = summary.masters.len(),
            "Cluster configured"
        );
        Ok(PlanOutcome {
            cluster_id,
            mode,
            placement_regenerated,
            summary,
        })
    }
}

/// Give new read-only clusters the next naming ordinal.
pub fn populate_cluster_indices(definition: &mut UniverseDefinition) {
    let mut next = definition.next_cluster_index;
    for cluster in definition.clusters.iter_mut().filter(|c| !c.is_primary()) {
        if cluster.index == 0 {
            cluster.index = next;
            next += 1;
        }
    }
    definition.next_cluster_index = next;
}

/// Check that on-prem inventory can back the cluster's nodes.
///
/// Before any node is configured the whole region list must hold enough
/// machines; afterwards each zone must hold its `ToBeAdded` nodes. Clusters on
/// cloud providers always pass.
pub fn check_node_params_valid(
    definition: &UniverseDefinition,
    cluster: &Cluster,
    catalog: &dyn TopologyCatalog,
    inventory: &dyn InstanceInventory,
) -> Result<()> {
    let intent = &cluster.user_intent;
    if !intent.provider_type.is_on_prem() {
        return Ok(());
    }
    let instance_type = intent.instance_type.as_str();
    let mut shortfalls = Vec::new();

    if definition.nodes_in_cluster(cluster.id).next().is_none() {
        let zones: Vec<ZoneId> = intent
            .region_list
            .iter()
            .flat_map(|r| catalog.zones_in_region(*r))
            .map(|z| z.id)
            .collect();
        let total: usize = zones
            .iter()
            .map(|z| inventory.available_instances(*z, instance_type))
            .sum();
        if total >= intent.num_nodes as usize {
            return Ok(());
        }
        let num_nodes = intent.num_nodes as usize;
        for (i, zone) in zones.iter().enumerate() {
            let required = num_nodes / zones.len() + usize::from(i < num_nodes % zones.len());
            let available = inventory.available_instances(*zone, instance_type);
            if required > available {
                shortfalls.push(InventoryShortfall {
                    zone: *zone,
                    instance_type: instance_type.to_string(),
                    required,
                    available,
                });
            }
        }
        error!(required = num_nodes, configured = total, "Not enough on-prem nodes");
    } else {
        let mut to_add: HashMap<ZoneId, usize> = HashMap::new();
        for node in definition
            .nodes_in_cluster(cluster.id)
            .filter(|n| n.state == NodeState::ToBeAdded)
        {
            *to_add.entry(node.zone_id).or_insert(0) += 1;
        }
        for (zone, required) in to_add {
            let available = inventory.available_instances(zone, instance_type);
            if required > available {
                error!(%zone, required, available, %instance_type, "Not enough on-prem nodes in zone");
                shortfalls.push(InventoryShortfall {
                    zone,
                    instance_type: instance_type.to_string(),
                    required,
                    available,
                });
            }
        }
        if shortfalls.is_empty() {
            return Ok(());
        }
    }

    Err(MeridianError::InsufficientInventory(shortfalls))
}

/// Reset the cluster's working nodes to its persisted nodes.
fn replace_cluster_nodes(definition: &mut UniverseDefinition, universe: &Universe, cluster_id: ClusterId) {
    definition.nodes.retain(|n| !n.is_in_cluster(cluster_id));
    definition
        .nodes
        .extend(universe.nodes_in_cluster(cluster_id).cloned());
}

/// Same intent and same per-zone counts, with at least one anchor flag flipped.
fn affinity_only_change(old: &Cluster, new: &Cluster) -> bool {
    if old.user_intent != new.user_intent {
        return false;
    }
    match (old.placement_info.as_ref(), new.placement_info.as_ref()) {
        (Some(old), Some(new)) => {
            old.zone_node_counts() == new.zone_node_counts()
                && did_affinitized_leaders_change(old, new)
        }
        _ => false,
    }
}
