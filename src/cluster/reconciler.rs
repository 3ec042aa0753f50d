//! Node reconciliation.
//!
//! Turns a [`ConfigureMode`] and a cluster's desired placement into concrete
//! node adds and removes against the working node set. Existing nodes are
//! kept wherever the mode allows it; new nodes get indices above every index
//! ever allocated so names never collide with nodes still being decommissioned.

use super::masters::MasterElector;
use super::mode::ConfigureMode;
use super::num_masters;
use crate::catalog::InstanceInventory;
use crate::error::{InventoryShortfall, MeridianError, Result};
use crate::placement::{
    node_counts_by_zone, update_placement_info, PlacementIndex, PlacementTree, PlacementZone,
};
use crate::types::{CloudInfo, Cluster, ClusterId, NodeRecord, NodeState, Universe, ZoneId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, error, info};

/// Inputs that shape one reconciliation pass.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileRequest<'r> {
    pub mode: ConfigureMode,
    pub node_prefix: &'r str,
    /// Persisted universe; present only on edits.
    pub universe: Option<&'r Universe>,
    /// The operator cleared a manual placement and it was regenerated.
    pub placement_reset: bool,
}

/// Node names touched by a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub masters: Vec<String>,
}

/// Computes node actions for a cluster.
pub struct NodeReconciler<'a> {
    inventory: &'a dyn InstanceInventory,
    elector: MasterElector,
}

impl<'a> NodeReconciler<'a> {
    pub fn new(inventory: &'a dyn InstanceInventory, elector: MasterElector) -> Self {
        Self { inventory, elector }
    }

    /// Run the pass selected by `request.mode`, then top up primary-cluster
    /// masters on edits and normalize the cluster's placement.
    pub fn reconcile(
        &self,
        request: &ReconcileRequest<'_>,
        cluster: &mut Cluster,
        nodes: &mut Vec<NodeRecord>,
    ) -> Result<ReconcileSummary> {
        let mut summary = ReconcileSummary::default();
        let is_edit = request.universe.is_some();

        match request.mode {
            ConfigureMode::NewConfig => self.base_placement(cluster, nodes, request, &mut summary)?,
            ConfigureMode::UpdateFromPlacementInfo => {
                self.delta_placement(cluster, nodes, request, &mut summary)?
            }
            ConfigureMode::UpdateFromUserIntent => {
                self.user_intent_placement(cluster, nodes, request, &mut summary)?
            }
            ConfigureMode::NewConfigFromPlacementInfo => {
                self.manual_placement(cluster, nodes, request, &mut summary)?
            }
        }

        if cluster.is_primary() && is_edit {
            let required = cluster.user_intent.replication_factor as usize;
            let current = num_masters(live_cluster_nodes(nodes, cluster.id));
            if current < required {
                info!(count = required - current, "Selecting masters");
                let candidates = nodes
                    .iter_mut()
                    .filter(|n| n.is_in_cluster(cluster.id) && !n.is_to_be_removed())
                    .collect();
                summary.masters = self.elector.select_masters(candidates, required - current)?;
            }
        }

        // Pre-creation placements without nodes are left as authored.
        if live_cluster_nodes(nodes, cluster.id).next().is_some() {
            if let Some(tree) = cluster.placement_info.as_mut() {
                update_placement_info(live_cluster_nodes(nodes, cluster.id), tree);
            }
        }

        ensure_unique_node_names(nodes.iter().filter(|n| n.is_in_cluster(cluster.id)))?;
        Ok(summary)
    }

    /// Round-robin `num_nodes` new nodes over the placement in tree order; on
    /// edits every existing node of the cluster is decommissioned.
    fn base_placement(
        &self,
        cluster: &Cluster,
        nodes: &mut Vec<NodeRecord>,
        request: &ReconcileRequest<'_>,
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        let tree = placement(cluster)?;
        let slots = self.allocate(cluster, &tree.indexes(), cluster.user_intent.num_nodes as usize)?;
        let start = start_index(nodes, request.universe);

        for (i, index) in slots.into_iter().enumerate() {
            let node = create_node(cluster, request.node_prefix, index, start + i as u32)?;
            summary.added.push(node.node_name.clone());
            nodes.push(node);
        }
        info!(cluster = %cluster.id, added = summary.added.len(), "Base placement");

        if let Some(universe) = request.universe {
            decommission_existing(cluster, universe, nodes, summary);
        }
        Ok(())
    }

    /// Apply per-zone differences between the desired placement and the
    /// cluster's current nodes.
    fn delta_placement(
        &self,
        cluster: &mut Cluster,
        nodes: &mut Vec<NodeRecord>,
        request: &ReconcileRequest<'_>,
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        let is_edit = request.universe.is_some();
        let actions = {
            let tree = placement(cluster)?;
            let present = node_counts_by_zone(nodes.iter().filter(|n| n.is_in_cluster(cluster.id)));
            let mut actions = Vec::new();
            for index in tree.indexes() {
                let zone = zone_of(tree, index)?;
                let current = present.get(&zone.id).copied().unwrap_or(0);
                debug!(zone = %zone.name, desired = zone.num_nodes_in_az, present = current, "Zone delta");
                let is_add = zone.num_nodes_in_az > current;
                for _ in 0..zone.num_nodes_in_az.abs_diff(current) {
                    actions.push((index, is_add));
                }
            }
            actions
        };

        let mut next = start_index(nodes, request.universe);
        for (index, is_add) in actions {
            if is_add {
                let node = create_node(cluster, request.node_prefix, index, next)?;
                next += 1;
                summary.added.push(node.node_name.clone());
                nodes.push(node);
                continue;
            }

            let zone_id = zone_of(placement(cluster)?, index)?.id;
            if is_edit {
                summary.removed.push(decommission_in_zone(cluster.id, nodes, zone_id)?);
            } else if let Some(name) = remove_in_zone(cluster.id, nodes, zone_id) {
                summary.removed.push(name);
            }
            if let Some(zone) = cluster
                .placement_info
                .as_mut()
                .and_then(|tree| tree.zone_at_mut(index))
            {
                zone.num_nodes_in_az = zone.num_nodes_in_az.saturating_sub(1);
            }
        }
        info!(
            cluster = %cluster.id,
            added = summary.added.len(),
            removed = summary.removed.len(),
            "Delta placement"
        );
        Ok(())
    }

    /// Grow or shrink the cluster to the intent's node count, ignoring the
    /// per-zone counts of the placement.
    fn user_intent_placement(
        &self,
        cluster: &Cluster,
        nodes: &mut Vec<NodeRecord>,
        request: &ReconcileRequest<'_>,
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        let current = live_cluster_nodes(nodes, cluster.id).count();
        let desired = cluster.user_intent.num_nodes as usize;
        info!(cluster = %cluster.id, desired, existing = current, "User intent placement");

        if desired < current {
            let mut needed = current - desired;
            if request.universe.is_some() {
                for node in nodes.iter_mut() {
                    if needed == 0 {
                        break;
                    }
                    if !node.is_in_cluster(cluster.id) || node.is_master || !node.is_active() {
                        continue;
                    }
                    node.state = NodeState::ToBeRemoved;
                    debug!(node = %node.node_name, "Removing node");
                    summary.removed.push(node.node_name.clone());
                    needed -= 1;
                }
            } else {
                let victims: Vec<String> = live_cluster_nodes(nodes, cluster.id)
                    .filter(|n| !n.is_master)
                    .take(needed)
                    .map(|n| n.node_name.clone())
                    .collect();
                needed -= victims.len();
                let names: HashSet<&str> = victims.iter().map(String::as_str).collect();
                nodes.retain(|n| !(n.is_in_cluster(cluster.id) && names.contains(n.node_name.as_str())));
                summary.removed.extend(victims);
            }

            if needed > 0 {
                error!(cluster = %cluster.id, needed, "Not enough non-master nodes to remove");
                return Err(MeridianError::InvariantViolation(format!(
                    "could not find {} more non-master nodes to remove in cluster {}",
                    needed, cluster.id
                )));
            }
        } else if desired > current {
            let tree = placement(cluster)?;
            let counts = node_counts_by_zone(nodes.iter().filter(|n| n.is_in_cluster(cluster.id)));
            let mut order = tree.indexes();
            // Least occupied first; ties keep tree order.
            order.sort_by_key(|index| {
                tree.zone_at(*index)
                    .and_then(|z| counts.get(&z.id).copied())
                    .unwrap_or(0)
            });

            let slots = self.allocate(cluster, &order, desired - current)?;
            let start = start_index(nodes, request.universe);
            for (i, index) in slots.into_iter().enumerate() {
                let node = create_node(cluster, request.node_prefix, index, start + i as u32)?;
                summary.added.push(node.node_name.clone());
                nodes.push(node);
            }
        }
        Ok(())
    }

    /// Operator-authored placement for the primary cluster: a reset, a simple
    /// expand, or a full move onto the authored tree.
    fn manual_placement(
        &self,
        cluster: &mut Cluster,
        nodes: &mut Vec<NodeRecord>,
        request: &ReconcileRequest<'_>,
        summary: &mut ReconcileSummary,
    ) -> Result<()> {
        let universe = request.universe.ok_or_else(|| {
            MeridianError::InvariantViolation(
                "manual placement is only valid when editing a universe".to_string(),
            )
        })?;

        if request.placement_reset {
            info!(cluster = %cluster.id, "Placement reset, full move");
            nodes.retain(|n| !n.is_in_cluster(cluster.id));
            return self.base_placement(cluster, nodes, request, summary);
        }

        let required = placement(cluster)?.zone_node_counts();
        let existing = node_counts_by_zone(universe.nodes_in_cluster(cluster.id));
        let simple_expand = existing.keys().all(|z| required.contains_key(z))
            && required
                .iter()
                .all(|(z, &want)| existing.get(z).map_or(false, |&have| want >= have));

        if simple_expand {
            info!(cluster = %cluster.id, "Simple expand of manual placement");
            return self.delta_placement(cluster, nodes, request, summary);
        }

        info!(cluster = %cluster.id, "Full move onto manual placement");
        nodes.retain(|n| !n.is_in_cluster(cluster.id));
        let tree = placement(cluster)?;
        let mut next = start_index(nodes, request.universe);
        for index in tree.indexes() {
            for _ in 0..zone_of(tree, index)?.num_nodes_in_az {
                let node = create_node(cluster, request.node_prefix, index, next)?;
                next += 1;
                summary.added.push(node.node_name.clone());
                nodes.push(node);
            }
        }
        decommission_existing(cluster, universe, nodes, summary);
        Ok(())
    }

    /// Pick `count` zone slots by cycling through `order`, skipping on-prem
    /// zones whose inventory is used up.
    fn allocate(
        &self,
        cluster: &Cluster,
        order: &[PlacementIndex],
        count: usize,
    ) -> Result<Vec<PlacementIndex>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if order.is_empty() {
            return Err(MeridianError::InvariantViolation(format!(
                "placement of cluster {} has no zones",
                cluster.id
            )));
        }

        let tree = placement(cluster)?;
        let intent = &cluster.user_intent;
        let on_prem = intent.provider_type.is_on_prem();
        let mut planned: HashMap<PlacementIndex, usize> = HashMap::new();
        let mut slots = Vec::with_capacity(count);

        while slots.len() < count {
            let before = slots.len();
            for index in order {
                if slots.len() == count {
                    break;
                }
                let taken = planned.entry(*index).or_insert(0);
                if on_prem {
                    let zone = zone_of(tree, *index)?;
                    if *taken >= self.inventory.available_instances(zone.id, &intent.instance_type) {
                        continue;
                    }
                }
                *taken += 1;
                slots.push(*index);
            }
            if slots.len() == before {
                return Err(self.shortfall(tree, order, count, &intent.instance_type));
            }
        }
        Ok(slots)
    }

    fn shortfall(
        &self,
        tree: &PlacementTree,
        order: &[PlacementIndex],
        count: usize,
        instance_type: &str,
    ) -> MeridianError {
        let mut shortfalls = Vec::new();
        for (i, index) in order.iter().enumerate() {
            let zone = match tree.zone_at(*index) {
                Some(zone) => zone,
                None => continue,
            };
            let required = count / order.len() + usize::from(i < count % order.len());
            let available = self.inventory.available_instances(zone.id, instance_type);
            if required > available {
                shortfalls.push(InventoryShortfall {
                    zone: zone.id,
                    instance_type: instance_type.to_string(),
                    required,
                    available,
                });
            }
        }
        info!(count, zones = order.len(), "Inventory exhausted");
        MeridianError::InsufficientInventory(shortfalls)
    }
}

/// Name of a node with index `node_idx` in `cluster`.
pub fn node_name(cluster: &Cluster, node_prefix: &str, node_idx: u32) -> String {
    if cluster.is_primary() {
        format!("{}-n{}", node_prefix, node_idx)
    } else {
        format!("{}-readonly{}-n{}", node_prefix, cluster.index, node_idx)
    }
}

/// One past the highest node index among `nodes`; 1 for an empty set.
pub fn next_node_index<'n>(nodes: impl IntoIterator<Item = &'n NodeRecord>) -> u32 {
    nodes.into_iter().map(|n| n.node_idx).max().unwrap_or(0) + 1
}

/// Reject node sets that reuse a name.
pub fn ensure_unique_node_names<'n>(nodes: impl IntoIterator<Item = &'n NodeRecord>) -> Result<()> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for node in nodes {
        if !seen.insert(node.node_name.as_str()) {
            error!(node = %node.node_name, "Duplicate node name");
            duplicates.push(node.node_name.clone());
        }
    }
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(MeridianError::InvariantViolation(format!(
            "duplicate node names: {}",
            duplicates.join(", ")
        )))
    }
}

fn create_node(
    cluster: &Cluster,
    node_prefix: &str,
    index: PlacementIndex,
    node_idx: u32,
) -> Result<NodeRecord> {
    let tree = placement(cluster)?;
    let (cloud, region, zone) = match (tree.cloud_at(index), tree.region_at(index), tree.zone_at(index)) {
        (Some(c), Some(r), Some(z)) => (c, r, z),
        _ => return Err(missing_index(index)),
    };
    let intent = &cluster.user_intent;

    let node = NodeRecord {
        node_name: node_name(cluster, node_prefix, node_idx),
        node_idx,
        cluster_id: cluster.id,
        zone_id: zone.id,
        cloud_info: CloudInfo {
            cloud: cloud.code.clone(),
            region: region.code.clone(),
            az: zone.name.clone(),
            subnet_id: zone.subnet.clone(),
            instance_type: intent.instance_type.clone(),
            assign_public_ip: intent.assign_public_ip,
            use_time_sync: intent.use_time_sync,
            spot_price: intent.spot_price,
            private_ip: None,
        },
        is_master: false,
        is_tserver: true,
        state: NodeState::ToBeAdded,
    };
    debug!(node = %node.node_name, zone = %zone.name, region = %region.code, "Placed new node");
    Ok(node)
}

fn decommission_existing(
    cluster: &Cluster,
    universe: &Universe,
    nodes: &mut Vec<NodeRecord>,
    summary: &mut ReconcileSummary,
) {
    let existing: Vec<NodeRecord> = universe.nodes_in_cluster(cluster.id).cloned().collect();
    info!(cluster = %cluster.id, count = existing.len(), "Decommissioning existing nodes");
    for mut node in existing {
        nodes.retain(|n| n.node_name != node.node_name);
        node.state = NodeState::ToBeRemoved;
        summary.removed.push(node.node_name.clone());
        nodes.push(node);
    }
}

fn decommission_in_zone(cluster_id: ClusterId, nodes: &mut [NodeRecord], zone: ZoneId) -> Result<String> {
    match nodes
        .iter_mut()
        .find(|n| n.is_in_cluster(cluster_id) && n.zone_id == zone && n.is_active_tserver_only())
    {
        Some(node) => {
            node.state = NodeState::ToBeRemoved;
            debug!(node = %node.node_name, "Removing node");
            Ok(node.node_name.clone())
        }
        None => {
            error!(%zone, "No active tserver-only node to remove");
            Err(MeridianError::InvariantViolation(format!(
                "no active tserver-only node in zone {}",
                zone
            )))
        }
    }
}

fn remove_in_zone(cluster_id: ClusterId, nodes: &mut Vec<NodeRecord>, zone: ZoneId) -> Option<String> {
    let pos = nodes.iter().position(|n| {
        n.is_in_cluster(cluster_id) && n.zone_id == zone && !n.is_master && !n.is_to_be_removed()
    })?;
    Some(nodes.remove(pos).node_name)
}

fn live_cluster_nodes(nodes: &[NodeRecord], cluster_id: ClusterId) -> impl Iterator<Item = &NodeRecord> {
    nodes
        .iter()
        .filter(move |n| n.is_in_cluster(cluster_id) && !n.is_to_be_removed())
}

fn placement(cluster: &Cluster) -> Result<&PlacementTree> {
    cluster.placement_info.as_ref().ok_or_else(|| {
        MeridianError::InvariantViolation(format!("cluster {} has no placement", cluster.id))
    })
}

fn zone_of(tree: &PlacementTree, index: PlacementIndex) -> Result<&PlacementZone> {
    tree.zone_at(index).ok_or_else(|| missing_index(index))
}

fn missing_index(index: PlacementIndex) -> MeridianError {
    MeridianError::InvariantViolation(format!(
        "placement index {}:{}:{} out of range",
        index.cloud, index.region, index.zone
    ))
}

fn start_index(nodes: &[NodeRecord], universe: Option<&Universe>) -> u32 {
    next_node_index(nodes.iter().chain(universe.map(Universe::nodes).unwrap_or_default()))
}
