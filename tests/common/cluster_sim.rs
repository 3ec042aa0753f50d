// Provisioning simulation for integration tests
// Turns a planned definition into the universe a provisioning run would persist

use super::CUSTOMER_ID;
use meridian::cluster::MasterElector;
use meridian::placement::PlacementTree;
use meridian::planner::UniversePlanner;
use meridian::types::{
    Cluster, ClusterId, NodeState, Universe, UniverseDefinition, UserIntent, ZoneId,
};
use rand::Rng;
use uuid::Uuid;

/// Apply a plan: drop removed nodes, start added ones and give the primary
/// cluster its masters.
pub fn provision(definition: &UniverseDefinition) -> Universe {
    let mut details = definition.clone();
    details.nodes.retain(|n| !n.is_to_be_removed());
    for node in details.nodes.iter_mut() {
        if node.state == NodeState::ToBeAdded {
            node.state = NodeState::Running;
            node.cloud_info.private_ip = Some(format!("10.0.0.{}", node.node_idx));
        }
    }

    if let Some(primary) = details.primary_cluster().cloned() {
        let required = primary.user_intent.replication_factor as usize;
        let current = details
            .nodes_in_cluster(primary.id)
            .filter(|n| n.is_master)
            .count();
        if current < required {
            let candidates = details
                .nodes
                .iter_mut()
                .filter(|n| n.is_in_cluster(primary.id))
                .collect();
            MasterElector::default()
                .select_masters(candidates, required - current)
                .expect("provisioning needs enough master candidates");
        }
    }

    let universe_id = details.universe_id.unwrap_or_else(Uuid::new_v4);
    Universe::new(universe_id, details)
}

/// Plan and provision a fresh universe with a single primary cluster.
pub fn create_universe<R: Rng>(planner: &mut UniversePlanner<'_, R>, intent: UserIntent) -> Universe {
    let cluster = Cluster::primary(intent);
    let cluster_id = cluster.id;
    let mut definition = UniverseDefinition::new(vec![cluster]);
    planner
        .configure(&mut definition, None, CUSTOMER_ID, cluster_id)
        .expect("create plan");
    provision(&definition)
}

/// Edit request starting from the persisted state.
pub fn edit_request(universe: &Universe) -> UniverseDefinition {
    universe.details.clone()
}

pub fn primary_id(definition: &UniverseDefinition) -> ClusterId {
    definition.primary_cluster().expect("primary cluster").id
}

pub fn primary_mut(definition: &mut UniverseDefinition) -> &mut Cluster {
    let id = primary_id(definition);
    definition.cluster_mut(id).expect("primary cluster")
}

pub fn placement_mut(definition: &mut UniverseDefinition) -> &mut PlacementTree {
    primary_mut(definition)
        .placement_info
        .as_mut()
        .expect("planned placement")
}

/// Set the desired node count of one zone.
pub fn set_zone_count(tree: &mut PlacementTree, zone: ZoneId, count: u32) {
    let zone = tree
        .zones_mut()
        .find(|z| z.id == zone)
        .expect("zone in placement");
    zone.num_nodes_in_az = count;
}
