//! Cluster topology planning for Meridian.
//!
//! This module holds the planning stages that run against one cluster of a
//! universe:
//! - Mode selection for create and edit requests
//! - Node reconciliation (base, delta, user-intent and manual passes)
//! - Master election across subnets
//! - Edit validation
//!
//! It also provides the node-set queries the provisioning side uses to read a
//! plan back, all filtered through one [`ServerType`].

pub mod masters;
pub mod mode;
pub mod reconciler;
pub mod validator;

pub use masters::MasterElector;
pub use mode::{ConfigureMode, ModeSelector};
pub use reconciler::{
    ensure_unique_node_names, next_node_index, node_name, NodeReconciler, ReconcileRequest,
    ReconcileSummary,
};
pub use validator::{verify_nodes_and_rf, EditValidator, SUPPORTED_REPLICATION_FACTORS};

use crate::types::{NodeRecord, NodeState, ServerType};

/// Nodes waiting to be provisioned that run the given server.
pub fn servers_to_provision(nodes: &[NodeRecord], server: ServerType) -> Vec<&NodeRecord> {
    nodes
        .iter()
        .filter(|n| n.state == NodeState::ToBeAdded && server.matches(n))
        .collect()
}

/// Nodes being decommissioned that run the given server.
pub fn servers_to_be_removed(nodes: &[NodeRecord], server: ServerType) -> Vec<&NodeRecord> {
    nodes
        .iter()
        .filter(|n| n.is_to_be_removed() && server.matches(n))
        .collect()
}

pub fn nodes_to_provision(nodes: &[NodeRecord]) -> Vec<&NodeRecord> {
    servers_to_provision(nodes, ServerType::Either)
}

pub fn nodes_to_be_removed(nodes: &[NodeRecord]) -> Vec<&NodeRecord> {
    servers_to_be_removed(nodes, ServerType::Either)
}

/// Number of nodes flagged as masters.
pub fn num_masters<'n>(nodes: impl IntoIterator<Item = &'n NodeRecord>) -> usize {
    nodes.into_iter().filter(|n| n.is_master).count()
}

/// Drop the node with the given name. Returns whether a node was removed.
pub fn remove_node_by_name(nodes: &mut Vec<NodeRecord>, name: &str) -> bool {
    match nodes.iter().position(|n| n.node_name == name) {
        Some(pos) => {
            nodes.remove(pos);
            true
        }
        None => false,
    }
}

/// Whether the named node exists and is in a state an operator may remove.
pub fn is_node_removable(nodes: &[NodeRecord], name: &str) -> bool {
    nodes
        .iter()
        .any(|n| n.node_name == name && n.state.is_removable())
}
