// Plan checks shared by the integration tests

use meridian::placement::PlacementTree;
use meridian::types::{ClusterId, NodeRecord, NodeState, ZoneId};
use std::collections::{HashMap, HashSet};

/// Outcome of one plan check, panicking with the mismatch on `assert`.
#[derive(Debug)]
pub struct AssertionResult {
    check: &'static str,
    mismatch: Option<(String, String)>,
}

impl AssertionResult {
    pub fn pass(check: &'static str) -> Self {
        Self {
            check,
            mismatch: None,
        }
    }

    pub fn fail(check: &'static str, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            check,
            mismatch: Some((expected.into(), actual.into())),
        }
    }

    pub fn assert(self) {
        if let Some((expected, actual)) = self.mismatch {
            panic!("{} failed\n  expected: {}\n  actual: {}", self.check, expected, actual);
        }
    }
}

/// Replication-factor contributions sum to `rf`
pub fn check_rf_sum(tree: &PlacementTree, rf: u32) -> AssertionResult {
    let sum = tree.replication_factor_sum();
    if sum == rf {
        AssertionResult::pass("rf sum")
    } else {
        AssertionResult::fail("rf sum", rf.to_string(), sum.to_string())
    }
}

/// No empty cloud or region branch
pub fn check_pruned(tree: &PlacementTree) -> AssertionResult {
    if tree.is_pruned() {
        AssertionResult::pass("pruned placement")
    } else {
        AssertionResult::fail("pruned placement", "no empty branches", format!("{:?}", tree))
    }
}

/// No two nodes of the cluster share a name
pub fn check_unique_names(nodes: &[NodeRecord], cluster: ClusterId) -> AssertionResult {
    let mut seen = HashSet::new();
    for node in nodes.iter().filter(|n| n.is_in_cluster(cluster)) {
        if !seen.insert(node.node_name.as_str()) {
            return AssertionResult::fail("unique node names", "distinct names", node.node_name.clone());
        }
    }
    AssertionResult::pass("unique node names")
}

/// Placement counts match the cluster's live nodes
pub fn check_placement_matches_nodes(
    tree: &PlacementTree,
    nodes: &[NodeRecord],
    cluster: ClusterId,
) -> AssertionResult {
    let live = live_counts(nodes, cluster);
    let placed: HashMap<ZoneId, u32> = tree.zone_node_counts();
    if live == placed {
        AssertionResult::pass("placement matches nodes")
    } else {
        AssertionResult::fail("placement matches nodes", format!("{:?}", live), format!("{:?}", placed))
    }
}

/// Live node count per zone for a cluster.
pub fn live_counts(nodes: &[NodeRecord], cluster: ClusterId) -> HashMap<ZoneId, u32> {
    let mut counts = HashMap::new();
    for node in nodes
        .iter()
        .filter(|n| n.is_in_cluster(cluster) && !n.is_to_be_removed())
    {
        *counts.entry(node.zone_id).or_insert(0) += 1;
    }
    counts
}

pub fn count_in_state(nodes: &[NodeRecord], state: NodeState) -> usize {
    nodes.iter().filter(|n| n.state == state).count()
}

/// Sorted node counts of a placement, for layout comparisons.
pub fn sorted_counts(tree: &PlacementTree) -> Vec<u32> {
    let mut counts: Vec<u32> = tree.zones().map(|z| z.num_nodes_in_az).collect();
    counts.sort_unstable();
    counts
}
