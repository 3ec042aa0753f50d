//! Master election across subnets.

use crate::error::{MeridianError, Result};
use crate::observability;
use crate::types::NodeRecord;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info};

/// Chooses which nodes carry a master process.
///
/// With at least `max_master_subnets` distinct subnets among the candidates,
/// masters are taken round-robin, one per subnet per round, lowest node name
/// first. With fewer subnets no spread is possible and the first eligible
/// candidates in iteration order are used.
#[derive(Debug, Clone)]
pub struct MasterElector {
    max_master_subnets: usize,
}

impl Default for MasterElector {
    fn default() -> Self {
        Self::new(3)
    }
}

impl MasterElector {
    pub fn new(max_master_subnets: usize) -> Self {
        Self { max_master_subnets }
    }

    /// Promote `count` non-master candidates and return their names in
    /// selection order.
    pub fn select_masters(
        &self,
        candidates: Vec<&mut NodeRecord>,
        count: usize,
    ) -> Result<Vec<String>> {
        let mut eligible: Vec<&mut NodeRecord> =
            candidates.into_iter().filter(|n| !n.is_master).collect();

        if eligible.len() < count {
            return Err(MeridianError::InsufficientCandidates {
                required: count,
                available: eligible.len(),
            });
        }
        if count == 0 {
            return Ok(Vec::new());
        }

        // Scoped to this election; consumed as masters are chosen.
        let mut by_subnet: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for node in &eligible {
            by_subnet
                .entry(node.subnet().to_string())
                .or_default()
                .insert(node.node_name.clone());
        }

        let chosen: Vec<String> = if by_subnet.len() >= self.max_master_subnets {
            debug!(subnets = by_subnet.len(), "Spreading masters across subnets");
            round_robin(by_subnet, count)
        } else {
            debug!(subnets = by_subnet.len(), "Too few subnets, masters not spread");
            eligible
                .iter()
                .take(count)
                .map(|n| n.node_name.clone())
                .collect()
        };

        let names: HashSet<&str> = chosen.iter().map(String::as_str).collect();
        for node in eligible.iter_mut() {
            if names.contains(node.node_name.as_str()) {
                node.is_master = true;
            }
        }

        info!(masters = ?chosen, "Selected masters");
        observability::record_masters_elected(chosen.len());
        Ok(chosen)
    }
}

fn round_robin(mut by_subnet: BTreeMap<String, BTreeSet<String>>, count: usize) -> Vec<String> {
    let mut chosen = Vec::with_capacity(count);
    while chosen.len() < count && !by_subnet.is_empty() {
        for names in by_subnet.values_mut() {
            if let Some(name) = names.pop_first() {
                chosen.push(name);
                if chosen.len() == count {
                    break;
                }
            }
        }
        by_subnet.retain(|_, names| !names.is_empty());
    }
    chosen
}
