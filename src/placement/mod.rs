//! Placement tree: how many replicas a cluster keeps in each zone.
//!
//! A [`PlacementTree`] is an ordered cloud → region → zone hierarchy. Tree order
//! is significant: the reconcilers walk zones in tree order when they
//! round-robin new nodes or queue per-zone deltas.
//!
//! ```text
//! PlacementTree
//! └── PlacementCloud (provider)
//!     └── PlacementRegion
//!         └── PlacementZone { num_nodes_in_az, replication_factor, subnet, is_affinitized }
//! ```

pub mod generator;

pub use generator::PlacementGenerator;

use crate::catalog::{ProviderInfo, RegionInfo, ZoneInfo};
use crate::types::{NodeRecord, ProviderId, RegionId, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Root of the placement hierarchy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlacementTree {
    pub cloud_list: Vec<PlacementCloud>,
}

/// A provider in the placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementCloud {
    pub id: ProviderId,
    pub code: String,
    pub region_list: Vec<PlacementRegion>,
}

/// A region in the placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRegion {
    pub id: RegionId,
    pub code: String,
    pub name: String,
    pub az_list: Vec<PlacementZone>,
}

/// A zone in the placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementZone {
    pub id: ZoneId,
    pub name: String,
    /// Replication-factor contribution of this zone.
    pub replication_factor: u32,
    /// Target node count for this cluster.
    pub num_nodes_in_az: u32,
    pub subnet: String,
    /// Fault-domain anchor (affinitized leader zone).
    pub is_affinitized: bool,
}

/// Position of a zone within a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlacementIndex {
    pub cloud: usize,
    pub region: usize,
    pub zone: usize,
}

impl PlacementTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud_list.is_empty()
    }

    /// All zones, in tree order.
    pub fn zones(&self) -> impl Iterator<Item = &PlacementZone> {
        self.cloud_list
            .iter()
            .flat_map(|c| c.region_list.iter())
            .flat_map(|r| r.az_list.iter())
    }

    pub fn zones_mut(&mut self) -> impl Iterator<Item = &mut PlacementZone> {
        self.cloud_list
            .iter_mut()
            .flat_map(|c| c.region_list.iter_mut())
            .flat_map(|r| r.az_list.iter_mut())
    }

    /// Positions of all zones, in tree order.
    pub fn indexes(&self) -> Vec<PlacementIndex> {
        let mut indexes = Vec::new();
        for (c, cloud) in self.cloud_list.iter().enumerate() {
            for (r, region) in cloud.region_list.iter().enumerate() {
                for z in 0..region.az_list.len() {
                    indexes.push(PlacementIndex {
                        cloud: c,
                        region: r,
                        zone: z,
                    });
                }
            }
        }
        indexes
    }

    pub fn index_of(&self, zone_id: ZoneId) -> Option<PlacementIndex> {
        self.indexes()
            .into_iter()
            .find(|idx| self.zone_at(*idx).map(|z| z.id) == Some(zone_id))
    }

    pub fn cloud_at(&self, index: PlacementIndex) -> Option<&PlacementCloud> {
        self.cloud_list.get(index.cloud)
    }

    pub fn region_at(&self, index: PlacementIndex) -> Option<&PlacementRegion> {
        self.cloud_at(index)?.region_list.get(index.region)
    }

    pub fn zone_at(&self, index: PlacementIndex) -> Option<&PlacementZone> {
        self.region_at(index)?.az_list.get(index.zone)
    }

    pub fn zone_at_mut(&mut self, index: PlacementIndex) -> Option<&mut PlacementZone> {
        self.cloud_list
            .get_mut(index.cloud)?
            .region_list
            .get_mut(index.region)?
            .az_list
            .get_mut(index.zone)
    }

    pub fn find_zone(&self, zone_id: ZoneId) -> Option<&PlacementZone> {
        self.zones().find(|z| z.id == zone_id)
    }

    /// Sum of target node counts across zones.
    pub fn node_count(&self) -> u32 {
        self.zones().map(|z| z.num_nodes_in_az).sum()
    }

    /// Sum of replication-factor contributions across zones.
    pub fn replication_factor_sum(&self) -> u32 {
        self.zones().map(|z| z.replication_factor).sum()
    }

    /// Target node count per zone.
    pub fn zone_node_counts(&self) -> HashMap<ZoneId, u32> {
        self.zones().map(|z| (z.id, z.num_nodes_in_az)).collect()
    }

    /// Find or create the zone entry, creating the cloud and region branches
    /// along the way.
    pub fn entry_zone(
        &mut self,
        provider: &ProviderInfo,
        region: &RegionInfo,
        zone: &ZoneInfo,
    ) -> &mut PlacementZone {
        let c = match self.cloud_list.iter().position(|c| c.id == provider.id) {
            Some(c) => c,
            None => {
                self.cloud_list.push(PlacementCloud {
                    id: provider.id,
                    code: provider.code.clone(),
                    region_list: Vec::new(),
                });
                self.cloud_list.len() - 1
            }
        };
        let cloud = &mut self.cloud_list[c];

        let r = match cloud.region_list.iter().position(|r| r.id == region.id) {
            Some(r) => r,
            None => {
                cloud.region_list.push(PlacementRegion {
                    id: region.id,
                    code: region.code.clone(),
                    name: region.name.clone(),
                    az_list: Vec::new(),
                });
                cloud.region_list.len() - 1
            }
        };
        let placement_region = &mut cloud.region_list[r];

        let z = match placement_region.az_list.iter().position(|z| z.id == zone.id) {
            Some(z) => z,
            None => {
                placement_region.az_list.push(PlacementZone {
                    id: zone.id,
                    name: zone.name.clone(),
                    replication_factor: 0,
                    num_nodes_in_az: 0,
                    subnet: zone.subnet.clone(),
                    is_affinitized: true,
                });
                placement_region.az_list.len() - 1
            }
        };
        &mut placement_region.az_list[z]
    }

    /// Drop regions without zones and clouds without regions.
    pub fn prune(&mut self) {
        for cloud in &mut self.cloud_list {
            cloud.region_list.retain(|r| !r.az_list.is_empty());
        }
        self.cloud_list.retain(|c| !c.region_list.is_empty());
    }

    /// True when no cloud or region branch is empty.
    pub fn is_pruned(&self) -> bool {
        self.cloud_list.iter().all(|c| {
            !c.region_list.is_empty() && c.region_list.iter().all(|r| !r.az_list.is_empty())
        })
    }
}

/// Node count per zone across the given nodes, ignoring nodes already on
/// their way out.
pub fn node_counts_by_zone<'a>(
    nodes: impl IntoIterator<Item = &'a NodeRecord>,
) -> HashMap<ZoneId, u32> {
    let mut counts = HashMap::new();
    for node in nodes.into_iter().filter(|n| !n.is_to_be_removed()) {
        *counts.entry(node.zone_id).or_insert(0) += 1;
    }
    counts
}

/// Recompute per-zone counts from the realized node distribution.
///
/// Zones that end up with no nodes are dropped and empty branches pruned.
pub fn update_placement_info<'a>(
    nodes: impl IntoIterator<Item = &'a NodeRecord>,
    tree: &mut PlacementTree,
) {
    let counts = node_counts_by_zone(nodes);
    for cloud in &mut tree.cloud_list {
        for region in &mut cloud.region_list {
            region.az_list.retain_mut(|az| match counts.get(&az.id) {
                Some(&count) => {
                    az.num_nodes_in_az = count;
                    true
                }
                None => false,
            });
        }
    }
    tree.prune();
}

/// Whether two placements hold the same zones with the same counts and
/// anchor flags.
pub fn is_same_placement(old: Option<&PlacementTree>, new: Option<&PlacementTree>) -> bool {
    let (old, new) = match (old, new) {
        (None, None) => return true,
        (Some(old), Some(new)) => (old, new),
        _ => return false,
    };

    let old_zones: HashMap<ZoneId, (bool, u32)> = old
        .zones()
        .map(|z| (z.id, (z.is_affinitized, z.num_nodes_in_az)))
        .collect();
    let new_count = new.zones().count();

    new_count == old_zones.len()
        && new.zones().all(|z| {
            old_zones.get(&z.id) == Some(&(z.is_affinitized, z.num_nodes_in_az))
        })
}

/// Whether only the anchor (affinitized leader) flags changed.
///
/// Returns false as soon as the new placement holds a zone the old one does
/// not, since that is a layout change rather than a flag change.
pub fn did_affinitized_leaders_change(old: &PlacementTree, new: &PlacementTree) -> bool {
    let old_zones: HashMap<ZoneId, bool> = old.zones().map(|z| (z.id, z.is_affinitized)).collect();

    for zone in new.zones() {
        match old_zones.get(&zone.id) {
            None => return false,
            Some(&affinitized) if affinitized != zone.is_affinitized => return true,
            Some(_) => {}
        }
    }
    false
}
