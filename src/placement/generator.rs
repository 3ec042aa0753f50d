//! Placement generator: choose zones for a fresh placement.

use super::PlacementTree;
use crate::catalog::{TopologyCatalog, ZoneInfo};
use crate::cluster::validator::verify_nodes_and_rf;
use crate::error::{MeridianError, Result};
use crate::types::{RegionId, UserIntent};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

/// Number of zones a multi-zone placement spreads its replicas over.
const DIVERSITY_ZONES: usize = 3;

/// Generates initial placement trees from an intent.
///
/// Zone choice within a region is random; the randomness source is supplied
/// per call so that planning can be reproduced with a seeded generator.
pub struct PlacementGenerator<'a> {
    catalog: &'a dyn TopologyCatalog,
}

impl<'a> PlacementGenerator<'a> {
    pub fn new(catalog: &'a dyn TopologyCatalog) -> Self {
        Self { catalog }
    }

    /// Build a placement tree for the intent.
    ///
    /// The replication-factor contributions of the returned tree always sum to
    /// the intent's replication factor. Node counts are the replica slots only;
    /// distributing the full `num_nodes` is the reconciler's job.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        intent: &UserIntent,
        rng: &mut R,
    ) -> Result<PlacementTree> {
        if intent.region_list.is_empty() {
            return Err(MeridianError::InfeasibleIntent(
                "no regions in intent".to_string(),
            ));
        }
        verify_nodes_and_rf(intent.num_nodes, intent.replication_factor)?;

        if let Some(preferred) = intent.preferred_region {
            if !intent.region_list.contains(&preferred) {
                return Err(MeridianError::InvalidIntent(format!(
                    "preferred region {} not in region list",
                    preferred
                )));
            }
        }

        let regions: Vec<(RegionId, Vec<ZoneInfo>)> = intent
            .region_list
            .iter()
            .map(|&r| (r, self.catalog.zones_in_region(r)))
            .collect();

        let rf = intent.replication_factor as usize;
        let mut tree = PlacementTree::new();

        if !is_multi_az(&regions) || rf == 1 {
            let region = intent.preferred_region.unwrap_or(regions[0].0);
            let zones = self.select_zones(region, 1, rng)?;
            info!(zone = %zones[0].id, "Using single-zone placement");
            self.distribute(&mut tree, &zones, rf, rf)?;
            return Ok(tree);
        }

        let all_zones: Vec<ZoneInfo> = regions.iter().flat_map(|(_, z)| z.clone()).collect();
        if all_zones.is_empty() {
            return Err(MeridianError::InfeasibleIntent(format!(
                "no zones in any of {} regions",
                regions.len()
            )));
        }
        if all_zones.len() <= 2 {
            debug!(zones = all_zones.len(), "Round-robin over all candidate zones");
            self.distribute(&mut tree, &all_zones, rf, intent.num_nodes as usize)?;
            return Ok(tree);
        }

        let chosen = match regions.len() {
            1 => self.select_zones(regions[0].0, DIVERSITY_ZONES, rng)?,
            2 => {
                let preferred = intent.preferred_region.unwrap_or_else(|| {
                    if regions[0].1.len() >= 2 {
                        regions[0].0
                    } else {
                        regions[1].0
                    }
                });
                let other = if regions[0].0 == preferred {
                    regions[1].0
                } else {
                    regions[0].0
                };
                let mut zones = self.select_zones(preferred, 2, rng)?;
                zones.extend(self.select_zones(other, 1, rng)?);
                zones
            }
            3 => {
                let mut zones = Vec::with_capacity(DIVERSITY_ZONES);
                for (region, _) in &regions {
                    zones.extend(self.select_zones(*region, 1, rng)?);
                }
                zones
            }
            n => {
                return Err(MeridianError::InfeasibleIntent(format!(
                    "unsupported placement, {} regions is more than replication factor {} allows",
                    n, intent.replication_factor
                )));
            }
        };

        self.distribute(&mut tree, &chosen, rf, rf)?;
        Ok(tree)
    }

    /// Pick `count` distinct zones of a region uniformly at random.
    fn select_zones<R: Rng + ?Sized>(
        &self,
        region: RegionId,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<ZoneInfo>> {
        let mut zones = self.catalog.zones_in_region(region);
        if zones.len() < count {
            let name = self
                .catalog
                .region(region)
                .map(|r| r.name)
                .unwrap_or_else(|| region.to_string());
            return Err(MeridianError::InfeasibleIntent(format!(
                "need at least {} zones but found only {} for region {}",
                count,
                zones.len(),
                name
            )));
        }
        zones.shuffle(rng);
        zones.truncate(count);
        debug!(%region, count, "Selected zones");
        Ok(zones)
    }

    /// Round-robin `replicas` RF units and `nodes` node slots over `zones`.
    fn distribute(
        &self,
        tree: &mut PlacementTree,
        zones: &[ZoneInfo],
        replicas: usize,
        nodes: usize,
    ) -> Result<()> {
        if zones.is_empty() {
            return Err(MeridianError::InfeasibleIntent(
                "no zones to place replicas in".to_string(),
            ));
        }
        for i in 0..replicas.max(nodes) {
            let zone = &zones[i % zones.len()];
            let region = self.catalog.require_region(zone.region_id)?;
            let provider = self.catalog.require_provider(region.provider_id)?;

            let entry = tree.entry_zone(&provider, &region, zone);
            if i < replicas {
                entry.replication_factor += 1;
            }
            if i < nodes {
                entry.num_nodes_in_az += 1;
            }
        }
        Ok(())
    }
}

/// A region list is multi-zone unless it is one region with at most one zone.
fn is_multi_az(regions: &[(RegionId, Vec<ZoneInfo>)]) -> bool {
    regions.len() > 1 || regions.first().map(|(_, z)| z.len() > 1).unwrap_or(false)
}
