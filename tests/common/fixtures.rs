// Test fixtures for integration tests

use meridian::catalog::{InMemoryCatalog, TopologyCatalog};
use meridian::config::PlannerConfig;
use meridian::planner::UniversePlanner;
use meridian::types::{CloudType, ProviderId, RegionId, UserIntent, ZoneId};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Catalog builder for a single provider.
pub struct TopologyFixture {
    pub catalog: InMemoryCatalog,
    pub provider: ProviderId,
    pub cloud_type: CloudType,
    pub regions: Vec<RegionId>,
}

impl TopologyFixture {
    pub fn new(cloud_type: CloudType) -> Self {
        let mut catalog = InMemoryCatalog::new();
        let provider = catalog.add_provider("test-cloud", cloud_type);
        Self {
            catalog,
            provider,
            cloud_type,
            regions: Vec::new(),
        }
    }

    pub fn aws() -> Self {
        Self::new(CloudType::Aws)
    }

    pub fn on_prem() -> Self {
        Self::new(CloudType::OnPrem)
    }

    /// Add a region with `zones` zones, each on its own subnet.
    pub fn with_region(mut self, code: &str, zones: usize) -> Self {
        let region = self.catalog.add_region(self.provider, code);
        for i in 0..zones {
            self.catalog.add_zone(
                region,
                format!("{}-{}", code, (b'a' + i as u8) as char),
                format!("{}-subnet-{}", code, i),
            );
        }
        self.regions.push(region);
        self
    }

    /// Zones of the region at `region`, in catalog order.
    pub fn zones(&self, region: usize) -> Vec<ZoneId> {
        self.catalog
            .zones_in_region(self.regions[region])
            .into_iter()
            .map(|z| z.id)
            .collect()
    }

    /// Set the same inventory for every zone of every region.
    pub fn with_inventory(mut self, instance_type: &str, count: usize) -> Self {
        for region in self.regions.clone() {
            for zone in self.catalog.zones_in_region(region) {
                self.catalog.set_inventory(zone.id, instance_type, count);
            }
        }
        self
    }

    /// Intent over every region of the fixture.
    pub fn intent(&self, name: &str, replication_factor: u32, num_nodes: u32) -> UserIntent {
        UserIntent::new(name, self.provider, self.cloud_type, replication_factor, num_nodes)
            .with_regions(self.regions.clone())
    }

    /// Deterministic planner backed by this fixture's catalog and inventory.
    pub fn planner(&self, seed: u64) -> UniversePlanner<'_, StdRng> {
        UniversePlanner::new(
            &self.catalog,
            &self.catalog,
            PlannerConfig::default(),
            StdRng::seed_from_u64(seed),
        )
    }
}
