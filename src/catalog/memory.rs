//! In-memory catalog, loadable from JSON.

use super::{InstanceInventory, ProviderInfo, RegionInfo, TopologyCatalog, ZoneInfo};
use crate::error::{MeridianError, Result};
use crate::types::{CloudType, ProviderId, RegionId, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

/// On-prem inventory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub zone: ZoneId,
    pub instance_type: String,
    pub count: usize,
}

/// Catalog held entirely in memory.
///
/// Zones keep insertion order so that `zones_in_region` is stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryCatalog {
    #[serde(default)]
    providers: Vec<ProviderInfo>,
    #[serde(default)]
    regions: Vec<RegionInfo>,
    #[serde(default)]
    zones: Vec<ZoneInfo>,
    #[serde(default)]
    inventory: Vec<InventoryEntry>,
    #[serde(skip)]
    inventory_index: HashMap<(ZoneId, String), usize>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MeridianError::Config(format!("Failed to read catalog file: {}", e))
        })?;
        let mut catalog: Self = serde_json::from_str(&content)?;
        catalog.reindex();
        Ok(catalog)
    }

    fn reindex(&mut self) {
        self.inventory_index = self
            .inventory
            .iter()
            .map(|e| ((e.zone, e.instance_type.clone()), e.count))
            .collect();
    }

    pub fn add_provider(&mut self, code: impl Into<String>, cloud_type: CloudType) -> ProviderId {
        let id = Uuid::new_v4();
        self.providers.push(ProviderInfo {
            id,
            code: code.into(),
            cloud_type,
        });
        id
    }

    pub fn add_region(&mut self, provider_id: ProviderId, code: impl Into<String>) -> RegionId {
        let id = Uuid::new_v4();
        let code = code.into();
        self.regions.push(RegionInfo {
            id,
            provider_id,
            name: code.clone(),
            code,
        });
        id
    }

    pub fn add_zone(
        &mut self,
        region_id: RegionId,
        name: impl Into<String>,
        subnet: impl Into<String>,
    ) -> ZoneId {
        let id = Uuid::new_v4();
        self.zones.push(ZoneInfo {
            id,
            region_id,
            name: name.into(),
            subnet: subnet.into(),
        });
        id
    }

    /// Set the on-prem inventory for a zone and instance type.
    pub fn set_inventory(&mut self, zone: ZoneId, instance_type: impl Into<String>, count: usize) {
        let instance_type = instance_type.into();
        match self
            .inventory
            .iter_mut()
            .find(|e| e.zone == zone && e.instance_type == instance_type)
        {
            Some(entry) => entry.count = count,
            None => self.inventory.push(InventoryEntry {
                zone,
                instance_type: instance_type.clone(),
                count,
            }),
        }
        self.inventory_index.insert((zone, instance_type), count);
    }
}

impl TopologyCatalog for InMemoryCatalog {
    fn zone(&self, id: ZoneId) -> Option<ZoneInfo> {
        self.zones.iter().find(|z| z.id == id).cloned()
    }

    fn region(&self, id: RegionId) -> Option<RegionInfo> {
        self.regions.iter().find(|r| r.id == id).cloned()
    }

    fn provider(&self, id: ProviderId) -> Option<ProviderInfo> {
        self.providers.iter().find(|p| p.id == id).cloned()
    }

    fn zones_in_region(&self, region: RegionId) -> Vec<ZoneInfo> {
        self.zones
            .iter()
            .filter(|z| z.region_id == region)
            .cloned()
            .collect()
    }
}

impl InstanceInventory for InMemoryCatalog {
    fn available_instances(&self, zone: ZoneId, instance_type: &str) -> usize {
        self.inventory_index
            .get(&(zone, instance_type.to_string()))
            .copied()
            .unwrap_or(0)
    }
}
