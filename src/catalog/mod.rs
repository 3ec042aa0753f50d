//! Topology catalog and on-prem inventory collaborators.
//!
//! The planner never owns catalog data. It resolves zone, region and provider
//! identities through [`TopologyCatalog`] and asks [`InstanceInventory`] how many
//! physical machines an on-prem zone has left for an instance type. Both are
//! treated as pure lookups for the duration of a planning call.

mod memory;

pub use memory::InMemoryCatalog;

use crate::error::{MeridianError, Result};
use crate::types::{CloudType, ProviderId, RegionId, ZoneId};
use serde::{Deserialize, Serialize};

/// Static metadata for an availability zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneInfo {
    pub id: ZoneId,
    pub region_id: RegionId,
    pub name: String,
    /// Network subnet, the fault-domain unit for master election.
    pub subnet: String,
}

/// Static metadata for a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    pub id: RegionId,
    pub provider_id: ProviderId,
    pub code: String,
    pub name: String,
}

/// Static metadata for a cloud provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: ProviderId,
    pub code: String,
    pub cloud_type: CloudType,
}

/// Read-only lookup of zones, regions and providers.
pub trait TopologyCatalog {
    fn zone(&self, id: ZoneId) -> Option<ZoneInfo>;

    fn region(&self, id: RegionId) -> Option<RegionInfo>;

    fn provider(&self, id: ProviderId) -> Option<ProviderInfo>;

    /// Zones of a region, in catalog order.
    fn zones_in_region(&self, region: RegionId) -> Vec<ZoneInfo>;

    fn require_zone(&self, id: ZoneId) -> Result<ZoneInfo> {
        self.zone(id)
            .ok_or_else(|| MeridianError::NotFound(format!("zone {}", id)))
    }

    fn require_region(&self, id: RegionId) -> Result<RegionInfo> {
        self.region(id)
            .ok_or_else(|| MeridianError::NotFound(format!("region {}", id)))
    }

    fn require_provider(&self, id: ProviderId) -> Result<ProviderInfo> {
        self.provider(id)
            .ok_or_else(|| MeridianError::NotFound(format!("provider {}", id)))
    }

    /// Resolve the provider owning a zone.
    fn provider_of_zone(&self, id: ZoneId) -> Result<ProviderInfo> {
        let zone = self.require_zone(id)?;
        let region = self.require_region(zone.region_id)?;
        self.require_provider(region.provider_id)
    }
}

/// On-prem machine inventory.
pub trait InstanceInventory {
    /// Number of machines of `instance_type` available in `zone`.
    fn available_instances(&self, zone: ZoneId, instance_type: &str) -> usize;
}

/// Inventory for cloud providers, where capacity is not a planning concern.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnboundedInventory;

impl InstanceInventory for UnboundedInventory {
    fn available_instances(&self, _zone: ZoneId, _instance_type: &str) -> usize {
        usize::MAX
    }
}
