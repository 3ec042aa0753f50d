//! Core type definitions for the Meridian topology planner.
//!
//! This module contains the data types the planner reads and writes: the
//! operator's [`UserIntent`], the [`Cluster`] it applies to, the working set of
//! [`NodeRecord`]s and the persisted [`Universe`] snapshot an edit starts from.
//!
//! # Type Aliases
//!
//! Catalog and record identifiers are UUIDs, aliased for clarity:
//!
//! - [`ZoneId`], [`RegionId`], [`ProviderId`]: topology catalog entries
//! - [`ClusterId`], [`UniverseId`]: persisted records
//!
//! # Example
//!
//! ```rust
//! use meridian::types::{CloudType, Cluster, ClusterType, UserIntent};
//! use uuid::Uuid;
//!
//! let intent = UserIntent::new("orders", Uuid::new_v4(), CloudType::Aws, 3, 3)
//!     .with_regions(vec![Uuid::new_v4()]);
//! let cluster = Cluster::primary(intent);
//! assert_eq!(cluster.cluster_type, ClusterType::Primary);
//! assert!(cluster.placement_info.is_none());
//! ```

use crate::placement::PlacementTree;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an availability zone.
pub type ZoneId = Uuid;

/// Unique identifier for a region.
pub type RegionId = Uuid;

/// Unique identifier for a cloud provider.
pub type ProviderId = Uuid;

/// Unique identifier for a cluster (the node's placement).
pub type ClusterId = Uuid;

/// Unique identifier for a universe.
pub type UniverseId = Uuid;

/// Cloud type of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudType {
    Aws,
    Gcp,
    Azure,
    Docker,
    Kubernetes,
    OnPrem,
}

impl CloudType {
    pub fn is_on_prem(&self) -> bool {
        matches!(self, CloudType::OnPrem)
    }
}

/// Cluster type within a universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterType {
    /// The read/write cluster. Exactly one per universe.
    Primary,
    /// Replica-only cluster.
    ReadOnly,
}

/// Lifecycle state of a node.
///
/// The planner only writes `ToBeAdded` and `ToBeRemoved`; the remaining
/// transitions belong to provisioning and liveness tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    ToBeAdded,
    Provisioned,
    SoftwareInstalled,
    Running,
    ToBeRemoved,
    Removing,
    Unreachable,
}

impl NodeState {
    /// Active nodes count towards the cluster's live capacity.
    pub fn is_active(&self) -> bool {
        !matches!(
            self,
            NodeState::ToBeRemoved | NodeState::Removing | NodeState::Unreachable
        )
    }

    /// Nodes with software installed report liveness signals.
    pub fn is_queryable(&self) -> bool {
        matches!(
            self,
            NodeState::SoftwareInstalled | NodeState::Running | NodeState::ToBeRemoved
        )
    }

    /// Nodes that an operator may remove directly.
    pub fn is_removable(&self) -> bool {
        matches!(self, NodeState::Running | NodeState::Unreachable)
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Server role filter for node-set queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerType {
    Master,
    Tserver,
    Either,
}

impl ServerType {
    pub fn matches(&self, node: &NodeRecord) -> bool {
        match self {
            ServerType::Master => node.is_master,
            ServerType::Tserver => node.is_tserver,
            ServerType::Either => true,
        }
    }
}

/// Operator intent for one cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIntent {
    /// Universe (cluster) name.
    pub universe_name: String,
    /// Provider the nodes are placed on.
    pub provider: ProviderId,
    /// Cloud type of the provider.
    pub provider_type: CloudType,
    /// Number of copies of metadata. One of 1, 3, 5, 7.
    pub replication_factor: u32,
    /// Total number of nodes. Zero only before creation.
    pub num_nodes: u32,
    /// Candidate regions, in operator order.
    pub region_list: Vec<RegionId>,
    /// Region that receives two zones in a two-region layout.
    #[serde(default)]
    pub preferred_region: Option<RegionId>,
    pub instance_type: String,
    #[serde(default)]
    pub assign_public_ip: bool,
    #[serde(default)]
    pub use_time_sync: bool,
    #[serde(default)]
    pub spot_price: f64,
}

impl UserIntent {
    pub fn new(
        universe_name: impl Into<String>,
        provider: ProviderId,
        provider_type: CloudType,
        replication_factor: u32,
        num_nodes: u32,
    ) -> Self {
        Self {
            universe_name: universe_name.into(),
            provider,
            provider_type,
            replication_factor,
            num_nodes,
            region_list: Vec::new(),
            preferred_region: None,
            instance_type: "c5.large".to_string(),
            assign_public_ip: true,
            use_time_sync: false,
            spot_price: 0.0,
        }
    }

    pub fn with_regions(mut self, regions: Vec<RegionId>) -> Self {
        self.region_list = regions;
        self
    }

    pub fn with_preferred_region(mut self, region: RegionId) -> Self {
        self.preferred_region = Some(region);
        self
    }

    pub fn with_instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = instance_type.into();
        self
    }
}

/// Cloud-specific connection info for a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CloudInfo {
    /// Provider code.
    pub cloud: String,
    /// Region code.
    pub region: String,
    /// Zone name.
    pub az: String,
    pub subnet_id: String,
    pub instance_type: String,
    pub assign_public_ip: bool,
    pub use_time_sync: bool,
    pub spot_price: f64,
    #[serde(default)]
    pub private_ip: Option<String>,
}

/// A node in a universe's working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_name: String,
    /// Monotonic index used for naming.
    pub node_idx: u32,
    /// Owning cluster.
    pub cluster_id: ClusterId,
    pub zone_id: ZoneId,
    pub cloud_info: CloudInfo,
    pub is_master: bool,
    pub is_tserver: bool,
    pub state: NodeState,
}

impl NodeRecord {
    pub fn subnet(&self) -> &str {
        &self.cloud_info.subnet_id
    }

    pub fn is_in_cluster(&self, cluster_id: ClusterId) -> bool {
        self.cluster_id == cluster_id
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_to_be_removed(&self) -> bool {
        self.state == NodeState::ToBeRemoved
    }

    /// Active node running only a tserver, the only kind a zone can shrink through.
    pub fn is_active_tserver_only(&self) -> bool {
        self.is_active() && self.is_tserver && !self.is_master
    }
}

/// A cluster within a universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub cluster_type: ClusterType,
    pub user_intent: UserIntent,
    /// `None` until planned.
    #[serde(default)]
    pub placement_info: Option<PlacementTree>,
    /// Naming ordinal, assigned once for read-only clusters.
    #[serde(default)]
    pub index: u32,
}

impl Cluster {
    pub fn primary(user_intent: UserIntent) -> Self {
        Self {
            id: Uuid::new_v4(),
            cluster_type: ClusterType::Primary,
            user_intent,
            placement_info: None,
            index: 0,
        }
    }

    pub fn read_only(user_intent: UserIntent) -> Self {
        Self {
            id: Uuid::new_v4(),
            cluster_type: ClusterType::ReadOnly,
            user_intent,
            placement_info: None,
            index: 0,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.cluster_type == ClusterType::Primary
    }
}

fn default_next_cluster_index() -> u32 {
    1
}

/// The full definition of a universe: its clusters and working node set.
///
/// This is both the request a caller hands to the planner and the shape it
/// persists afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseDefinition {
    #[serde(default)]
    pub universe_id: Option<UniverseId>,
    #[serde(default)]
    pub node_prefix: String,
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Next ordinal handed to a new read-only cluster.
    #[serde(default = "default_next_cluster_index")]
    pub next_cluster_index: u32,
    /// The operator authored the zone placement by hand.
    #[serde(default)]
    pub user_az_selected: bool,
}

impl UniverseDefinition {
    pub fn new(clusters: Vec<Cluster>) -> Self {
        Self {
            universe_id: None,
            node_prefix: String::new(),
            clusters,
            nodes: Vec::new(),
            next_cluster_index: default_next_cluster_index(),
            user_az_selected: false,
        }
    }

    pub fn primary_cluster(&self) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.is_primary())
    }

    pub fn read_only_clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(|c| !c.is_primary())
    }

    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    pub fn cluster_mut(&mut self, id: ClusterId) -> Option<&mut Cluster> {
        self.clusters.iter_mut().find(|c| c.id == id)
    }

    pub fn nodes_in_cluster(&self, id: ClusterId) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.iter().filter(move |n| n.is_in_cluster(id))
    }
}

/// A persisted universe snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub universe_id: UniverseId,
    pub details: UniverseDefinition,
}

impl Universe {
    pub fn new(universe_id: UniverseId, mut details: UniverseDefinition) -> Self {
        details.universe_id = Some(universe_id);
        Self {
            universe_id,
            details,
        }
    }

    pub fn nodes(&self) -> &[NodeRecord] {
        &self.details.nodes
    }

    pub fn nodes_in_cluster(&self, id: ClusterId) -> impl Iterator<Item = &NodeRecord> {
        self.details.nodes_in_cluster(id)
    }

    pub fn primary_cluster(&self) -> Option<&Cluster> {
        self.details.primary_cluster()
    }
}
