//! Meridian - A topology planner for distributed database universes.
//!
//! Meridian decides how many server processes a universe runs in which
//! cloud, region and availability zone, which of them hold the metadata
//! (master) role, and which node adds and removes move a universe from its
//! current topology to a newly requested one.
//!
//! # Features
//!
//! - **Placement Generation**: Fault-domain-diverse zone selection from an intent.
//! - **Mode Selection**: Classifies a request as a fresh layout, a per-zone delta,
//!   a total-count resize or a full move.
//! - **Node Reconciliation**: Concrete `ToBeAdded` / `ToBeRemoved` node actions.
//! - **Master Election**: Subnet-spread master selection.
//! - **Edit Validation**: Rejects no-op edits and changes to immutable fields.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        UniversePlanner                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Edit Validator  →  Mode Selector  →  Placement Generator   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Node Reconciler: base | delta | user intent | manual       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Master Elector                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Topology Catalog | On-prem Inventory                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use meridian::catalog::InMemoryCatalog;
//! use meridian::config::MeridianConfig;
//! use meridian::planner::UniversePlanner;
//! use meridian::types::UniverseDefinition;
//! use std::path::Path;
//!
//! fn main() -> meridian::Result<()> {
//!     let config = MeridianConfig::development();
//!     let catalog = InMemoryCatalog::from_file(Path::new("catalog.json"))?;
//!     let mut definition: UniverseDefinition =
//!         serde_json::from_str(&std::fs::read_to_string("universe.json")?)?;
//!     let cluster_id = definition.clusters[0].id;
//!
//!     let mut planner = UniversePlanner::from_config(&catalog, &catalog, config.planner);
//!     let outcome = planner.configure(&mut definition, None, 1, cluster_id)?;
//!     println!("{} nodes to add", outcome.summary.added.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

pub mod catalog;
pub mod cluster;
pub mod liveness;
pub mod placement;
pub mod planner;

pub mod cli;
pub mod observability;

// Re-exports
pub use error::{MeridianError, Result};
pub use planner::{PlanOutcome, UniversePlanner};
pub use types::*;
