//! Common test utilities for integration tests.

pub mod assertions;
pub mod cluster_sim;
pub mod fixtures;

// Re-export common types
pub use assertions::*;
pub use cluster_sim::*;
pub use fixtures::*;

/// Customer id used for every planned universe.
pub const CUSTOMER_ID: u64 = 1;

/// Node prefix the default planner config gives a universe named `name`.
pub fn prefix_for(name: &str) -> String {
    format!("mdn-{}-{}", CUSTOMER_ID, name)
}
