//! Edit validation and replication-factor invariants.

use crate::error::{MeridianError, Result};
use crate::placement::is_same_placement;
use crate::types::Cluster;
use tracing::warn;

/// Replication factors a cluster may be planned with.
pub const SUPPORTED_REPLICATION_FACTORS: [u32; 4] = [1, 3, 5, 7];

/// Check the replication factor and its relation to the node count.
///
/// A node count of zero is accepted; it is only legal before creation and the
/// caller is responsible for not persisting it afterwards.
pub fn verify_nodes_and_rf(num_nodes: u32, replication_factor: u32) -> Result<()> {
    if !SUPPORTED_REPLICATION_FACTORS.contains(&replication_factor) {
        return Err(MeridianError::InvalidIntent(format!(
            "replication factor {} not allowed, must be one of {:?}",
            replication_factor, SUPPORTED_REPLICATION_FACTORS
        )));
    }
    if num_nodes > 0 && num_nodes < replication_factor {
        return Err(MeridianError::InvalidIntent(format!(
            "number of nodes {} cannot be less than the replication factor {}",
            num_nodes, replication_factor
        )));
    }
    Ok(())
}

/// Rejects edits that change nothing or change fields fixed at creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditValidator;

impl EditValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_edit(&self, old: &Cluster, new: &Cluster) -> Result<()> {
        let existing = &old.user_intent;
        let intent = &new.user_intent;

        if existing == intent
            && is_same_placement(old.placement_info.as_ref(), new.placement_info.as_ref())
        {
            warn!(cluster = %new.id, "Rejected edit with no changes");
            return Err(MeridianError::NoOpEdit);
        }

        let unsupported = if intent.replication_factor != existing.replication_factor {
            Some(format!(
                "cannot change replication factor from {} to {}",
                existing.replication_factor, intent.replication_factor
            ))
        } else if intent.universe_name != existing.universe_name {
            Some(format!(
                "cannot change universe name from {} to {}",
                existing.universe_name, intent.universe_name
            ))
        } else if intent.provider != existing.provider {
            Some(format!(
                "cannot change provider from {} to {}",
                existing.provider, intent.provider
            ))
        } else if intent.provider_type != existing.provider_type {
            Some(format!(
                "cannot change provider type from {:?} to {:?}",
                existing.provider_type, intent.provider_type
            ))
        } else {
            None
        };

        if let Some(reason) = unsupported {
            warn!(cluster = %new.id, %reason, "Rejected edit");
            return Err(MeridianError::UnsupportedChange(reason));
        }

        verify_nodes_and_rf(intent.num_nodes, intent.replication_factor)
    }
}
