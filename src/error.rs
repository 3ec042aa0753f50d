//! Error types for the Meridian topology planner.
//!
//! This module provides a unified error type [`MeridianError`] for all planning
//! operations, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! - **Intent**: the requested configuration is invalid or cannot be satisfied
//!   by the available zones and regions
//! - **Edit**: an edit changed nothing, or changed a field that cannot be edited
//! - **Capacity**: on-prem inventory or master candidates fall short
//! - **Invariant**: the planner reached a state its own preconditions rule out
//! - **Configuration / IO**: loading and validating planner configuration
//!
//! # Example
//!
//! ```rust
//! use meridian::error::{MeridianError, Result};
//!
//! fn check_rf(rf: u32) -> Result<()> {
//!     if rf % 2 == 0 {
//!         return Err(MeridianError::InvalidIntent(format!("even replication factor {}", rf)));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_rf(2).unwrap_err();
//! assert!(err.is_caller_fixable());
//! assert_eq!(err.kind(), "invalid_intent");
//! ```

use crate::types::ZoneId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use thiserror::Error;

/// Main error type for planning operations.
#[derive(Error, Debug)]
pub enum MeridianError {
    // Intent errors
    #[error("Invalid intent: {0}")]
    InvalidIntent(String),

    #[error("Infeasible intent: {0}")]
    InfeasibleIntent(String),

    // Edit errors
    #[error("Invalid operation: at least one field should be modified for editing the universe")]
    NoOpEdit,

    #[error("Unsupported change: {0}")]
    UnsupportedChange(String),

    // Capacity errors
    #[error("Insufficient inventory: {}", ShortfallList(.0))]
    InsufficientInventory(Vec<InventoryShortfall>),

    #[error("Insufficient master candidates: need {required}, have {available}")]
    InsufficientCandidates { required: usize, available: usize },

    // Invariant errors
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    // Lookup errors
    #[error("Not found: {0}")]
    NotFound(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // External errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MeridianError {
    /// Whether the caller can fix the condition by changing its request or
    /// inventory and planning again.
    pub fn is_caller_fixable(&self) -> bool {
        matches!(
            self,
            MeridianError::InvalidIntent(_)
                | MeridianError::InfeasibleIntent(_)
                | MeridianError::NoOpEdit
                | MeridianError::UnsupportedChange(_)
                | MeridianError::InsufficientInventory(_)
        )
    }

    /// Stable short label, used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            MeridianError::InvalidIntent(_) => "invalid_intent",
            MeridianError::InfeasibleIntent(_) => "infeasible_intent",
            MeridianError::NoOpEdit => "no_op_edit",
            MeridianError::UnsupportedChange(_) => "unsupported_change",
            MeridianError::InsufficientInventory(_) => "insufficient_inventory",
            MeridianError::InsufficientCandidates { .. } => "insufficient_candidates",
            MeridianError::InvariantViolation(_) => "invariant_violation",
            MeridianError::NotFound(_) => "not_found",
            MeridianError::Config(_) | MeridianError::InvalidConfig { .. } => "config",
            MeridianError::Io(_) => "io",
            MeridianError::Serialization(_) => "serialization",
        }
    }
}

impl From<serde_json::Error> for MeridianError {
    fn from(e: serde_json::Error) -> Self {
        MeridianError::Serialization(e.to_string())
    }
}

/// Inventory shortfall for one zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryShortfall {
    pub zone: ZoneId,
    pub instance_type: String,
    pub required: usize,
    pub available: usize,
}

impl fmt::Display for InventoryShortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "zone {} ({}): required {}, available {}",
            self.zone, self.instance_type, self.required, self.available
        )
    }
}

struct ShortfallList<'a>(&'a [InventoryShortfall]);

impl fmt::Display for ShortfallList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "no zone can accept more nodes");
        }
        for (i, shortfall) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", shortfall)?;
        }
        Ok(())
    }
}

/// Result type alias for planning operations.
pub type Result<T> = std::result::Result<T, MeridianError>;
