//! Command-line interface for Meridian.

use crate::types::{ClusterId, Universe, UniverseDefinition};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Meridian - A topology planner for distributed database universes.
#[derive(Parser)]
#[command(name = "meridian")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MERIDIAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "MERIDIAN_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Generate a placement for a user intent
    Placement {
        /// User intent JSON file
        intent: PathBuf,

        /// Topology catalog JSON file
        #[arg(short = 'C', long, env = "MERIDIAN_CATALOG")]
        catalog: PathBuf,

        /// Seed for zone selection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Plan a cluster of a universe definition
    Plan {
        /// Plan request JSON file
        request: PathBuf,

        /// Topology catalog JSON file
        #[arg(short = 'C', long, env = "MERIDIAN_CATALOG")]
        catalog: PathBuf,

        /// Seed for zone selection
        #[arg(long)]
        seed: Option<u64>,

        /// Print only the planned node actions
        #[arg(long)]
        summary_only: bool,
    },

    /// Validate a configuration file
    CheckConfig {
        /// Configuration file to validate
        path: PathBuf,
    },

    /// Show version information
    Version,
}

/// Input of the `plan` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub customer_id: u64,
    pub cluster_id: ClusterId,
    pub definition: UniverseDefinition,
    /// Persisted universe when editing.
    #[serde(default)]
    pub universe: Option<Universe>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
