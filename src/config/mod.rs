//! Configuration module for Meridian.

use crate::error::{MeridianError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the planner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeridianConfig {
    /// Planning configuration.
    #[serde(default)]
    pub planner: PlannerConfig,
    /// Liveness status configuration.
    #[serde(default)]
    pub liveness: LivenessConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl MeridianConfig {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MeridianError::Config(format!("Failed to read config file: {}", e))
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| {
            MeridianError::Config(format!("Failed to parse config: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.planner.node_prefix_base.is_empty() {
            return Err(MeridianError::InvalidConfig {
                field: "planner.node_prefix_base".to_string(),
                reason: "Node prefix base must not be empty".to_string(),
            });
        }

        if self.planner.max_master_subnets == 0 || self.planner.max_master_subnets % 2 == 0 {
            return Err(MeridianError::InvalidConfig {
                field: "planner.max_master_subnets".to_string(),
                reason: "Master subnet threshold must be odd and non-zero".to_string(),
            });
        }

        let ports = &self.liveness.ports;
        let mut seen = std::collections::HashSet::new();
        for port in [ports.node_exporter, ports.master, ports.tserver, ports.redis, ports.cql] {
            if port == 0 || !seen.insert(port) {
                return Err(MeridianError::InvalidConfig {
                    field: "liveness.ports".to_string(),
                    reason: format!("Port {} is zero or used twice", port),
                });
            }
        }

        if self.liveness.step_secs == 0 || self.liveness.step_secs > self.liveness.window_secs {
            return Err(MeridianError::InvalidConfig {
                field: "liveness.step_secs".to_string(),
                reason: "Step must be non-zero and no longer than the window".to_string(),
            });
        }

        Ok(())
    }

    /// Create a development configuration with reproducible planning.
    pub fn development() -> Self {
        Self {
            planner: PlannerConfig {
                random_seed: Some(42),
                ..PlannerConfig::default()
            },
            liveness: LivenessConfig::default(),
            observability: ObservabilityConfig {
                log_level: "debug".to_string(),
                json_logs: false,
            },
        }
    }
}

/// Planner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Leading component of node prefixes.
    pub node_prefix_base: String,
    /// Distinct subnets required before masters are spread one per subnet.
    pub max_master_subnets: usize,
    /// Seed for zone selection; entropy when unset.
    pub random_seed: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            node_prefix_base: "mdn".to_string(),
            max_master_subnets: 3,
            random_seed: None,
        }
    }
}

/// Exporter ports scraped for liveness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterPorts {
    pub node_exporter: u16,
    pub master: u16,
    pub tserver: u16,
    pub redis: u16,
    pub cql: u16,
}

impl Default for ExporterPorts {
    fn default() -> Self {
        Self {
            node_exporter: 9300,
            master: 7000,
            tserver: 9000,
            redis: 11000,
            cql: 12000,
        }
    }
}

/// Liveness status configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub ports: ExporterPorts,
    /// Length of the status query window in seconds.
    pub window_secs: u64,
    /// Query resolution in seconds.
    pub step_secs: u64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            ports: ExporterPorts::default(),
            window_secs: 60,
            step_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level.
    pub log_level: String,
    /// Enable JSON logging.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
