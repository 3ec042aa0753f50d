//! Meridian CLI - Main entry point.

use anyhow::Context;
use meridian::catalog::InMemoryCatalog;
use meridian::cli::{Cli, Commands, PlanRequest};
use meridian::config::MeridianConfig;
use meridian::planner::UniversePlanner;
use meridian::types::UserIntent;
use serde::Serialize;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse_args();

    let mut config = match &cli.config {
        Some(path) => MeridianConfig::from_file(path)?,
        None => MeridianConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    match cli.command {
        Commands::Placement {
            intent,
            catalog,
            seed,
        } => {
            meridian::observability::init(&config.observability)?;
            let catalog = InMemoryCatalog::from_file(&catalog)?;
            let intent: UserIntent = read_json(&intent)?;
            if seed.is_some() {
                config.planner.random_seed = seed;
            }

            let mut planner = UniversePlanner::from_config(&catalog, &catalog, config.planner);
            let tree = planner.generate_placement(&intent)?;
            print_json(&tree)?;
        }

        Commands::Plan {
            request,
            catalog,
            seed,
            summary_only,
        } => {
            meridian::observability::init(&config.observability)?;
            let catalog = InMemoryCatalog::from_file(&catalog)?;
            let PlanRequest {
                customer_id,
                cluster_id,
                mut definition,
                universe,
            } = read_json(&request)?;
            if seed.is_some() {
                config.planner.random_seed = seed;
            }

            let mut planner = UniversePlanner::from_config(&catalog, &catalog, config.planner);
            let outcome =
                planner.configure(&mut definition, universe.as_ref(), customer_id, cluster_id)?;

            if summary_only {
                print_json(&outcome)?;
            } else {
                print_json(&serde_json::json!({
                    "outcome": outcome,
                    "definition": definition,
                }))?;
            }
        }

        Commands::CheckConfig { path } => {
            let config = MeridianConfig::from_file(&path)?;
            println!("Configuration OK: {}", path.display());
            print_json(&config)?;
        }

        Commands::Version => {
            println!("Meridian v{}", env!("CARGO_PKG_VERSION"));
            println!("A topology planner for distributed database universes");
        }
    }

    Ok(())
}

/// Read and parse a JSON input file.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
