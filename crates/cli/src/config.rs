//! Command-line definition and ring configuration loading.

use crate::commands::Command;
use anyhow::{Context, Result};
use chash_core::{PartitionerKind, RingConfig};
use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};

/// Build, inspect and query consistent hash ring snapshots.
#[derive(Debug, Parser)]
#[command(name = "chash", version, about = "Consistent hash ring tool")]
pub struct CliConfig {
    /// JSON ring configuration file. Flags below override its fields.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Points placed on the ring per unit of weight.
    #[arg(long, global = true)]
    pub points_per_weight: Option<u32>,

    /// Hash function for new rings: xxh3 or sip13.
    #[arg(long, global = true)]
    pub partitioner: Option<PartitionerKind>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Ring configuration from `--config` (or defaults) with flag overrides.
    pub fn ring_config(&self) -> Result<RingConfig> {
        let mut config = match &self.config {
            Some(path) => load_ring_config(path)?,
            None => RingConfig::default(),
        };
        if let Some(points) = self.points_per_weight {
            config.points_per_weight = points;
        }
        if let Some(partitioner) = self.partitioner {
            config.partitioner = partitioner;
        }
        config.validate().context("invalid ring configuration")?;
        Ok(config)
    }

    /// Default log filter; `RUST_LOG` takes precedence when set.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

fn load_ring_config(path: &Path) -> Result<RingConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}
