//! CLI tool for consistent hash ring snapshots.
//!
//! Provides commands for:
//! - Building a snapshot from NAME=WEIGHT targets
//! - Inspecting a snapshot's layout and ownership
//! - Looking up replica lists and balanced picks
//! - Benchmarking rebuilds and lookups

pub mod commands;
pub mod config;

pub use commands::{exit_code, Command};
pub use config::CliConfig;

/// Install the fmt subscriber. `RUST_LOG` overrides `level` when set.
pub fn setup_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
