//! Subcommand implementations.
//!
//! Every command writes its report to the given writer so the binary and
//! the tests share one code path.

use anyhow::{bail, Context, Result};
use chash_core::{codec, HashRing, LoadStats, RingConfig};
use clap::Subcommand;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a ring snapshot built from NAME=WEIGHT targets.
    Build {
        /// Snapshot file to create or replace.
        #[arg(short, long)]
        output: PathBuf,

        /// Target as NAME=WEIGHT, or NAME for weight 1. Repeatable.
        #[arg(short = 't', long = "target", value_parser = parse_target, required = true)]
        targets: Vec<(String, u32)>,
    },

    /// Print the layout, targets and key-space ownership of a snapshot.
    Inspect {
        file: PathBuf,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Print the replica list for a key.
    Lookup {
        file: PathBuf,
        key: String,

        /// Number of distinct targets to return.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Run repeated balanced picks for one key and print where they landed.
    Balance {
        file: PathBuf,
        key: String,

        /// Candidates considered per pick.
        #[arg(short = 'n', long, default_value_t = 2)]
        count: usize,

        #[arg(long, default_value_t = 1000)]
        iterations: u64,
    },

    /// Time a synthetic ring: rebuild, snapshot, lookups and balancing.
    Bench {
        #[arg(long, default_value_t = 100)]
        targets: usize,

        #[arg(long, default_value_t = 200_000)]
        lookups: usize,

        /// Candidates per balanced pick.
        #[arg(long, default_value_t = 10)]
        balance: usize,
    },
}

impl Command {
    pub fn execute(&self, config: &RingConfig, out: &mut dyn Write) -> Result<()> {
        match self {
            Command::Build { output, targets } => build(config, output, targets, out),
            Command::Inspect { file, json } => inspect(config, file, *json, out),
            Command::Lookup { file, key, count } => lookup(config, file, key, *count, out),
            Command::Balance {
                file,
                key,
                count,
                iterations,
            } => balance(config, file, key, *count, *iterations, out),
            Command::Bench {
                targets,
                lookups,
                balance,
            } => bench(config, *targets, *lookups, *balance, out),
        }
    }
}

/// Parse `NAME=WEIGHT` (or a bare `NAME`).
pub fn parse_target(raw: &str) -> std::result::Result<(String, u32), String> {
    let (name, weight) = match raw.rsplit_once('=') {
        Some((name, weight)) => {
            let weight = weight
                .parse::<u32>()
                .map_err(|e| format!("invalid weight in '{raw}': {e}"))?;
            (name, weight)
        }
        None => (raw, chash_core::DEFAULT_WEIGHT),
    };
    if name.is_empty() {
        return Err(format!("empty target name in '{raw}'"));
    }
    Ok((name.to_string(), weight))
}

/// Process exit status for a failed command: the engine's status code
/// magnitude when an engine error caused it, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<chash_core::Error>())
        .and_then(|engine| u8::try_from(engine.kind().code().unsigned_abs()).ok())
        .unwrap_or(1)
}

fn open(config: &RingConfig, file: &Path) -> Result<HashRing> {
    let ring = HashRing::with_config(config.clone())?;
    ring.unserialize_from_file(file)
        .with_context(|| format!("failed to load ring from {}", file.display()))?;
    Ok(ring)
}

// -----------------------------------------------------------------------
// build
// -----------------------------------------------------------------------

fn build(
    config: &RingConfig,
    output: &Path,
    targets: &[(String, u32)],
    out: &mut dyn Write,
) -> Result<()> {
    let ring = HashRing::with_config(config.clone())?;
    let points = ring.set_targets(targets.iter().cloned())?;
    let bytes = ring
        .serialize_to_file(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(path = %output.display(), targets = targets.len(), points, bytes, "wrote ring");
    writeln!(
        out,
        "wrote {} targets ({points} points, {bytes} bytes) to {}",
        targets.len(),
        output.display()
    )?;
    Ok(())
}

// -----------------------------------------------------------------------
// inspect
// -----------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct InspectReport {
    format_version: u16,
    partitioner: String,
    points_per_weight: u32,
    points: usize,
    targets: Vec<TargetReport>,
}

#[derive(Debug, Serialize)]
struct TargetReport {
    index: u32,
    name: String,
    weight: u32,
    ownership: f64,
}

fn inspect(config: &RingConfig, file: &Path, json: bool, out: &mut dyn Write) -> Result<()> {
    let ring = open(config, file)?;
    let owned: BTreeMap<String, f64> = if ring.targets_count() == 0 {
        BTreeMap::new()
    } else {
        ring.ownership()?.into_iter().collect()
    };

    let report = InspectReport {
        format_version: codec::FORMAT_VERSION,
        partitioner: ring.partitioner_kind().to_string(),
        points_per_weight: ring.points_per_weight(),
        points: ring.points_count(),
        targets: ring
            .targets()
            .into_iter()
            .map(|t| TargetReport {
                index: t.index.0,
                ownership: owned.get(&t.name).copied().unwrap_or(0.0),
                name: t.name,
                weight: t.weight,
            })
            .collect(),
    };

    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "format version    {}", report.format_version)?;
    writeln!(out, "partitioner       {}", report.partitioner)?;
    writeln!(out, "points per weight {}", report.points_per_weight)?;
    writeln!(out, "points            {}", report.points)?;
    writeln!(out, "targets           {}", report.targets.len())?;
    for t in &report.targets {
        writeln!(
            out,
            "  #{:<5} {:<32} weight {:<5} owns {:>6.2}%",
            t.index,
            t.name,
            t.weight,
            t.ownership * 100.0
        )?;
    }
    Ok(())
}

// -----------------------------------------------------------------------
// lookup / balance
// -----------------------------------------------------------------------

fn lookup(config: &RingConfig, file: &Path, key: &str, count: usize, out: &mut dyn Write) -> Result<()> {
    let ring = open(config, file)?;
    for name in ring.lookup_list(key, count)? {
        writeln!(out, "{name}")?;
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct BalanceReport {
    picks: BTreeMap<String, u64>,
    stats: LoadStats,
}

fn balance(
    config: &RingConfig,
    file: &Path,
    key: &str,
    count: usize,
    iterations: u64,
    out: &mut dyn Write,
) -> Result<()> {
    let ring = open(config, file)?;
    for _ in 0..iterations {
        ring.lookup_balance(key, count)?;
    }
    let report = BalanceReport {
        picks: ring.loads().into_iter().filter(|(_, n)| *n > 0).collect(),
        stats: ring.load_stats(),
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

// -----------------------------------------------------------------------
// bench
// -----------------------------------------------------------------------

fn bench(
    config: &RingConfig,
    targets: usize,
    lookups: usize,
    balance: usize,
    out: &mut dyn Write,
) -> Result<()> {
    if targets == 0 {
        bail!("bench needs at least one target");
    }
    let ring = HashRing::with_config(config.clone())?;
    let names: Vec<String> = (1..=targets).map(|i| format!("target{i:03}")).collect();

    let started = Instant::now();
    let points = ring.set_targets(names.iter().map(|n| (n.as_str(), 1)))?;
    ring.freeze()?;
    step(out, "set_targets + freeze", started, &format!("{points} points"))?;

    let started = Instant::now();
    let snapshot = ring.serialize();
    let reloaded = HashRing::with_config(config.clone())?;
    reloaded.unserialize(&snapshot)?;
    if reloaded.serialize() != snapshot {
        bail!("snapshot round trip changed the ring");
    }
    step(out, "serialize round trip", started, &format!("{} bytes", snapshot.len()))?;

    let started = Instant::now();
    let mut placed: BTreeMap<String, u64> = names.iter().map(|n| (n.clone(), 0)).collect();
    for i in 0..lookups {
        let primary = ring.lookup(format!("candidate{i:07}"))?;
        *placed.entry(primary).or_insert(0) += 1;
    }
    let spread = LoadStats::from_loads(&placed.values().copied().collect::<Vec<_>>());
    step(
        out,
        "lookup",
        started,
        &format!("stddev {:.2}, max/min {:.2}", spread.stddev, spread.max_min_ratio()),
    )?;

    let started = Instant::now();
    for _ in 0..lookups {
        ring.lookup_balance("candidate001", balance)?;
    }
    let loads: Vec<u64> = ring.loads().into_iter().map(|(_, n)| n).filter(|n| *n > 0).collect();
    let stats = LoadStats::from_loads(&loads);
    step(
        out,
        "lookup_balance",
        started,
        &format!("{} targets used, stddev {:.2}", loads.len(), stats.stddev),
    )?;
    Ok(())
}

fn step(out: &mut dyn Write, title: &str, started: Instant, detail: &str) -> Result<()> {
    let elapsed = started.elapsed();
    writeln!(out, "{title:.<40} {:>10.3}ms  {detail}", elapsed.as_secs_f64() * 1000.0)?;
    Ok(())
}
