use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use noctra_landing::{app, config::Configuration, script};

#[derive(Debug, Parser)]
#[command(
    name = "noctra-landing",
    version,
    about = "cinematic point-cloud landing sequence"
)]
struct Args {
    /// Path to YAML config; defaults apply when omitted
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Print the resolved timeline schedule without launching the UI
    #[arg(long = "timeline-dry-run")]
    timeline_dry_run: bool,
    /// Deterministic RNG seed for point-field generation and camera jitter
    #[arg(long = "seed", value_name = "SEED")]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    // init tracing (RUST_LOG controls level, default = info)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let Args {
        config,
        timeline_dry_run,
        seed,
    } = Args::parse();

    let cfg = match config {
        Some(path) => Configuration::from_yaml_file(&path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    let cfg = cfg.validated().context("invalid configuration values")?;
    tracing::info!("Configuration:\n{cfg:#?}");

    if timeline_dry_run {
        run_timeline_dry_run(&cfg)?;
        return Ok(());
    }

    let seed = seed.unwrap_or_else(rand::random);
    app::run_windowed(cfg, seed, || {
        tracing::info!("landing sequence finished");
    })
}

/// Print every scheduled action of both timelines, in playback order.
fn run_timeline_dry_run(cfg: &Configuration) -> Result<()> {
    for (name, timeline) in [
        ("cinematic", script::cinematic(cfg)?),
        ("postamble", script::postamble(cfg)?),
    ] {
        println!("== {name} ({:.2}s, {} actions)", timeline.duration(), timeline.len());
        for action in timeline.actions() {
            println!("  {:>7.2}s  {}", action.start, action.describe());
        }
    }
    Ok(())
}
