//! live-map-sync binary
//!
//! Polls the live-map API and keeps an in-memory map scene and player panel
//! in sync, logging summary changes.
//!
//! ## Configuration (TOML via `--config`, env via `config` crate, CLI last)
//!
//! | Key / env                          | Default                 | Description                  |
//! |------------------------------------|-------------------------|------------------------------|
//! | `base_url` / `LIVE_MAP_BASE_URL`   | `http://localhost:8000` | Snapshot API root            |
//! | `player_interval_ms`               | `400`                   | Player timer                 |
//! | `npc_interval_ms`                  | `5000`                  | NPC timer                    |
//! | `garage_interval_ms`               | `20000`                 | Garage timer                 |
//! | `npcs_enabled`                     | `false`                 | Poll `/npcs` at all          |
//! | `start_paused`                     | `false`                 | Start with player updates paused |
//! | `request_timeout_ms`               | `2000`                  | HTTP timeout                 |
//! | `debug_mode`                       | `false`                 | List debug dots in the panel |

use anyhow::{Context, Result};
use clap::Parser;
use live_map::{HttpSnapshotSource, LiveMapConfig, LiveMapService, PollScheduler, Summary};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "live-map-sync", about = "Live map snapshot sync", version)]
struct Args {
    /// Optional TOML config file
    #[arg(long, env = "LIVE_MAP_CONFIG")]
    config: Option<PathBuf>,

    /// Snapshot API root
    #[arg(long)]
    base_url: Option<String>,

    /// Player poll interval (ms)
    #[arg(long)]
    player_interval_ms: Option<u64>,

    /// Also poll NPC positions
    #[arg(long)]
    npcs: bool,

    /// Start with player updates paused
    #[arg(long)]
    paused: bool,

    /// Seconds between stats log lines
    #[arg(long, default_value_t = 10)]
    stats_every_secs: u64,
}

fn load_config(args: &Args) -> Result<LiveMapConfig> {
    let mut builder = config::Config::builder()
        .add_source(config::Config::try_from(&LiveMapConfig::default())?);
    if let Some(path) = &args.config {
        builder = builder.add_source(config::File::from(path.as_path()).required(true));
    }
    let mut cfg: LiveMapConfig = builder
        .add_source(config::Environment::with_prefix("LIVE_MAP").try_parsing(true))
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    if let Some(url) = &args.base_url {
        cfg.base_url = url.clone();
    }
    if let Some(ms) = args.player_interval_ms {
        cfg.player_interval_ms = ms;
    }
    cfg.npcs_enabled |= args.npcs;
    cfg.start_paused |= args.paused;
    Ok(cfg)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("live_map=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    log::info!(
        "Starting live-map-sync (api='{}', players every {}ms, npcs {}, garages every {}ms)",
        config.base_url,
        config.player_interval_ms,
        if config.npcs_enabled { "on" } else { "off" },
        config.garage_interval_ms,
    );

    let source = HttpSnapshotSource::new(
        config.base_url.clone(),
        Duration::from_millis(config.request_timeout_ms),
    )
    .context("Failed to build HTTP client")?;

    let service = Arc::new(Mutex::new(LiveMapService::new(config)));
    let scheduler = Arc::new(PollScheduler::new(service.clone(), Arc::new(source)));

    // Periodic stats line, only when something changed.
    let stats_every = Duration::from_secs(args.stats_every_secs.max(1));
    let stats_handle = tokio::spawn(async move {
        let mut timer = tokio::time::interval(stats_every);
        let mut last: Option<Summary> = None;
        loop {
            timer.tick().await;
            let (summary, stats) = {
                let svc = service.lock();
                (svc.summary(), svc.stats())
            };
            if last != Some(summary) {
                log::info!(
                    "players={} (admins={}, police={}) npcs={} garages={} passes={} failed={}",
                    summary.total,
                    summary.total_admins,
                    summary.total_police,
                    stats.npcs,
                    stats.garages,
                    stats.passes_applied,
                    stats.failed_polls,
                );
                last = Some(summary);
            }
        }
    });

    let result = scheduler.run().await;
    stats_handle.abort();
    result
}
