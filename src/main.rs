// =============================================================================
// Swing Stats — Main Entry Point
// =============================================================================
//
// Reads one price per line from stdin, fans every price out to all configured
// horizons and logs entry/exit transitions of the signal horizon.  Stops on
// EOF or Ctrl+C.  The config file is only written when none exists yet.
// =============================================================================

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use swing_stats::{
    MultiHorizonStatistician, SignalEvent, SignalState, StatsConfig, StatsError, TracingSink,
};

const CONFIG_PATH: &str = "stats_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Swing Stats — starting up");

    // A file that fails to parse is reported and left as-is; env overrides
    // below apply to this run only.
    let mut config = StatsConfig::load_or_init(CONFIG_PATH).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        StatsConfig::default()
    });

    // Override horizons / rate from env if available.
    if let Ok(list) = std::env::var("SWING_HORIZONS") {
        let horizons: Vec<u32> = list
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        if !horizons.is_empty() {
            config.horizons = horizons;
        }
    }
    if let Ok(rate) = std::env::var("SWING_SAMPLE_RATE") {
        match rate.trim().parse() {
            Ok(rate) => config.sample_rate = rate,
            Err(e) => warn!(value = %rate, error = %e, "ignoring invalid SWING_SAMPLE_RATE"),
        }
    }

    info!(
        horizons = ?config.horizons,
        sample_rate = config.sample_rate,
        signal_horizon = config.signal_horizon,
        "Configured horizons"
    );

    // ── 2. Build the statistician ────────────────────────────────────────
    let stats = MultiHorizonStatistician::new(&config, Arc::new(TracingSink))
        .context("failed to build statistician")?;

    if !stats.horizons().contains(&config.signal_horizon) {
        warn!(
            signal_horizon = config.signal_horizon,
            "signal horizon is not configured, entry/exit tracking disabled"
        );
    }

    // ── 3. Ingest loop ───────────────────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut signal = SignalState::default();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read price feed")?,
            _ = tokio::signal::ctrl_c() => {
                warn!("Shutdown signal received — stopping gracefully");
                break;
            }
        };
        let Some(line) = line else {
            info!("Price feed ended");
            break;
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let price: f64 = match trimmed.parse() {
            Ok(p) => p,
            Err(e) => {
                warn!(line = %trimmed, error = %e, "skipping unparsable price");
                continue;
            }
        };

        if let Err(e) = stats.add(price) {
            warn!(price, error = %e, "sample rejected");
            continue;
        }

        match stats.snapshot(config.signal_horizon) {
            Ok(snapshot) => match signal.step(stats.ticks(), price, &snapshot) {
                Some(SignalEvent::Enter { tick, price }) => {
                    info!(horizon = snapshot.horizon, tick, price, "ENTER long");
                }
                Some(SignalEvent::Exit { tick, price, change_pct, held_ticks, reason }) => {
                    info!(
                        horizon = snapshot.horizon,
                        tick,
                        price,
                        change_pct,
                        held_ticks,
                        reason = %reason,
                        "EXIT long"
                    );
                }
                None => {}
            },
            Err(StatsError::UnknownHorizon(_)) => {}
            Err(e) => debug!(error = %e, "snapshot unavailable"),
        }
    }

    // ── 4. Shutdown ──────────────────────────────────────────────────────
    stats.wait_for_warm_up().await;

    for snapshot in stats.snapshots() {
        info!(
            horizon = snapshot.horizon,
            samples = snapshot.samples,
            stable = snapshot.stable,
            sma = snapshot.sma,
            std_dev_pct = snapshot.std_dev_percent,
            adx = snapshot.adx,
            buy = snapshot.buy_signal,
            "final horizon state"
        );
    }

    info!(ticks = stats.ticks(), "Swing Stats shut down complete.");
    Ok(())
}
