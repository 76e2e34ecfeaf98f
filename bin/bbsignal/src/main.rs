mod loader;

use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, PairMetadata};
use strategy::{Job, StrategyFileConfig, StrategyRegistry};

/// Per-pair result printed as one JSON line.
#[derive(Debug, Serialize)]
struct PairReport {
    strategy: String,
    pair: String,
    rows: usize,
    gaps: usize,
    entry_rows: Vec<String>,
    exit_rows: Vec<String>,
    tail: Vec<TailRow>,
}

#[derive(Debug, Serialize)]
struct TailRow {
    timestamp: String,
    close: f64,
    entry: bool,
    exit: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env()?;
    let strategy_file = StrategyFileConfig::load(&cfg.strategy_config_path).with_context(|| {
        format!("loading strategies from {}", cfg.strategy_config_path.display())
    })?;
    let registry = StrategyRegistry::from_config(&strategy_file)?;
    info!(strategies = registry.len(), "bbsignal starting");

    for (pair, timeframe) in registry.required_feeds() {
        let path = loader::candle_path(&cfg.candle_dir, &pair, timeframe);
        if !path.exists() {
            warn!(%pair, %timeframe, path = %path.display(), "Candle file missing");
        }
    }

    // ── Evaluate every (strategy, pair) on its own blocking task ──────────────
    let mut tasks = JoinSet::new();
    for job in registry.jobs() {
        let candle_dir = cfg.candle_dir.clone();
        let tail = cfg.output_tail;
        tasks.spawn_blocking(move || {
            let label = (job.strategy.name().to_string(), job.pair.clone());
            (label, evaluate_job(&job, candle_dir, tail))
        });
    }

    let mut failures = 0;
    while let Some(joined) = tasks.join_next().await {
        let ((strategy, pair), result) = joined.context("evaluation task panicked")?;
        match result {
            Ok(report) => {
                info!(
                    %strategy,
                    %pair,
                    entries = report.entry_rows.len(),
                    exits = report.exit_rows.len(),
                    "Pair evaluated"
                );
                println!("{}", serde_json::to_string(&report)?);
            }
            Err(e) => {
                failures += 1;
                error!(%strategy, %pair, error = %e, "Evaluation failed");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} pair evaluation(s) failed");
    }
    info!("All pairs evaluated");
    Ok(())
}

fn evaluate_job(job: &Job, candle_dir: PathBuf, tail: usize) -> common::Result<PairReport> {
    let strategy = &job.strategy;
    let path = loader::candle_path(&candle_dir, &job.pair, strategy.timeframe());
    let candles = loader::load_candles(&path, strategy.timeframe())?;
    let out = strategy.evaluate(&candles, &PairMetadata::new(job.pair.clone()))?;

    let rows = out.candles.candles();
    let stamp = |i: usize| rows[i].timestamp.to_rfc3339();
    let skip = if tail == 0 { 0 } else { rows.len().saturating_sub(tail) };

    Ok(PairReport {
        strategy: strategy.name().to_string(),
        pair: job.pair.clone(),
        rows: rows.len(),
        gaps: candles.gaps().len(),
        entry_rows: out.entry.rows().into_iter().map(stamp).collect(),
        exit_rows: out.exit.rows().into_iter().map(stamp).collect(),
        tail: (skip..rows.len())
            .map(|i| TailRow {
                timestamp: stamp(i),
                close: rows[i].close,
                entry: out.entry.get(i),
                exit: out.exit.get(i),
            })
            .collect(),
    })
}
