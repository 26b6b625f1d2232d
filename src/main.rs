//! CLI entry point for partsync.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use partsync_core::{
    CatalogStore, CategoryIndex, Database, EvictionReport, EvictionSweeper, NormalizationPipeline,
    NormalizeStats, RetryPolicy, SqliteCatalog, SyncEngine, SyncOutcome, TokenManager,
    VendorClient,
};
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::{Settings, load_config};
use cli::{Args, Command};

#[tokio::main]
async fn main() -> ExitCode {
    // .env must be loaded before clap reads JLCPCB_KEY / JLCPCB_SECRET
    let dotenv = dotenvy::dotenv();

    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    init_tracing(&args);

    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded environment file"),
        Err(error) if error.not_found() => {}
        Err(error) => warn!(%error, "ignoring unreadable environment file"),
    }

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(args: &Args) {
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = if args.quiet || args.verbose > 0 {
        tracing_subscriber::EnvFilter::new(default_level)
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: &Args) -> Result<()> {
    let command = args.command();
    let loaded = load_config(args.config.as_deref())?;
    if let Some(path) = &loaded.path {
        debug!(path = %path.display(), "config file loaded");
    }
    let settings = Settings::resolve(args, &loaded.config);
    debug!(?command, ?settings, "settings resolved");

    // Credentials are checked before the database is touched.
    let vendor = if command.syncs() {
        let client = VendorClient::new(&settings.vendor)?;
        let tokens = TokenManager::new(settings.auth.clone(), client.clone())?;
        Some((client, tokens))
    } else {
        None
    };

    let db = Database::new(&settings.database, settings.database_options)
        .await
        .with_context(|| format!("Failed to open database '{}'", settings.database.display()))?;
    let store = SqliteCatalog::new(db.clone());
    info!(database = %settings.database.display(), "partsync starting");

    let result = run_phases(args, command, &settings, &store, vendor).await;
    db.close().await;
    result
}

async fn run_phases(
    args: &Args,
    command: Command,
    settings: &Settings,
    store: &SqliteCatalog,
    vendor: Option<(VendorClient, TokenManager)>,
) -> Result<()> {
    let mut parts_upserted = None;

    if let Some((client, tokens)) = vendor {
        let outcome = sync_phase(settings, store, client, tokens).await?;
        parts_upserted = Some(outcome.stats.parts_upserted);
        summarize(args, &sync_summary(&outcome));
    }

    if command.evicts() {
        if parts_upserted == Some(0) {
            warn!("sync upserted no parts, skipping eviction");
            summarize(args, "evict: skipped, sync upserted no parts");
        } else {
            let report = EvictionSweeper::with_retention_days(settings.retention_days)?
                .sweep(store)
                .await?;
            summarize(args, &evict_summary(&report));
        }
    }

    if command.normalizes() {
        let stats = NormalizationPipeline::new(settings.workers)?
            .with_batch_target(settings.batch_target)?
            .run(store)
            .await?;
        summarize(args, &normalize_summary(&stats));
    }

    Ok(())
}

async fn sync_phase(
    settings: &Settings,
    store: &SqliteCatalog,
    client: VendorClient,
    tokens: TokenManager,
) -> Result<SyncOutcome> {
    let mut index = {
        let mut session = store.begin().await?;
        CategoryIndex::load(&mut session).await?
    };

    let engine = SyncEngine::new(settings.lookahead)?
        .with_retry_policy(RetryPolicy::with_max_attempts(settings.max_retries));
    let outcome = engine.run(client, tokens, store, &mut index).await?;

    if outcome.termination.is_no_progress() {
        warn!(termination = %outcome.termination, "sync stopped on a page with no accepted parts");
    }
    Ok(outcome)
}

fn summarize(args: &Args, line: &str) {
    if !args.quiet {
        println!("{line}");
    }
}

fn sync_summary(outcome: &SyncOutcome) -> String {
    let stats = &outcome.stats;
    format!(
        "sync: {} parts upserted, {} categories added over {} pages ({} out of stock, {} rejected); {}",
        stats.parts_upserted,
        stats.categories_created,
        stats.pages,
        stats.skipped_out_of_stock,
        stats.rejected_unknown_category + stats.rejected_malformed,
        outcome.termination,
    )
}

fn evict_summary(report: &EvictionReport) -> String {
    format!(
        "evict: {} parts removed (not updated since {})",
        report.evicted,
        report.cutoff.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

fn normalize_summary(stats: &NormalizeStats) -> String {
    format!(
        "normalize: {} parts in {} batches ({} failed), {} with attributes",
        stats.parts_processed, stats.batches, stats.failed_batches, stats.parts_with_attributes,
    )
}
