use alerter::TelegramAlerter;
use analyzer::{RatioEngine, TargetStatus};
use anyhow::Context;
use api_client::ShopifyClient;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::Table;
use configuration::{Config, init_tracing, load_config};
use core_types::Snapshot;
use database::{DbRepository, InMemorySnapshotStore, SnapshotStore, connect, run_migrations};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracker::{RunOutcome, RunReport, Tracker};
use web_server::AppState;

/// The main entry point for the inventory pacer.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    // Keep the guard alive so the file log is flushed on exit.
    let _log_guard = init_tracing(&config.logging)?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Track(args) => handle_track(args, &config).await,
        Commands::Analyze(args) => handle_analyze(args, &config).await,
        Commands::History(args) => handle_history(args, &config).await,
        Commands::Serve(args) => handle_serve(args, &config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Tracks how the product catalog is split across categories and alerts when it drifts.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the catalog, store today's counts, and alert on ratio drift.
    Track(TrackArgs),
    /// Show the ratio analysis of a stored snapshot.
    Analyze(AnalyzeArgs),
    /// List stored snapshots.
    History(HistoryArgs),
    /// Run the dashboard API.
    Serve(ServeArgs),
}

#[derive(Parser)]
struct TrackArgs {
    /// The date the counts are stored under (format: YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// The creation date used to select products (format: YYYY-MM-DD).
    /// Defaults to `tracker.target_date`, then to --date.
    #[arg(long)]
    target_date: Option<NaiveDate>,

    /// Keep counts in memory and send no alert.
    #[arg(long)]
    dry_run: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// The snapshot date (format: YYYY-MM-DD). Defaults to the latest snapshot.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Parser)]
struct HistoryArgs {
    /// How many of the most recent snapshots to show.
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Parser)]
struct ServeArgs {
    /// The address to listen on. Defaults to `server.addr` from the configuration.
    #[arg(long)]
    addr: Option<SocketAddr>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn ratio_engine(config: &Config) -> RatioEngine {
    RatioEngine::new(config.target_ratios.clone(), config.tracker.tolerance)
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn SnapshotStore>> {
    let pool = connect(&config.database)
        .await
        .context("Failed to connect to the database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    Ok(Arc::new(DbRepository::new(pool)))
}

async fn handle_track(args: TrackArgs, config: &Config) -> anyhow::Result<()> {
    config.shopify.ensure_credentials()?;

    let snapshot_date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let target_date = args
        .target_date
        .or(config.tracker.target_date)
        .unwrap_or(snapshot_date);

    let catalog = Arc::new(ShopifyClient::new(&config.shopify, config.tracker.fetch_mode)?);
    let span = tracing::info_span!("track", date = %snapshot_date, mode = %config.tracker.fetch_mode);

    let tracker = if args.dry_run {
        tracing::info!("Dry run: counts are kept in memory and no alert is sent.");
        Tracker::new(catalog, Arc::new(InMemorySnapshotStore::new()), ratio_engine(config), span)
    } else {
        let store = connect_store(config).await?;
        let tracker = Tracker::new(catalog, store, ratio_engine(config), span)
            .with_report_dir(&config.tracker.report_dir);
        match TelegramAlerter::new(&config.telegram) {
            Some(alerter) => tracker.with_notifier(Arc::new(alerter)),
            None => tracker,
        }
    };

    let report = tracker
        .run(snapshot_date, target_date)
        .await
        .context("Tracking run failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_report(&report);
    }
    Ok(())
}

async fn handle_analyze(args: AnalyzeArgs, config: &Config) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let snapshot = match args.date {
        Some(date) => store.get_snapshot(date).await?,
        None => store.latest_snapshot().await?,
    };
    let Some(snapshot) = snapshot else {
        println!("No snapshot stored{}.", args.date.map(|d| format!(" for {d}")).unwrap_or_default());
        return Ok(());
    };

    let engine = ratio_engine(config);
    let breakdown = match engine.breakdown(&snapshot.counts) {
        Ok(breakdown) => breakdown,
        Err(e) => {
            println!("{}: {e}", snapshot.date);
            return Ok(());
        }
    };
    let analysis = engine.analyze(&snapshot.counts)?;

    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN).set_header(vec![
        "Category", "Count", "Current %", "Target %", "Target Count", "Difference", "Status",
    ]);
    for row in &breakdown {
        let status = match row.status {
            TargetStatus::AboveTarget => "above",
            TargetStatus::OnTarget => "on target",
            TargetStatus::BelowTarget => "below",
        };
        table.add_row(vec![
            row.category.clone(),
            row.current_count.to_string(),
            format!("{}%", row.current_percent),
            format!("{}%", row.target_percent),
            row.target_count.to_string(),
            row.difference.to_string(),
            status.to_string(),
        ]);
    }

    println!("Snapshot {} ({} products)", snapshot.date, analysis.total_products);
    println!("{table}");
    if analysis.balanced {
        println!("Ratios are within {}% of target.", engine.tolerance());
    } else if analysis.recommendations.is_empty() {
        println!("Ratios are off target, but no single upload closes any gap at the current total.");
    } else {
        println!("Recommendations:");
        for recommendation in &analysis.recommendations {
            println!("  • {recommendation}");
        }
    }
    Ok(())
}

async fn handle_history(args: HistoryArgs, config: &Config) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let snapshots = store.list_snapshots(args.limit).await?;
    if snapshots.is_empty() {
        println!("No snapshots stored yet.");
        return Ok(());
    }
    println!("{}", history_table(&snapshots));
    Ok(())
}

async fn handle_serve(args: ServeArgs, config: &Config) -> anyhow::Result<()> {
    let store = connect_store(config).await?;
    let state = Arc::new(AppState {
        store,
        engine: ratio_engine(config),
    });
    web_server::run_server(args.addr.unwrap_or(config.server.addr), state).await
}

// ==============================================================================
// Output
// ==============================================================================

/// One row per snapshot, one column per category seen across all of them.
fn history_table(snapshots: &[Snapshot]) -> Table {
    let mut categories: Vec<&str> = snapshots
        .iter()
        .flat_map(|s| s.counts.iter().map(|(category, _)| category))
        .collect();
    categories.sort_unstable();
    categories.dedup();

    let mut header = vec!["Date".to_string()];
    header.extend(categories.iter().map(|c| c.to_string()));
    header.push("Total".to_string());

    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN).set_header(header);
    for snapshot in snapshots {
        let mut row = vec![snapshot.date.to_string()];
        row.extend(categories.iter().map(|c| snapshot.counts.get(c).to_string()));
        row.push(snapshot.total().to_string());
        table.add_row(row);
    }
    table
}

fn print_run_report(report: &RunReport) {
    println!(
        "Stored {} products for {} ({:?}).",
        report.snapshot.total(),
        report.snapshot.date,
        report.upsert
    );
    if report.skipped_products > 0 {
        println!("{} products had no target category.", report.skipped_products);
    }
    if let Some(path) = &report.export_path {
        println!("Export: {}", path.display());
    }
    if let Some(delta) = &report.delta {
        println!("Change since {}: {:+}", delta.from, delta.total_change);
    }

    match &report.outcome {
        RunOutcome::NoData => println!("No products to analyse."),
        RunOutcome::Balanced { .. } => println!("Product ratio within expected range."),
        RunOutcome::Alerted { alert, delivered, .. } => {
            println!("{}", alert.subject);
            println!("{}", alert.body);
            println!("{}", alert.render_table());
            if !delivered {
                println!("(no notification channel configured)");
            }
        }
    }
}
