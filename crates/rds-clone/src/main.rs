//! rds-clone: run queries against a throwaway RDS clone
//!
//! `run` clones a source instance, executes a query file against the clone
//! and tears it down; `list` and `cleanup` find clones and snapshots left
//! behind by earlier runs through their ownership tags.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use rds_clone::aws::cleanup::{CleanupConfig, cleanup_owned};
use rds_clone::aws::tags::{discover_owned_instances, discover_owned_snapshots};
use rds_clone::aws::{AccountId, AwsContext, RdsClient, get_current_account_id};
use rds_clone::config::{AppConfig, load_queries};
use rds_clone::orchestrator::{CloneLifecycle, LifecycleReport};
use rds_clone::query::{QueryExecutor, ResultExporter, SqlxConnector};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rds-clone")]
#[command(about = "Run queries against a throwaway RDS clone restored from a snapshot")]
#[command(version)]
struct Args {
    /// Path to the configuration file
    /// (default: <config dir>/rds-clone/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clone an instance, run queries against the clone and delete it
    Run {
        /// Identifier of the source DB instance
        #[arg(short, long)]
        source: String,

        /// TOML file with [[query]] entries
        #[arg(short, long)]
        queries: PathBuf,

        /// Take a new snapshot instead of using the latest existing one
        #[arg(long)]
        fresh_snapshot: bool,
    },

    /// List DB instances and snapshots created by rds-clone
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Delete DB instances and snapshots created by rds-clone
    Cleanup {
        /// Actually delete resources (default is dry-run)
        #[arg(long)]
        execute: bool,

        /// Only delete DB instances
        #[arg(long, conflicts_with = "snapshots_only")]
        instances_only: bool,

        /// Only delete DB snapshots
        #[arg(long)]
        snapshots_only: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(suggestion) = rds_clone::aws::classify_anyhow_error(e).suggestion() {
        let _ = writeln!(stderr, "\n\x1b[2mHint:\x1b[0m {suggestion}");
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    // RUST_LOG replaces the whole default, SDK noise included
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "{level},aws_config=warn,aws_smithy_runtime=warn,sqlx=warn"
        ))
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    let aws = AwsContext::new(&config.rds.region).await;
    let account = match &config.rds.account_id {
        Some(id) => AccountId::from_config(id),
        None => get_current_account_id(aws.sdk_config()).await?,
    };
    let rds = Arc::new(RdsClient::new(&aws, &account));

    match args.command {
        Command::Run {
            source,
            queries,
            fresh_snapshot,
        } => {
            let queries = load_queries(&queries)?;
            info!(source = %source, queries = queries.len(), fresh_snapshot, "Starting clone run");

            let executor = QueryExecutor::new(
                SqlxConnector,
                config.rds.credentials.clone(),
                ResultExporter::new(config.out.clone()),
            );
            let lifecycle = CloneLifecycle::new(
                rds,
                executor,
                config.lifecycle_config(&source, fresh_snapshot),
            );
            let report = lifecycle.run(&queries).await?;
            print_report(&report);
        }

        Command::List { format } => {
            handle_list(rds.as_ref(), format).await?;
        }

        Command::Cleanup {
            execute,
            instances_only,
            snapshots_only,
        } => {
            let cleanup = CleanupConfig {
                dry_run: !execute,
                include_instances: !snapshots_only,
                include_snapshots: !instances_only,
            };
            handle_cleanup(rds.as_ref(), &cleanup, &config.rds.region).await?;
        }
    }

    Ok(())
}

fn print_report(report: &LifecycleReport) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Query", "Started", "Elapsed", "Rows", "Output"]);

    for timing in &report.timings {
        table.add_row(vec![
            Cell::new(&timing.name),
            Cell::new(timing.started_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(format!("{:.3}s", timing.elapsed.as_secs_f64())),
            Cell::new(timing.rows),
            Cell::new(
                timing
                    .artifact
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    println!("\nClone:    {}", report.clone_identifier);
    println!(
        "Snapshot: {}{}",
        report.snapshot.identifier,
        if report.snapshot.created { " (created)" } else { "" }
    );
    println!("{table}");
    println!(
        "Total query time: {:.3}s",
        report.total_query_time().as_secs_f64()
    );
}

async fn handle_list(rds: &RdsClient, format: OutputFormat) -> Result<()> {
    let instances = discover_owned_instances(rds).await?;
    let snapshots = discover_owned_snapshots(rds).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "instances": instances,
                "snapshots": snapshots,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&json).context("Failed to serialize resources")?
            );
        }
        OutputFormat::Table => {
            if instances.is_empty() && snapshots.is_empty() {
                println!("No rds-clone resources found.");
                return Ok(());
            }

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL_CONDENSED)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["Type", "Identifier", "Status", "Detail"]);

            for instance in &instances {
                table.add_row(vec![
                    Cell::new("DB Instance"),
                    Cell::new(&instance.identifier),
                    Cell::new(&instance.status),
                    Cell::new(format!("{} {}", instance.engine, instance.instance_class)),
                ]);
            }
            for snapshot in &snapshots {
                table.add_row(vec![
                    Cell::new("DB Snapshot"),
                    Cell::new(&snapshot.identifier),
                    Cell::new(&snapshot.status),
                    Cell::new(format!("of {}", snapshot.instance_identifier)),
                ]);
            }

            println!("{table}");
            println!(
                "\nTotal: {} instances, {} snapshots",
                instances.len(),
                snapshots.len()
            );
        }
    }

    Ok(())
}

async fn handle_cleanup(rds: &RdsClient, cleanup: &CleanupConfig, region: &str) -> Result<()> {
    let mode = if cleanup.dry_run { "DRY-RUN" } else { "EXECUTE" };
    info!(region = %region, mode, "Cleaning up rds-clone resources");

    let report = cleanup_owned(rds, cleanup).await?;

    println!("\n=== Cleanup Report ===");
    println!("Mode: {mode}");
    println!("Region: {region}");
    println!();
    println!("Resources found: {}", report.total_found());
    println!("  DB Instances:  {}", report.instances.len());
    println!("  DB Snapshots:  {}", report.snapshots.len());
    println!();
    if cleanup.dry_run {
        println!("Skipped: {} (dry-run mode)", report.skipped);
        println!();
        println!("Run with --execute to actually delete resources.");
    } else {
        println!("Deleted: {}", report.deleted);
    }

    Ok(())
}
