//! PLACSP Sync - Atom feed to table converter

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use placsp_common::logging::{init_logging, LogConfig, LogLevel};
use placsp_sync::archive::{self, is_archive_file};
use placsp_sync::{
    synchronize_channels, AccumulateError, ArchivalPolicy, ChannelOutcome, CsvSink, FailedSource,
    FeedSynchronizer, PreparedSource, ProjectionMode, SourceAccumulator, SourceChannel, SyncConfig,
    SyncOptions, SyncReport, TombstoneTracker,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const SUMMARY_FILE: &str = "run-summary.json";

#[derive(Parser, Debug)]
#[command(name = "placsp-sync")]
#[command(author, version, about = "Convert PLACSP Atom feeds into status-resolved tables")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert feed pages or monthly archives into one set of tables
    Convert(ConvertArgs),

    /// Stage every monthly archive per channel and rebuild each channel's tables
    Accumulate(AccumulateArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Starting feed page (.atom) or monthly archive (.zip), in processing order
    #[arg(long = "in", value_name = "PATH", required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// Output directory
    #[arg(long)]
    out: PathBuf,

    /// Base name of the table files
    #[arg(long, default_value = "placsp")]
    name: String,

    /// Write general data and results as separate tables
    #[arg(long)]
    two_tables: bool,

    /// Skip own-resource assignments
    #[arg(long)]
    no_own_resource: bool,

    /// Skip preliminary market consultations
    #[arg(long)]
    no_consultations: bool,

    /// When a deletion counts as archival: calendar or legacy
    #[arg(
        long,
        value_name = "POLICY",
        env = "PLACSP_ARCHIVAL_POLICY",
        default_value_t = ArchivalPolicy::Calendar
    )]
    archival_policy: ArchivalPolicy,
}

#[derive(Args, Debug)]
struct AccumulateArgs {
    /// Directory holding the monthly ZIP archives
    #[arg(long)]
    zip_dir: Option<PathBuf>,

    /// Directory feed pages are staged into
    #[arg(long)]
    atom_dir: Option<PathBuf>,

    /// Output directory; each channel writes to its own subdirectory
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Months dated feed pages are kept
    #[arg(long)]
    retention_months: Option<u32>,
}

/// Written as `run-summary.json` next to the tables
#[derive(Debug, Serialize)]
struct RunSummary {
    command: &'static str,
    finished_at: String,
    options: SyncOptions,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    channels: BTreeMap<SourceChannel, ChannelSummary>,
    totals: SyncReport,
}

#[derive(Debug, Serialize)]
struct ChannelSummary {
    output: PathBuf,
    baseline: PathBuf,
    pages_staged: usize,
    pages_pruned: usize,
    archives_failed: Vec<FailedSource>,
    report: SyncReport,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so clap sees PLACSP_* defaults
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the verbose flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("placsp-sync")
        .build()
        .merge_env()
        .context("Invalid logging configuration")?;
    let _guard = init_logging(&log_config)?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let (out_dir, summary) = match cli.command {
        Command::Convert(args) => convert(args, cancel).await?,
        Command::Accumulate(args) => {
            let config = SyncConfig::load().context("Invalid sync configuration")?;
            accumulate(args, config, cancel).await?
        },
    };

    let path = write_summary(&out_dir, &summary)?;
    print_summary(&summary, &path);

    if !summary.totals.is_clean() {
        warn!(
            failed = summary.totals.failed_sources.len(),
            cancelled = summary.totals.cancelled,
            "Run finished with problems"
        );
    }
    info!("Run complete");
    Ok(())
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received Ctrl+C, stopping after the current record");
                cancel.cancel();
            },
            Err(e) => warn!(error = %e, "Failed to install Ctrl+C handler"),
        }
    });
}

async fn convert(args: ConvertArgs, cancel: CancellationToken) -> Result<(PathBuf, RunSummary)> {
    let options = SyncOptions {
        mode: if args.two_tables {
            ProjectionMode::TwoTables
        } else {
            ProjectionMode::Combined
        },
        include_own_resource: !args.no_own_resource,
        include_consultations: !args.no_consultations,
        archival_policy: args.archival_policy,
    };

    let scratch = tempfile::Builder::new()
        .prefix("placsp-sync-")
        .tempdir()
        .context("Failed to create scratch directory")?;

    let mut starts = Vec::new();
    let mut staging_failures = Vec::new();
    for (index, input) in args.inputs.iter().enumerate() {
        if !is_archive_file(&input.to_string_lossy()) {
            starts.push(input.clone());
            continue;
        }

        let staging = scratch.path().join(index.to_string());
        match archive::extract_feed_entries(input, &staging) {
            Ok(pages) => match entry_page(input, &pages) {
                Some(page) => {
                    info!(archive = %input.display(), page = %page.display(), "Using extracted feed page");
                    starts.push(page);
                },
                None => staging_failures.push(FailedSource {
                    path: input.clone(),
                    reason: "archive holds no feed page".to_string(),
                }),
            },
            Err(e) => {
                warn!(archive = %input.display(), error = %e, "Failed to extract archive");
                staging_failures.push(FailedSource {
                    path: input.clone(),
                    reason: e.to_string(),
                });
            },
        }
    }

    let out = args.out.clone();
    let name = args.name.clone();
    let mut report = tokio::task::spawn_blocking(move || -> Result<SyncReport> {
        let mut sink = CsvSink::create(&out, &name, &options.tables(), options.mode)
            .context("Failed to open table output")?;
        let mut tracker = TombstoneTracker::new();
        let report = FeedSynchronizer::new(options).run(&starts, &mut tracker, &mut sink, &cancel)?;
        Ok(report)
    })
    .await
    .context("Conversion task panicked")??;

    drop(scratch);
    report.failed_sources.extend(staging_failures);

    Ok((
        args.out,
        RunSummary {
            command: "convert",
            finished_at: chrono::Local::now().to_rfc3339(),
            options,
            channels: BTreeMap::new(),
            totals: report,
        },
    ))
}

/// Page of an archive to start from: the one named like the archive, else the first
fn entry_page(archive: &Path, pages: &[PathBuf]) -> Option<PathBuf> {
    let stem = archive.file_stem()?.to_string_lossy().to_lowercase();
    let mut sorted = pages.to_vec();
    sorted.sort();

    sorted
        .iter()
        .find(|page| {
            page.file_stem()
                .is_some_and(|page_stem| page_stem.to_string_lossy().to_lowercase() == stem)
        })
        .or_else(|| sorted.first())
        .cloned()
}

async fn accumulate(
    args: AccumulateArgs,
    mut config: SyncConfig,
    cancel: CancellationToken,
) -> Result<(PathBuf, RunSummary)> {
    if let Some(dir) = args.zip_dir {
        config.archive_dir = dir;
    }
    if let Some(dir) = args.atom_dir {
        config.staging_dir = dir;
    }
    if let Some(dir) = args.out_dir {
        config.output_dir = dir;
    }
    if let Some(months) = args.retention_months {
        config.retention_months = months;
    }
    config.validate()?;

    let accumulator = Arc::new(SourceAccumulator::new(config.date_keys()?, config.retention_months));
    let groups = accumulator
        .group_archives(&config.archive_dir)
        .with_context(|| format!("Failed to list archives in {}", config.archive_dir.display()))?;
    if groups.is_empty() {
        warn!(dir = %config.archive_dir.display(), "No channel archives found");
    }

    let options = config.sync_options();
    let today = chrono::Local::now().date_naive();

    // Each channel stages only files carrying its own marker
    let mut tasks = Vec::new();
    for (channel, archives) in groups {
        info!(channel = %channel, archives = archives.len(), "Preparing channel");

        let accumulator = Arc::clone(&accumulator);
        let staging = config.staging_dir.clone();
        tasks.push(tokio::task::spawn_blocking(move || -> Result<Option<PreparedSource>> {
            match accumulator.prepare(channel, &archives, &staging, today) {
                Ok(prepared) => Ok(Some(prepared)),
                Err(AccumulateError::MissingBaseline { channel, dir }) => {
                    warn!(%channel, dir = %dir.display(), "Skipping channel without a baseline page");
                    Ok(None)
                },
                Err(e) => Err(e.into()),
            }
        }));
    }

    let mut prepared = Vec::new();
    for task in tasks {
        if let Some(source) = task.await.context("Channel staging task panicked")?? {
            prepared.push(source);
        }
    }

    // One tracker for all channels, synchronized in channel order
    let sink_config = config.clone();
    let channels = tokio::task::spawn_blocking(move || -> Result<BTreeMap<SourceChannel, ChannelSummary>> {
        let mut tracker = TombstoneTracker::new();
        let outcomes = synchronize_channels(
            &FeedSynchronizer::new(options),
            prepared,
            &mut tracker,
            |channel| {
                let name = sink_config.output_name(channel);
                CsvSink::create(
                    &sink_config.output_dir.join(name),
                    name,
                    &options.tables(),
                    options.mode,
                )
            },
            &cancel,
        )?;

        Ok(outcomes
            .into_iter()
            .map(|outcome| (outcome.prepared.channel, channel_summary(outcome)))
            .collect())
    })
    .await
    .context("Channel synchronization task panicked")??;

    let mut totals = SyncReport::default();
    for summary in channels.values() {
        totals.merge(summary.report.clone());
    }

    Ok((
        config.output_dir,
        RunSummary {
            command: "accumulate",
            finished_at: chrono::Local::now().to_rfc3339(),
            options,
            channels,
            totals,
        },
    ))
}

fn channel_summary(outcome: ChannelOutcome<CsvSink>) -> ChannelSummary {
    let ChannelOutcome {
        prepared,
        report,
        sink,
    } = outcome;
    ChannelSummary {
        output: sink.dir().to_path_buf(),
        baseline: prepared.baseline,
        pages_staged: prepared.members.len(),
        pages_pruned: prepared.pruned.len(),
        archives_failed: prepared
            .staging
            .failed
            .into_iter()
            .map(|(path, reason)| FailedSource { path, reason })
            .collect(),
        report,
    }
}

fn write_summary(dir: &Path, summary: &RunSummary) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(SUMMARY_FILE);
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn print_summary(summary: &RunSummary, path: &Path) {
    let totals = &summary.totals;
    println!("Files:              {}", totals.files);
    println!("Pages visited:      {}", totals.pages);
    println!("Records seen:       {}", totals.records_seen);
    println!("Records processed:  {}", totals.records_processed);
    println!("Duplicates skipped: {}", totals.duplicates);
    for (table, rows) in &totals.rows_by_table {
        println!("Rows in {:<18} {}", format!("{}:", table), rows);
    }
    for failed in &totals.failed_sources {
        println!("FAILED {}: {}", failed.path.display(), failed.reason);
    }
    if totals.cancelled {
        println!("Run was cancelled before all sources were processed");
    }
    println!("Summary written to {}", path.display());
}
