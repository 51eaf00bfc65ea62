use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabled::{settings::Style, Table, Tabled};

use stridesync::error::ErrorSeverity;
use stridesync::export;
use stridesync::logging::{init_logging, LogConfig, LogFormat};
use stridesync::source::{RefreshTokenProvider, StravaClient};
use stridesync::{
    ActivityMerger, ActivityRecord, AppConfig, ExportCsvImporter, RaceStatus, StravaCredentials,
    StrideSyncError, SyncPipeline, TrainingSnapshot, Trend,
};

/// StrideSync - marathon training tracker
///
/// Merges runs from the Strava API and a Strava bulk export, then tracks
/// aerobic efficiency and a marathon time prediction against a target.
#[derive(Parser)]
#[command(name = "stridesync")]
#[command(version)]
#[command(about = "Marathon training sync and analysis", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format (pretty, json, compact)
    #[arg(long, value_name = "FORMAT", default_value = "compact")]
    log_format: LogFormat,

    /// Also write JSON logs to this file (rotated daily)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Include span context in JSON log events
    #[arg(long)]
    log_spans: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, merge and analyze, then write all output files
    Sync {
        /// Strava bulk export (activities.csv)
        #[arg(short, long, value_name = "FILE")]
        export: Option<PathBuf>,

        /// Use the bulk export only
        #[arg(long)]
        skip_api: bool,

        /// Directory for the output files
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Analyze local data without touching the API
    Analyze {
        /// Previously written master_activities.csv
        #[arg(short, long, value_name = "FILE", conflicts_with = "export")]
        master: Option<PathBuf>,

        /// Strava bulk export (activities.csv)
        #[arg(short, long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Print the weekly performance audit
    Report {
        /// Previously written master_activities.csv
        #[arg(short, long, value_name = "FILE", conflicts_with = "export")]
        master: Option<PathBuf>,

        /// Strava bulk export (activities.csv)
        #[arg(short, long, value_name = "FILE")]
        export: Option<PathBuf>,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show or initialize the configuration file
    Config {
        /// Print the effective configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration file
        #[arg(short, long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(short, long)]
        force: bool,
    },
}

/// Row of the weekly efficiency table
#[derive(Tabled)]
struct WeekRow {
    #[tabled(rename = "Week")]
    week: u32,
    #[tabled(rename = "AE")]
    efficiency: String,
    #[tabled(rename = "Pace (min/km)")]
    pace: String,
    #[tabled(rename = "Avg HR")]
    heart_rate: String,
    #[tabled(rename = "Runs")]
    runs: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose)
        .with_format(cli.log_format)
        .with_file(cli.log_file.clone())
        .with_spans(cli.log_spans);
    init_logging(&log_config)?;

    let config_path = cli.config.clone();
    let config = match &config_path {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    match cli.command {
        Commands::Sync {
            export,
            skip_api,
            output_dir,
        } => {
            let mut config = config;
            if let Some(path) = export {
                config.sync.export_path = path;
            }
            if let Some(dir) = output_dir {
                config.sync.output_dir = dir;
            }
            run_sync(&config, skip_api)?;
        }

        Commands::Analyze { master, export } => {
            let records = load_records(&config, master.as_deref(), export.as_deref())?;
            let snapshot = SyncPipeline::new(&config).analyze(records, Local::now().date_naive());
            print_weekly_table(&snapshot);
            print_status(&snapshot);
        }

        Commands::Report {
            master,
            export,
            output,
        } => {
            let records = load_records(&config, master.as_deref(), export.as_deref())?;
            let snapshot = SyncPipeline::new(&config).analyze(records, Local::now().date_naive());
            match output {
                Some(path) => {
                    export::text::export_weekly_report(
                        &config.plan,
                        &snapshot.records,
                        &snapshot.analysis,
                        &snapshot.prediction,
                        &path,
                    )?;
                    println!("{} {}", "✓ Report written to".green(), path.display());
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut out = stdout.lock();
                    export::text::write_weekly_report(
                        &mut out,
                        &config.plan,
                        &snapshot.records,
                        &snapshot.analysis,
                        &snapshot.prediction,
                    )?;
                    out.flush()?;
                }
            }
        }

        Commands::Config { show, init, force } => {
            let path = config_path.unwrap_or_else(AppConfig::default_config_path);
            if init {
                if path.exists() && !force {
                    println!(
                        "{} {} (use --force to overwrite)",
                        "Config file already exists:".yellow(),
                        path.display()
                    );
                } else {
                    AppConfig::default().save_to_file(&path)?;
                    println!("{} {}", "✓ Wrote default config to".green(), path.display());
                }
            }
            if show || !init {
                println!("{}", format!("# {}", path.display()).dimmed());
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

fn run_sync(config: &AppConfig, skip_api: bool) -> Result<()> {
    println!("{}", "== Strava Sync ==".cyan().bold());
    let pipeline = SyncPipeline::new(config);
    let now = Local::now().naive_local();

    let report = if skip_api {
        println!("  {}", "API fetch skipped".dimmed());
        pipeline.run(None, now)
    } else {
        let credentials = StravaCredentials::from_env(&config.sync.env_file)
            .map_err(StrideSyncError::from)
            .map_err(report_error)?;
        let timeout = config.sync.http_timeout_secs;
        let provider = RefreshTokenProvider::new(credentials, &config.strava, timeout)
            .map_err(StrideSyncError::from)
            .map_err(report_error)?;
        let client = StravaClient::connect(&provider, &config.strava, config.sync.fetch_after, timeout)
            .map_err(StrideSyncError::from)
            .map_err(report_error)?;

        println!(
            "  Fetching runs from {}...",
            config.sync.fetch_after.format("%b %d, %Y")
        );
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("  {spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));

        let mut fetched = 0;
        let result = pipeline.run_with_progress(Some(&client), now, |page, count| {
            fetched += count;
            spinner.set_message(format!("page {}: {} activities ({} total)", page, count, fetched));
        });
        spinner.finish_and_clear();
        result
    };

    let report = report.map_err(report_error)?;

    if let Some(api) = &report.api {
        println!("  API: {} runs fetched", api.kept);
    }
    println!("  Export: {}", report.export);
    println!(
        "  Master: {} unique runs ({} id matches, {} fuzzy matches, {} new)",
        report.snapshot.records.len(),
        report.merge.id_matches,
        report.merge.fuzzy_matches,
        report.merge.api_inserted
    );
    println!(
        "{} {}",
        "✓ Wrote".green(),
        report.outputs.master.display()
    );
    println!();
    println!("{}", "== Analysis ==".cyan().bold());
    print_status(&report.snapshot);
    println!(
        "{} {}",
        "✓ Wrote".green(),
        report.outputs.status.display()
    );
    println!(
        "  Last synced: {}",
        export::format_last_synced(now)
    );
    Ok(())
}

/// Print the friendly message for a library error and hand it on
fn report_error(error: StrideSyncError) -> anyhow::Error {
    let prefix = match error.severity() {
        ErrorSeverity::Critical => "Fatal:".red().bold(),
        ErrorSeverity::Error => "Error:".red().bold(),
        ErrorSeverity::Warning => "Warning:".yellow().bold(),
    };
    eprintln!("{} {}", prefix, error.user_message());
    if error.is_retryable() {
        eprintln!("  {}", "This may be temporary. Try the sync again.".dimmed());
    }
    anyhow::Error::new(error)
}

/// Records for offline commands: an explicit file, else the last master table, else the export
fn load_records(
    config: &AppConfig,
    master: Option<&Path>,
    export_path: Option<&Path>,
) -> Result<Vec<ActivityRecord>> {
    let default_master = config.sync.master_path();
    let master: Option<&Path> = match master {
        Some(path) => Some(path),
        None if export_path.is_none() && default_master.exists() => Some(&default_master),
        None => None,
    };

    if let Some(path) = master {
        let records = export::csv::import_master(path)
            .with_context(|| format!("Failed to read master table {}", path.display()))?;
        tracing::info!(path = %path.display(), records = records.len(), "Loaded master table");
        return Ok(records);
    }

    let path = export_path.unwrap_or(&config.sync.export_path);
    let importer = ExportCsvImporter::new(config.sync.activity_type.clone());
    let (records, summary) = importer
        .import_file(path)
        .with_context(|| format!("Failed to read bulk export {}", path.display()))?;
    tracing::info!(path = %path.display(), "Bulk export: {}", summary);

    let (records, _) = ActivityMerger::merge(records, Vec::new());
    Ok(records)
}

fn print_weekly_table(snapshot: &TrainingSnapshot) {
    let analysis = &snapshot.analysis;
    if analysis.by_week.is_empty() {
        println!("{}", "No qualifying runs inside the training plan.".yellow());
        return;
    }

    let rows: Vec<WeekRow> = analysis
        .by_week
        .values()
        .map(|bucket| WeekRow {
            week: bucket.week,
            efficiency: format!("{:.3}", bucket.efficiency),
            pace: format!("{:.2}", bucket.avg_pace_min_km),
            heart_rate: format!("{:.1}", bucket.avg_heart_rate),
            runs: bucket.runs,
        })
        .collect();

    println!("{}", "Aerobic efficiency by week".bold());
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_status(snapshot: &TrainingSnapshot) {
    let status = &snapshot.status;
    let label = match status.status {
        RaceStatus::Ahead => status.label.green().bold(),
        RaceStatus::OnTrack => status.label.green(),
        RaceStatus::Close => status.label.yellow(),
        RaceStatus::OffPace => status.label.red().bold(),
    };
    println!("  {}", label);
    println!(
        "  Predicted {} vs target {} ({:+}s)",
        status.predicted_time,
        stridesync::models::format_clock(status.target_seconds),
        status.delta_seconds
    );

    let trend = match status.ae_trend {
        Trend::Improving => status.ae_trend.as_str().green(),
        Trend::Declining => status.ae_trend.as_str().red(),
        _ => status.ae_trend.as_str().normal(),
    };
    match status.ae_trend_pct {
        Some(pct) => println!("  AE trend: {} ({:+.1}%)", trend, pct),
        None => println!("  AE trend: {}", trend),
    }
    if !status.ae_label.is_empty() {
        println!("  {}", status.ae_label);
    }
    if let (Some(hr), Some(buffer)) = (status.hr_at_mp, status.hr_buffer) {
        println!(
            "  HR at MP: {} bpm, red zone {} bpm, buffer {:+.1} bpm",
            hr, status.red_zone_hr, buffer
        );
    }
    if let Some(week) = status.current_week {
        println!("  Week {}: {} km", week, status.current_week_km);
    }
}
