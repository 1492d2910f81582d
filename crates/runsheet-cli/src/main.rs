//! `runsheet`: compute item start times and export schedule snapshots.

mod config;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use runsheet_engine::{to_timezone, ExportFormat, Schedule, Sequence};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "runsheet", version, about = "Compute and export timed event schedules")]
struct Cli {
    /// Config file (default: ./runsheet.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export a schedule snapshot
    Export {
        /// Schedule snapshot (JSON)
        snapshot: PathBuf,

        /// json, xml, csv or ical
        #[arg(short, long)]
        format: Option<String>,

        /// Output file, or a directory to write the conventional filename into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include hidden columns
        #[arg(long)]
        include_hidden: bool,

        /// Leave out skipped items
        #[arg(long)]
        active_only: bool,
    },
    /// Print each item's start time and the schedule end
    Times {
        /// Schedule snapshot (JSON)
        snapshot: PathBuf,

        /// Leave out skipped items
        #[arg(long)]
        active_only: bool,

        /// Show times in this IANA timezone instead of the schedule's
        #[arg(long)]
        tz: Option<String>,
    },
    /// List the export formats
    Formats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;

    // ── Tracing ────────────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.logging.filter.as_deref().unwrap_or("warn"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(
        include_hidden = config.export.include_hidden,
        include_inactive = config.export.include_inactive,
        default_format = %config.export.default_format,
        "configuration loaded"
    );

    match cli.command {
        Command::Export {
            snapshot,
            format,
            output,
            include_hidden,
            active_only,
        } => cmd_export(
            &config,
            &snapshot,
            format.as_deref(),
            output.as_deref(),
            include_hidden,
            active_only,
        ),
        Command::Times {
            snapshot,
            active_only,
            tz,
        } => cmd_times(&snapshot, active_only, tz.as_deref()),
        Command::Formats => cmd_formats(),
    }
}

fn read_snapshot(path: &Path) -> Result<Schedule> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let schedule: Schedule = serde_json::from_str(&content)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    tracing::debug!(
        schedule = %schedule.id,
        items = schedule.items.len(),
        timezone = %schedule.timezone,
        "snapshot loaded"
    );
    Ok(schedule)
}

fn cmd_export(
    config: &Config,
    snapshot: &Path,
    format: Option<&str>,
    output: Option<&Path>,
    include_hidden: bool,
    active_only: bool,
) -> Result<()> {
    // Reject unknown tokens before touching the snapshot.
    let format = match format {
        Some(token) => token.parse::<ExportFormat>()?,
        None => config.export.default_format,
    };

    let mut options = config.export.options();
    if include_hidden {
        options.include_hidden = true;
    }
    if active_only {
        options.include_inactive = false;
    }

    let schedule = read_snapshot(snapshot)?;
    let export = runsheet_engine::export(&schedule, format, options)
        .with_context(|| format!("exporting {} as {format}", snapshot.display()))?;

    match output {
        Some(path) => {
            let target = if path.is_dir() {
                path.join(&export.filename)
            } else {
                path.to_path_buf()
            };
            std::fs::write(&target, &export.body)
                .with_context(|| format!("writing {}", target.display()))?;
            tracing::info!(path = %target.display(), bytes = export.body.len(), "export written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&export.body).context("writing to stdout")?;
            stdout.flush().context("writing to stdout")?;
        }
    }
    Ok(())
}

fn cmd_times(snapshot: &Path, active_only: bool, tz: Option<&str>) -> Result<()> {
    let schedule = read_snapshot(snapshot)?;
    let sequence = Sequence::new(&schedule)?;
    let title_column = schedule.visible_columns().first().map(|c| c.id);
    let zone = tz.unwrap_or(&schedule.timezone);

    let mut stdout = std::io::stdout().lock();
    for entry in sequence.entries(!active_only) {
        let title = title_column
            .map(|id| entry.item.value(id))
            .filter(|v| !v.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Item {}", entry.index + 1));
        let marker = if entry.item.skipped { " (skipped)" } else { "" };
        writeln!(
            stdout,
            "{:>3}  {}  {:>8}  {title}{marker}",
            entry.index + 1,
            show(entry.scheduled, zone)?,
            entry.item.length.to_string(),
        )?;
    }
    writeln!(stdout, "end  {}", show(sequence.end(), zone)?)?;
    Ok(())
}

fn show(instant: DateTime<FixedOffset>, zone: &str) -> Result<String> {
    let local = to_timezone(instant, zone)?;
    Ok(local.format("%Y-%m-%d %H:%M:%S %:z").to_string())
}

fn cmd_formats() -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for format in ExportFormat::ALL {
        writeln!(
            stdout,
            "{:<5} {:<30} .{}",
            format.token(),
            format.content_type(),
            format.file_extension()
        )?;
    }
    Ok(())
}
