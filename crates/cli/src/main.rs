mod config;
mod logging;
mod progress;
mod render;

use std::path::{Path, PathBuf};
use std::process;

use branchwatch_core::{
    BranchId, BranchRegistry, BusinessClock, JsonRegistryLoader, RegistryLoader, SharedRegistry,
};
use branchwatch_ingest::{spreadsheet_for, SnapshotQuerySource};
use branchwatch_monitor::{CheckError, HealthReport, Monitor};
use branchwatch_probe::ConnectivityProbe;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::config::{Config, ConfigError};

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Branch database health monitor.
#[derive(Parser)]
#[command(name = "branchwatch", version, about = "Branch database health monitor")]
struct Cli {
    /// Configuration file (default: ./branchwatch.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Evaluate as of this instant (RFC 3339) instead of the current time
    #[arg(long, global = true, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check sales upload freshness from an "Upload Sessions" workbook or CSV export
    Uploads {
        /// Path to the `.xlsx` workbook or CSV file
        file: PathBuf,
    },

    /// Check last database backup per branch
    Backups {
        /// Do not ping the servers of branches with missed backups
        #[arg(long)]
        no_probe: bool,
    },

    /// Check transaction log file sizes per branch
    Logsize,

    /// Show the new-branch opening checklist
    Checklist,

    /// Look up a branch in the registry
    Branch {
        /// Branch id or number
        id: String,
    },
}

fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

/// Everything a subcommand needs, built once from the config.
struct Context {
    config: Config,
    clock: BusinessClock,
    monitor: Monitor,
    probe: ConnectivityProbe,
    output: OutputFormat,
    quiet: bool,
}

impl Context {
    fn build(config: Config, output: OutputFormat, quiet: bool) -> Result<Self, ConfigError> {
        let clock = config.clock()?;
        let thresholds = config.thresholds()?;
        let probe = config.probe()?;
        let registry = SharedRegistry::new(load_registry(&config.registry.path)?);
        let monitor = Monitor::new(registry, clock, thresholds)
            .with_server_prefix(&config.probe.server_prefix);
        Ok(Context {
            config,
            clock,
            monitor,
            probe,
            output,
            quiet,
        })
    }

    fn fail(&self, msg: &str) -> ! {
        report_error(msg, self.output, self.quiet);
        process::exit(1);
    }
}

/// Without a registry file every branch is simply unregistered.
fn load_registry(path: &Path) -> Result<BranchRegistry, ConfigError> {
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "branch registry not found; missing-branch detection disabled"
        );
        return Ok(BranchRegistry::empty());
    }
    JsonRegistryLoader::new(path)
        .load()
        .map_err(|e| ConfigError::Invalid(e.to_string()))
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    logging::init(config.logging.level.as_deref(), cli.quiet);

    let ctx = match Context::build(config, cli.output, cli.quiet) {
        Ok(ctx) => ctx,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    let now = cli.now.unwrap_or_else(Utc::now);

    match cli.command {
        Commands::Uploads { file } => cmd_uploads(&ctx, &file, now),
        Commands::Backups { no_probe } => cmd_backups(&ctx, no_probe, now),
        Commands::Logsize => cmd_logsize(&ctx, now),
        Commands::Checklist => cmd_checklist(&ctx),
        Commands::Branch { id } => cmd_branch(&ctx, &id),
    }
}

fn cmd_uploads(ctx: &Context, file: &Path, now: DateTime<Utc>) {
    let bytes = match std::fs::read(file) {
        Ok(bytes) => bytes,
        Err(e) => ctx.fail(&format!("could not read '{}': {}", file.display(), e)),
    };
    let spreadsheet = spreadsheet_for(file);
    let mut progress = progress::sink(ctx.quiet);
    let result = ctx
        .monitor
        .check_uploads(&bytes, spreadsheet.as_ref(), now, progress.as_mut());
    finish_check(ctx, result);
}

fn cmd_backups(ctx: &Context, no_probe: bool, now: DateTime<Utc>) {
    let source = SnapshotQuerySource::new(&ctx.config.staging.snapshot_dir);
    let probe = (ctx.config.probe.enabled && !no_probe).then_some(&ctx.probe);
    let mut progress = progress::sink(ctx.quiet);
    let result = block_on(ctx, async {
        ctx.monitor
            .check_backups(&source, probe, now, progress.as_mut())
            .await
    });
    finish_check(ctx, result);
}

fn cmd_logsize(ctx: &Context, now: DateTime<Utc>) {
    let source = SnapshotQuerySource::new(&ctx.config.staging.snapshot_dir);
    let mut progress = progress::sink(ctx.quiet);
    let result = block_on(ctx, async {
        ctx.monitor
            .check_log_sizes(&source, now, progress.as_mut())
            .await
    });
    finish_check(ctx, result);
}

fn cmd_checklist(ctx: &Context) {
    let source = SnapshotQuerySource::new(&ctx.config.staging.snapshot_dir);
    match block_on(ctx, ctx.monitor.load_checklist(&source)) {
        Ok(report) => match ctx.output {
            OutputFormat::Text => print!("{}", render::checklist(&report)),
            OutputFormat::Json => print_json(ctx, &report),
        },
        Err(e) => ctx.fail(&e.user_message()),
    }
}

fn cmd_branch(ctx: &Context, raw: &str) {
    let id = BranchId::new(raw);
    if id.is_empty() {
        ctx.fail("branch id must not be empty");
    }
    let registry = ctx.monitor.registry().snapshot();
    let entry = registry.get(&id);
    match ctx.output {
        OutputFormat::Text => match entry {
            Some(e) if e.arabic_name.is_empty() => println!("{}  {}", id, e.english_name),
            Some(e) => println!("{}  {}  {}", id, e.english_name, e.arabic_name),
            None => println!("{}  {} (not registered)", id, registry.display_name(&id)),
        },
        OutputFormat::Json => print_json(
            ctx,
            &serde_json::json!({
                "branch_id": id,
                "registered": entry.is_some(),
                "english_name": registry.display_name(&id),
                "arabic_name": entry.map(|e| e.arabic_name.as_str()),
            }),
        ),
    }
}

fn block_on<F: std::future::Future>(ctx: &Context, future: F) -> F::Output {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(future),
        Err(e) => ctx.fail(&format!("failed to start async runtime: {}", e)),
    }
}

fn finish_check(ctx: &Context, result: Result<HealthReport, CheckError>) {
    match result {
        Ok(report) => match ctx.output {
            OutputFormat::Text => {
                let registry = ctx.monitor.registry().snapshot();
                print!("{}", render::health_report(&report, &registry, &ctx.clock));
            }
            OutputFormat::Json => print_json(ctx, &report),
        },
        Err(e) => {
            tracing::error!(error = %e, "check failed");
            ctx.fail(&e.user_message());
        }
    }
}

fn print_json<T: Serialize>(ctx: &Context, value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => ctx.fail(&format!("could not serialize output: {}", e)),
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": msg })),
    }
}
