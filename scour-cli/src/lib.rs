use anyhow::{Context, Result};
use clap::Parser;
use std::fmt::Write;
use std::path::PathBuf;
use tracing::{debug, info};

use scour_core::{
    CleanerConfig, RootResolver, SweepConfig, SweepPhase, SweepProgress, SweepReport, Sweeper,
};

#[derive(Parser)]
#[command(name = "scour")]
#[command(about = "Remove virtual environments, bytecode caches and build output before packaging")]
#[command(version)]
pub struct Cli {
    /// Project root to clean (discovered from the executable location when omitted)
    pub path: Option<PathBuf>,

    /// Config file (defaults to ./scour.toml, then the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Subdirectory holding pyproject.toml, used when discovering the root
    #[arg(long)]
    pub subdir: Option<String>,

    /// Dry run - show what would be removed without removing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the active target list and exit
    #[arg(long)]
    pub list_targets: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "scour={log_level},scour_core={log_level},scour_cli={log_level}"
        ))
        .with_writer(std::io::stderr)
        .init();

    run(cli)
}

/// Execute a parsed command line
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    match config.source() {
        Some(path) => info!("Loaded config from {:?}", path),
        None => debug!("No config file found, using defaults"),
    }

    let sweep_config = SweepConfig {
        targets: config.active_targets(),
        dry_run: cli.dry_run,
    };
    debug!("{} active cleanup targets", sweep_config.targets.len());

    if cli.list_targets {
        print!("{}", format_targets(&sweep_config));
        return Ok(());
    }

    let root = RootResolver::from_env()
        .resolve(cli.path.as_deref(), &config)
        .context("Failed to resolve the project root")?;
    info!("Cleaning root {:?} (dry run: {})", root, cli.dry_run);

    let sweeper = Sweeper::new(sweep_config).context("Invalid cleanup target")?;

    if cli.json {
        let report = sweeper.clean(&root);
        println!("{}", format_json(&report)?);
    } else {
        let dry_run = cli.dry_run;
        let report =
            sweeper.clean_with_progress(&root, |progress| print_progress(&progress, dry_run));
        print!("{}", format_report(&report));
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<CleanerConfig> {
    let mut config = match &cli.config {
        Some(path) => CleanerConfig::load(path)?,
        None => {
            let current_dir =
                std::env::current_dir().context("Failed to read the working directory")?;
            CleanerConfig::discover(current_dir)?
        }
    };

    if let Some(subdir) = &cli.subdir {
        config.subdir = Some(subdir.clone());
    }

    Ok(config)
}

fn format_targets(config: &SweepConfig) -> String {
    let mut out = format!("{} cleanup targets:\n", config.targets.len());
    for target in &config.targets {
        let _ = writeln!(out, "  {target}");
    }
    out
}

fn format_json(report: &SweepReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize the report")
}

fn print_progress(progress: &SweepProgress, dry_run: bool) {
    match (&progress.phase, &progress.current_path) {
        (SweepPhase::Starting, Some(root)) => {
            let mode = if dry_run { " (dry run)" } else { "" };
            println!("Cleaning {}{mode}", root.display());
        }
        (SweepPhase::Complete, _) => {}
        (phase, None) => println!("{}...", phase.description()),
        (_, Some(path)) => {
            let verb = if dry_run { "would remove" } else { "removed" };
            println!("  {verb} {}", path.display());
        }
    }
}

fn format_report(report: &SweepReport) -> String {
    if report.is_noop() {
        return "\nNothing to clean.\n".to_string();
    }

    let heading = if report.dry_run {
        "Dry run completed!"
    } else {
        "Cleaning completed!"
    };
    let mut out = format!("\n{heading}\n");
    let _ = writeln!(out, "Directories removed: {}", report.removed_dirs);
    let _ = writeln!(out, "Files removed: {}", report.removed_files);
    let _ = writeln!(out, "Size freed: {}", report.format_size());

    if !report.failures.is_empty() {
        let _ = writeln!(out, "\nCould not remove {} paths:", report.failures.len());
        for failure in &report.failures {
            let _ = writeln!(out, "  - {}: {}", failure.path.display(), failure.error);
        }
    }
    out
}
