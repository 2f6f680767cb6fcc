use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use docstamp::config::{Config, DetailLevel};
use docstamp::core::{CheckOutcome, Engine, RunSummary};

/// Exit status for a run stopped by Ctrl-C
const INTERRUPTED_EXIT: u8 = 130;

#[derive(Parser)]
#[command(name = "docstamp")]
#[command(about = "Validates and injects standards-compliant documentation into Python, SQL and R sources")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate or repair documentation in place
    Document {
        /// File or directory to document
        path: PathBuf,

        /// Output density requested from the generator
        #[arg(short, long, value_enum)]
        detail: Option<DetailLevel>,

        /// Report what would be documented without calling the generator
        #[arg(long)]
        dry_run: bool,

        /// API key for the configured provider
        #[arg(long)]
        api_key: Option<String>,

        /// Write a JSON run report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Validate existing documentation without changing anything
    Check {
        /// File or directory to check
        path: PathBuf,
    },

    /// Write a default configuration file
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<ExitCode> {
        match self.command {
            Commands::Document {
                path,
                detail,
                dry_run,
                api_key,
                report,
            } => {
                let config = load_config(self.config.as_deref(), api_key)?;
                let detail = detail.unwrap_or(config.generation.detail_level);
                document(config, &path, detail, dry_run, report.as_deref()).await
            }
            Commands::Check { path } => {
                let config = load_config(self.config.as_deref(), None)?;
                check(config, &path)
            }
            Commands::Init { path, force } => init(path, force),
        }
    }
}

fn load_config(path: Option<&Path>, api_key: Option<String>) -> Result<Config> {
    let mut config = Config::load_or_default(path).context("Failed to load configuration")?;
    match api_key {
        Some(key) => config.generation.api_key = Some(key),
        None => config.generation.resolve_api_key(),
    }
    Ok(config)
}

async fn document(
    config: Config,
    path: &Path,
    detail: DetailLevel,
    dry_run: bool,
    report: Option<&Path>,
) -> Result<ExitCode> {
    let engine = if dry_run {
        info!("🔍 Dry run: no documentation will be generated or written");
        Engine::new(config, None)
    } else {
        info!(
            "🔑 {} API key {}",
            config.generation.provider,
            config.generation.api_key_status()
        );
        Engine::with_configured_generator(config)?
    };

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancelled);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing the current file");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let summary = engine.document_path(path, detail, dry_run, &cancelled).await?;
    print_summary(&summary);

    if let Some(report) = report {
        summary
            .write_json(report)
            .with_context(|| format!("Failed to write report to {}", report.display()))?;
        info!("📄 Report written to {}", report.display());
    }

    if summary.interrupted {
        Ok(ExitCode::from(INTERRUPTED_EXIT))
    } else if summary.failed_files() > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_summary(summary: &RunSummary) {
    if summary.dry_run {
        println!(
            "{} file(s) scanned, {} item(s) need documentation",
            summary.files.len(),
            summary.items_pending()
        );
    } else {
        println!(
            "{} file(s) processed, {} item(s) documented, {} file(s) failed",
            summary.files.len(),
            summary.items_documented(),
            summary.failed_files()
        );
    }
    for file in summary.files.iter().filter(|file| !file.success) {
        println!(
            "  FAILED {}: {}",
            file.path.display(),
            file.error.as_deref().unwrap_or("unknown error")
        );
    }
}

fn check(config: Config, path: &Path) -> Result<ExitCode> {
    let engine = Engine::new(config, None);
    let outcomes = engine.check_path(path)?;

    for outcome in &outcomes {
        print_check(outcome);
    }

    let failing = outcomes.iter().filter(|outcome| !outcome.is_compliant()).count();
    println!("{} file(s) checked, {} non-compliant", outcomes.len(), failing);

    Ok(if failing == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn print_check(outcome: &CheckOutcome) {
    let path = outcome.path.display();
    if let Some(error) = &outcome.error {
        println!("{}: ERROR {}", path, error);
        return;
    }

    for item in &outcome.items {
        if item.issues.is_empty() {
            println!("{}:{} {} VALID", path, item.line_start, item.name);
        } else {
            println!(
                "{}:{} {} INVALID ({} issues)",
                path,
                item.line_start,
                item.name,
                item.issues.len()
            );
            for issue in &item.issues {
                println!("    - {}", issue);
            }
        }
    }
}

fn init(path: Option<PathBuf>, force: bool) -> Result<ExitCode> {
    let dir = path.unwrap_or_else(|| PathBuf::from("."));
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }

    let target = dir.join("docstamp.toml");
    if target.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            target.display()
        );
    }

    Config::default()
        .save(&target)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    info!("✅ Wrote default configuration to {}", target.display());
    Ok(ExitCode::SUCCESS)
}
