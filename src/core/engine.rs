use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{Config, DetailLevel};
use crate::error::{DocstampError, Result};
use super::discovery::discover;
use super::doc_parser::parse_item;
use super::injector::{inject, InjectionTarget};
use super::languages::FileKind;
use super::llm::{create_generator, DocGenerator};
use super::parser::{CodeItem, CodeParser, ItemKind, SourceFile};
use super::validator::validate;
use super::writer::AtomicWriter;

/// An item that could not be documented, with the reason
#[derive(Debug, Clone, Serialize)]
pub struct SkippedItem {
    pub name: String,
    pub line_start: usize,
    pub reason: String,
}

/// Result of documenting one file
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub kind: Option<FileKind>,
    pub success: bool,
    pub dry_run: bool,
    /// Items found in the file
    pub items_processed: usize,
    /// Items that needed new or repaired documentation
    pub items_pending: usize,
    /// Items whose documentation was written
    pub items_documented: usize,
    /// Items already compliant
    pub items_skipped: usize,
    /// Items whose generation call failed
    pub items_failed: usize,
    pub failures: Vec<SkippedItem>,
    pub error: Option<String>,
}

impl FileOutcome {
    fn new(path: &Path, dry_run: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: None,
            success: true,
            dry_run,
            items_processed: 0,
            items_pending: 0,
            items_documented: 0,
            items_skipped: 0,
            items_failed: 0,
            failures: Vec::new(),
            error: None,
        }
    }

    fn fail(&mut self, error: impl Into<String>) {
        self.success = false;
        self.error = Some(error.into());
    }

    fn record_failure(&mut self, item: &CodeItem, reason: String) {
        self.items_failed += 1;
        self.failures.push(SkippedItem {
            name: item.name.clone(),
            line_start: item.line_start,
            reason,
        });
    }
}

/// Aggregate of one `document` run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub detail_level: DetailLevel,
    pub dry_run: bool,
    pub interrupted: bool,
    pub files: Vec<FileOutcome>,
}

impl RunSummary {
    pub fn new(detail_level: DetailLevel, dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            detail_level,
            dry_run,
            interrupted: false,
            files: Vec::new(),
        }
    }

    pub fn failed_files(&self) -> usize {
        self.files.iter().filter(|file| !file.success).count()
    }

    pub fn items_documented(&self) -> usize {
        self.files.iter().map(|file| file.items_documented).sum()
    }

    pub fn items_pending(&self) -> usize {
        self.files.iter().map(|file| file.items_pending).sum()
    }

    /// Write the summary as pretty JSON
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Per-item compliance report produced by `check`
#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub name: String,
    pub kind: ItemKind,
    pub line_start: usize,
    pub line_end: usize,
    pub documented: bool,
    pub issues: Vec<String>,
}

/// Compliance of one file
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub path: PathBuf,
    pub kind: Option<FileKind>,
    pub items: Vec<ItemReport>,
    pub error: Option<String>,
}

impl CheckOutcome {
    pub fn is_compliant(&self) -> bool {
        self.error.is_none() && self.items.iter().all(|item| item.issues.is_empty())
    }
}

/// Item scheduled for generation, with the documentation it should replace
struct PendingItem<'a> {
    item: &'a CodeItem,
    existing: Option<&'a str>,
}

/// Main orchestration engine: one per process, passed by reference
pub struct Engine {
    config: Config,
    parser: CodeParser,
    generator: Option<Box<dyn DocGenerator>>,
    writer: AtomicWriter,
}

impl Engine {
    /// Create an engine with an explicit generator (or none for checks and dry runs)
    pub fn new(config: Config, generator: Option<Box<dyn DocGenerator>>) -> Self {
        let parser = CodeParser::new(&config.processing);
        Self {
            config,
            parser,
            generator,
            writer: AtomicWriter::new(),
        }
    }

    /// Create an engine whose generator is built from the config
    pub fn with_configured_generator(config: Config) -> Result<Self> {
        let generator = create_generator(&config.generation)?;
        info!(
            "✅ Documentation generator: {} ({})",
            generator.provider_name(),
            generator.model_name()
        );
        Ok(Self::new(config, Some(generator)))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Supported files under `path`
    pub fn discover(&self, path: &Path) -> Result<Vec<PathBuf>> {
        discover(path, &self.config.processing)
    }

    /// Document every supported file under `path`, stopping early once
    /// `cancelled` is set. Files already written stay written.
    pub async fn document_path(
        &self,
        path: &Path,
        detail: DetailLevel,
        dry_run: bool,
        cancelled: &AtomicBool,
    ) -> Result<RunSummary> {
        let files = self.discover(path)?;
        info!("🔍 Found {} supported file(s) under {}", files.len(), path.display());

        let mut summary = RunSummary::new(detail, dry_run);
        for file in files {
            if cancelled.load(Ordering::SeqCst) {
                warn!("Interrupted; {} was not processed", file.display());
                summary.interrupted = true;
                break;
            }

            let outcome = self.document_file(&file, detail, dry_run).await;
            log_outcome(&outcome);
            summary.files.push(outcome);
        }

        summary.finished_at = Some(Utc::now());
        Ok(summary)
    }

    /// Run the extract, validate, generate, inject and write pipeline for one file
    pub async fn document_file(&self, path: &Path, detail: DetailLevel, dry_run: bool) -> FileOutcome {
        let mut outcome = FileOutcome::new(path, dry_run);
        if let Err(e) = self.try_document_file(path, detail, &mut outcome).await {
            outcome.fail(e.to_string());
        }
        outcome
    }

    async fn try_document_file(&self, path: &Path, detail: DetailLevel, outcome: &mut FileOutcome) -> Result<()> {
        let (source, items) = self.parser.parse_file(path)?;
        outcome.kind = Some(source.kind);
        outcome.items_processed = items.len();

        if items.is_empty() {
            debug!("No documentable items in {}", path.display());
            return Ok(());
        }

        let pending = self.plan(&source, &items, outcome);
        outcome.items_pending = pending.len();
        if pending.is_empty() || outcome.dry_run {
            return Ok(());
        }

        let generator = self
            .generator
            .as_deref()
            .ok_or_else(|| DocstampError::Config("no documentation generator configured".to_string()))?;

        let mut targets = Vec::with_capacity(pending.len());
        for work in pending {
            let item = work.item;
            let generated = match work.existing {
                Some(existing) => generator.update(source.kind, detail, existing, &item.source_text).await,
                None => generator.generate(source.kind, detail, &item.source_text).await,
            };

            match generated {
                Ok(documentation) if !documentation.trim().is_empty() => {
                    debug!("Generated documentation for {} (line {})", item.name, item.line_start);
                    targets.push(InjectionTarget::new(item.clone(), documentation));
                }
                Ok(_) => {
                    warn!("⚠️ Empty documentation generated for {}; skipping", item.name);
                    outcome.record_failure(item, "generator returned empty documentation".to_string());
                }
                Err(e) => {
                    warn!("⚠️ Failed to generate documentation for {}: {}", item.name, e);
                    outcome.record_failure(item, e.to_string());
                }
            }
        }

        if targets.is_empty() {
            outcome.fail("Failed to generate documentation for any items");
            return Ok(());
        }

        let rewritten = inject(&source.text, &targets, source.kind)?;
        self.writer.replace(&source.path, &rewritten, &source.content_hash)?;
        outcome.items_documented = targets.len();
        Ok(())
    }

    /// Split items into compliant ones and work for the generator
    fn plan<'a>(&self, source: &SourceFile, items: &'a [CodeItem], outcome: &mut FileOutcome) -> Vec<PendingItem<'a>> {
        let mut pending = Vec::new();
        for item in items {
            if !item.has_documentation {
                debug!("{}: {} has no documentation", source.path.display(), item.name);
                pending.push(PendingItem { item, existing: None });
                continue;
            }

            let result = validate(&parse_item(item, source.kind));
            if result.is_valid() {
                debug!("{}: {} is compliant; skipping", source.path.display(), item.name);
                outcome.items_skipped += 1;
            } else {
                debug!(
                    "{}: {} needs repair: {}",
                    source.path.display(),
                    item.name,
                    result.issues.join("; ")
                );
                pending.push(PendingItem {
                    item,
                    existing: Some(item.existing_doc_text.as_str()),
                });
            }
        }
        pending
    }

    /// Validate every item under `path` without generating anything
    pub fn check_path(&self, path: &Path) -> Result<Vec<CheckOutcome>> {
        let files = self.discover(path)?;
        Ok(files.iter().map(|file| self.check_file(file)).collect())
    }

    pub fn check_file(&self, path: &Path) -> CheckOutcome {
        let mut outcome = CheckOutcome {
            path: path.to_path_buf(),
            kind: None,
            items: Vec::new(),
            error: None,
        };

        match self.parser.parse_file(path) {
            Ok((source, items)) => {
                outcome.kind = Some(source.kind);
                outcome.items = items
                    .iter()
                    .map(|item| ItemReport {
                        name: item.name.clone(),
                        kind: item.kind,
                        line_start: item.line_start,
                        line_end: item.line_end,
                        documented: item.has_documentation,
                        issues: validate(&parse_item(item, source.kind)).issues,
                    })
                    .collect();
            }
            Err(e) => outcome.error = Some(e.to_string()),
        }
        outcome
    }
}

fn log_outcome(outcome: &FileOutcome) {
    let path = outcome.path.display();
    if !outcome.success {
        warn!("❌ {}: {}", path, outcome.error.as_deref().unwrap_or("failed"));
    } else if outcome.dry_run {
        info!(
            "📝 {}: {} item(s), would document {}",
            path, outcome.items_processed, outcome.items_pending
        );
    } else {
        info!(
            "✅ {}: processed {}, documented {}, skipped {}, failed {}",
            path, outcome.items_processed, outcome.items_documented, outcome.items_skipped, outcome.items_failed
        );
    }
    for failure in &outcome.failures {
        debug!("  skipped {} (line {}): {}", failure.name, failure.line_start, failure.reason);
    }
}
