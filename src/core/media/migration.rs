//! Bulk Media Migration
//!
//! Converts every object under a prefix whose key ends with a source suffix
//! (e.g. `.mp3`) into a sibling object with a target suffix (e.g. `.opus`),
//! optionally rewriting database references and deleting the original.
//!
//! The run is a bounded-concurrency batch loop:
//! - objects are enumerated page by page until the listing cursor is
//!   exhausted or `max_objects` matches have been collected;
//! - matches are processed `concurrency` at a time, and each batch is awaited
//!   in full before the next one starts; a failing item never short-circuits
//!   its batch;
//! - the abort flag is checked between batches only, so items already
//!   dispatched always run to completion;
//! - per-item progress is logged for every `log_every`-th item, errors always.
//!
//! Re-running a migration is safe: only keys with the source suffix are
//! scanned, and an item whose target already exists is not converted again.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::log::{LogEntry, LogLevel, MigrationLog};
use super::store::{ObjectInfo, ObjectStore, StoreError};
use super::transcode::{TranscodeError, Transcoder};
use crate::config::MigrationConfig;
use crate::database::{Database, MediaRefOps};

/// Upper bound accepted for `concurrency`
pub const MAX_CONCURRENCY: usize = 50;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Invalid migration options: {0}")]
    InvalidOptions(String),

    #[error("Failed to list objects: {0}")]
    Listing(#[from] StoreError),
}

/// Failure of a single item; caught and counted, never propagated
#[derive(Debug, Error)]
enum ItemError {
    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Transcode(#[from] TranscodeError),

    #[error("Failed to rewrite references: {0}")]
    References(#[from] sqlx::Error),
}

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationOptions {
    pub prefix: String,
    pub source_suffix: String,
    pub target_suffix: String,
    pub concurrency: usize,
    pub dry_run: bool,
    pub rewrite_references: bool,
    pub delete_original: bool,
    pub max_objects: usize,
    pub page_size: usize,
    pub log_every: usize,
    pub log_capacity: usize,
    pub dry_run_delay_ms: u64,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self::from_config(&MigrationConfig::default())
    }
}

impl MigrationOptions {
    pub fn from_config(config: &MigrationConfig) -> Self {
        Self {
            prefix: config.prefix.clone(),
            source_suffix: config.source_suffix.clone(),
            target_suffix: config.target_suffix.clone(),
            concurrency: config.concurrency,
            dry_run: true,
            rewrite_references: false,
            delete_original: false,
            max_objects: config.max_objects,
            page_size: config.page_size,
            log_every: config.log_every,
            log_capacity: config.log_capacity,
            dry_run_delay_ms: config.dry_run_delay_ms,
        }
    }

    pub fn validate(&self) -> Result<(), MigrationError> {
        let invalid = |msg: &str| -> Result<(), MigrationError> { Err(MigrationError::InvalidOptions(msg.to_string())) };

        if !(1..=MAX_CONCURRENCY).contains(&self.concurrency) {
            return Err(MigrationError::InvalidOptions(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            )));
        }
        if self.source_suffix.is_empty() || self.target_suffix.is_empty() {
            return invalid("source and target suffixes are required");
        }
        if self.source_suffix == self.target_suffix {
            return invalid("source and target suffixes must differ");
        }
        if self.target_suffix.ends_with(&self.source_suffix) {
            return invalid("target suffix cannot end with the source suffix");
        }
        if self.page_size == 0 || self.max_objects == 0 || self.log_every == 0 {
            return invalid("page_size, max_objects and log_every must be positive");
        }
        Ok(())
    }
}

/// Derive the migrated key by swapping `from` for `to` at the end of `key`
pub fn target_key(key: &str, from: &str, to: &str) -> Option<String> {
    key.strip_suffix(from).map(|stem| format!("{stem}{to}"))
}

// ============================================================================
// Cancellation and Progress
// ============================================================================

/// Cooperative cancellation flag, checked between batches
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationCounts {
    pub found: u64,
    pub processed: u64,
    pub converted: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Live counters and the bounded log of a run
#[derive(Debug)]
pub struct MigrationProgress {
    found: AtomicU64,
    processed: AtomicU64,
    converted: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    log: Mutex<MigrationLog>,
}

impl MigrationProgress {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            found: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            converted: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            log: Mutex::new(MigrationLog::new(log_capacity)),
        }
    }

    pub fn counts(&self) -> MigrationCounts {
        MigrationCounts {
            found: self.found.load(Ordering::SeqCst),
            processed: self.processed.load(Ordering::SeqCst),
            converted: self.converted.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.log.lock().unwrap_or_else(|p| p.into_inner()).entries()
    }

    fn log(&self, level: LogLevel, key: Option<&str>, message: impl Into<String>) {
        self.log
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(level, key, message);
    }

    fn record(&self, outcome: ItemOutcome) {
        self.processed.fetch_add(1, Ordering::SeqCst);
        let counter = match outcome {
            ItemOutcome::Converted => &self.converted,
            ItemOutcome::Skipped => &self.skipped,
            ItemOutcome::Failed => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Converted,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    #[serde(flatten)]
    pub counts: MigrationCounts,
    pub cancelled: bool,
    pub dry_run: bool,
    pub elapsed_ms: u64,
}

// ============================================================================
// Reference Rewriting
// ============================================================================

/// Datastore side of a migration: repoint stored keys at the migrated object
#[async_trait]
pub trait MediaReferences: Send + Sync {
    async fn rewrite_media_key(&self, old_key: &str, new_key: &str) -> Result<u64, sqlx::Error>;
}

#[async_trait]
impl MediaReferences for Database {
    async fn rewrite_media_key(&self, old_key: &str, new_key: &str) -> Result<u64, sqlx::Error> {
        MediaRefOps::rewrite_media_key(self, old_key, new_key).await
    }
}

// ============================================================================
// Runner
// ============================================================================

pub struct MigrationRunner {
    store: Arc<dyn ObjectStore>,
    transcoder: Arc<dyn Transcoder>,
    references: Option<Arc<dyn MediaReferences>>,
}

impl MigrationRunner {
    pub fn new(store: Arc<dyn ObjectStore>, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            store,
            transcoder,
            references: None,
        }
    }

    pub fn with_references(mut self, references: Arc<dyn MediaReferences>) -> Self {
        self.references = Some(references);
        self
    }

    /// Collect matching objects, following the listing cursor
    pub async fn scan(&self, options: &MigrationOptions) -> Result<Vec<ObjectInfo>, MigrationError> {
        let mut matches = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .store
                .list(&options.prefix, cursor.as_deref(), options.page_size)
                .await?;

            for object in page.objects {
                if !object.key.ends_with(&options.source_suffix) {
                    continue;
                }
                matches.push(object);
                if matches.len() >= options.max_objects {
                    warn!(max_objects = options.max_objects, "Media scan hit the object cap");
                    return Ok(matches);
                }
            }

            match page.cursor {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(matches)
    }

    pub async fn run(
        &self,
        options: &MigrationOptions,
        progress: &MigrationProgress,
        abort: &AbortFlag,
    ) -> Result<MigrationSummary, MigrationError> {
        options.validate()?;
        if options.rewrite_references && self.references.is_none() {
            return Err(MigrationError::InvalidOptions(
                "reference rewriting requested but no database is attached".to_string(),
            ));
        }

        let started = Instant::now();
        progress.log(
            LogLevel::Info,
            None,
            format!(
                "Scanning '{}' for *{} objects{}",
                options.prefix,
                options.source_suffix,
                if options.dry_run { " (dry run)" } else { "" }
            ),
        );

        let objects = match self.scan(options).await {
            Ok(objects) => objects,
            Err(e) => {
                progress.log(LogLevel::Error, None, e.to_string());
                return Err(e);
            }
        };
        progress.found.store(objects.len() as u64, Ordering::SeqCst);
        progress.log(LogLevel::Info, None, format!("Found {} objects to migrate", objects.len()));
        info!(found = objects.len(), prefix = %options.prefix, dry_run = options.dry_run, "Starting media migration");

        let mut cancelled = false;
        for (batch_index, batch) in objects.chunks(options.concurrency).enumerate() {
            if abort.is_aborted() {
                cancelled = true;
                progress.log(
                    LogLevel::Warn,
                    None,
                    format!("Cancelled after {} of {} objects", batch_index * options.concurrency, objects.len()),
                );
                break;
            }

            let base = batch_index * options.concurrency;
            let outcomes = join_all(
                batch
                    .iter()
                    .enumerate()
                    .map(|(offset, object)| self.process_item(options, progress, base + offset, object)),
            )
            .await;

            for outcome in outcomes {
                progress.record(outcome);
            }
        }

        let summary = MigrationSummary {
            counts: progress.counts(),
            cancelled,
            dry_run: options.dry_run,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        progress.log(
            LogLevel::Info,
            None,
            format!(
                "Finished: {} processed, {} converted, {} skipped, {} failed",
                summary.counts.processed, summary.counts.converted, summary.counts.skipped, summary.counts.failed
            ),
        );
        info!(
            processed = summary.counts.processed,
            converted = summary.counts.converted,
            skipped = summary.counts.skipped,
            failed = summary.counts.failed,
            cancelled,
            "Media migration finished"
        );

        Ok(summary)
    }

    async fn process_item(
        &self,
        options: &MigrationOptions,
        progress: &MigrationProgress,
        index: usize,
        object: &ObjectInfo,
    ) -> ItemOutcome {
        let Some(target) = target_key(&object.key, &options.source_suffix, &options.target_suffix) else {
            return ItemOutcome::Skipped;
        };
        let verbose = (index + 1) % options.log_every == 0;

        if options.dry_run {
            tokio::time::sleep(Duration::from_millis(options.dry_run_delay_ms)).await;
            if verbose {
                progress.log(
                    LogLevel::Info,
                    Some(&object.key),
                    format!("[{}] dry run: would convert to {target}", index + 1),
                );
            }
            return ItemOutcome::Converted;
        }

        match self.migrate_object(options, &object.key, &target).await {
            Ok(outcome) => {
                if verbose {
                    let message = match outcome {
                        ItemOutcome::Skipped => format!("[{}] already converted: {target}", index + 1),
                        _ => format!("[{}] converted to {target}", index + 1),
                    };
                    progress.log(LogLevel::Info, Some(&object.key), message);
                }
                outcome
            }
            Err(e) => {
                warn!(key = %object.key, error = %e, "Media migration item failed");
                progress.log(LogLevel::Error, Some(&object.key), e.to_string());
                ItemOutcome::Failed
            }
        }
    }

    async fn migrate_object(&self, options: &MigrationOptions, key: &str, target: &str) -> Result<ItemOutcome, ItemError> {
        let already_converted = self.store.exists(target).await?;

        if !already_converted {
            let source = self.store.get(key).await?;
            let converted = self.transcoder.transcode(source).await?;
            self.store
                .put(target, converted, self.transcoder.content_type())
                .await?;
        }

        if options.rewrite_references {
            if let Some(references) = &self.references {
                references.rewrite_media_key(key, target).await?;
            }
        }

        if options.delete_original {
            self.store.delete(key).await?;
        }

        Ok(if already_converted {
            ItemOutcome::Skipped
        } else {
            ItemOutcome::Converted
        })
    }
}
