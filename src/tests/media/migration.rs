//! Migration Runner Tests
//!
//! Runner behaviour against the in-memory object store: suffix selection,
//! skip-if-converted, per-item failure isolation, dry runs, cancellation,
//! pagination, bounded concurrency and log sampling.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::{shared, ScriptedTranscoder};
use crate::core::media::{
    AbortFlag, LogLevel, MemoryObjectStore, MigrationError, MigrationOptions, MigrationProgress, MigrationRunner,
    ObjectStore,
};
use crate::database::{ContentOps, MediaRefOps};
use crate::tests::common::{create_test_db, memory_store_with, seed_catalog, test_migration_options};

async fn run(
    store: &Arc<MemoryObjectStore>,
    transcoder: Arc<ScriptedTranscoder>,
    options: &MigrationOptions,
) -> (crate::core::media::MigrationSummary, MigrationProgress) {
    let runner = MigrationRunner::new(store.clone(), transcoder);
    let progress = MigrationProgress::new(options.log_capacity);
    let summary = runner
        .run(options, &progress, &AbortFlag::new())
        .await
        .expect("Migration failed");
    (summary, progress)
}

// =============================================================================
// Conversion
// =============================================================================

#[tokio::test]
async fn test_converts_matching_objects_only() {
    let store = memory_store_with(&[
        "audio/f/e/0001.mp3",
        "audio/f/e/0002.mp3",
        "audio/f/e/0003.wav",
        "image/f/e/0001.mp3",
    ])
    .await;

    let (summary, _) = run(&store, shared(ScriptedTranscoder::default()), &test_migration_options()).await;

    assert_eq!(summary.counts.found, 2);
    assert_eq!(summary.counts.processed, 2);
    assert_eq!(summary.counts.converted, 2);
    assert_eq!(summary.counts.failed, 0);
    assert!(!summary.cancelled);

    let converted = store.get("audio/f/e/0001.opus").await.unwrap();
    assert_eq!(converted, Bytes::from("opus:bytes of audio/f/e/0001.mp3"));
    assert_eq!(store.content_type("audio/f/e/0001.opus").await.as_deref(), Some("audio/ogg"));
    // Originals stay unless deletion is requested
    assert!(store.exists("audio/f/e/0001.mp3").await.unwrap());
    assert!(!store.exists("image/f/e/0001.opus").await.unwrap());
}

#[tokio::test]
async fn test_delete_original_and_rerun_is_noop() {
    let store = memory_store_with(&["audio/a.mp3", "audio/b.mp3"]).await;
    let options = MigrationOptions {
        delete_original: true,
        ..test_migration_options()
    };

    let (first, _) = run(&store, shared(ScriptedTranscoder::default()), &options).await;
    assert_eq!(first.counts.converted, 2);
    assert_eq!(store.keys().await, vec!["audio/a.opus", "audio/b.opus"]);

    let (second, _) = run(&store, shared(ScriptedTranscoder::default()), &options).await;
    assert_eq!(second.counts.found, 0);
    assert_eq!(second.counts.processed, 0);
}

#[tokio::test]
async fn test_existing_target_is_skipped_but_cleanup_runs() {
    let store = memory_store_with(&["audio/a.mp3", "audio/b.mp3"]).await;
    store
        .put("audio/a.opus", Bytes::from_static(b"already here"), "audio/ogg")
        .await
        .unwrap();

    let transcoder = shared(ScriptedTranscoder::default());
    let options = MigrationOptions {
        delete_original: true,
        ..test_migration_options()
    };
    let (summary, _) = run(&store, transcoder.clone(), &options).await;

    assert_eq!(summary.counts.skipped, 1);
    assert_eq!(summary.counts.converted, 1);
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.get("audio/a.opus").await.unwrap(), Bytes::from_static(b"already here"));
    assert!(!store.exists("audio/a.mp3").await.unwrap());
}

#[tokio::test]
async fn test_failed_item_does_not_stop_batch() {
    let store = memory_store_with(&["audio/1.mp3", "audio/2-bad.mp3", "audio/3.mp3", "audio/4.mp3"]).await;
    let options = MigrationOptions {
        concurrency: 4,
        delete_original: true,
        ..test_migration_options()
    };

    let (summary, progress) = run(&store, shared(ScriptedTranscoder::default()), &options).await;

    assert_eq!(summary.counts.processed, 4);
    assert_eq!(summary.counts.converted, 3);
    assert_eq!(summary.counts.failed, 1);
    // The failed source is left alone
    assert!(store.exists("audio/2-bad.mp3").await.unwrap());
    assert!(!store.exists("audio/2-bad.opus").await.unwrap());

    let errors: Vec<_> = progress
        .log_entries()
        .into_iter()
        .filter(|e| e.level == LogLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].key.as_deref(), Some("audio/2-bad.mp3"));
}

// =============================================================================
// Dry Run and Cancellation
// =============================================================================

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let store = memory_store_with(&["audio/a.mp3", "audio/b.mp3", "audio/c.mp3"]).await;
    let transcoder = shared(ScriptedTranscoder::default());
    let options = MigrationOptions {
        dry_run: true,
        delete_original: true,
        dry_run_delay_ms: 1,
        ..test_migration_options()
    };

    let (summary, progress) = run(&store, transcoder.clone(), &options).await;

    assert!(summary.dry_run);
    assert_eq!(summary.counts.processed, 3);
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.keys().await, vec!["audio/a.mp3", "audio/b.mp3", "audio/c.mp3"]);
    assert!(progress.log_entries().iter().any(|e| e.message.contains("dry run")));
}

#[tokio::test]
async fn test_abort_before_start_processes_nothing() {
    let store = memory_store_with(&["audio/a.mp3", "audio/b.mp3"]).await;
    let runner = MigrationRunner::new(store.clone(), shared(ScriptedTranscoder::default()));
    let options = test_migration_options();
    let progress = MigrationProgress::new(options.log_capacity);
    let abort = AbortFlag::new();
    abort.abort();

    let summary = runner.run(&options, &progress, &abort).await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.counts.found, 2);
    assert_eq!(summary.counts.processed, 0);
}

#[tokio::test]
async fn test_abort_takes_effect_at_batch_boundary() {
    let keys: Vec<String> = (0..6).map(|i| format!("audio/{i}.mp3")).collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let store = memory_store_with(&refs).await;

    let abort = AbortFlag::new();
    let transcoder = Arc::new(ScriptedTranscoder {
        abort_after: Some((1, abort.clone())),
        ..Default::default()
    });
    let runner = MigrationRunner::new(store.clone(), transcoder);
    let options = MigrationOptions {
        concurrency: 2,
        ..test_migration_options()
    };
    let progress = MigrationProgress::new(options.log_capacity);

    let summary = runner.run(&options, &progress, &abort).await.unwrap();

    assert!(summary.cancelled);
    // The whole first batch finishes even though the flag was raised inside it
    assert_eq!(summary.counts.processed, 2);
    assert_eq!(summary.counts.converted, 2);
    assert!(progress
        .log_entries()
        .iter()
        .any(|e| e.level == LogLevel::Warn && e.message.contains("Cancelled")));
}

// =============================================================================
// Enumeration, Concurrency and Logging
// =============================================================================

#[tokio::test]
async fn test_scan_follows_cursor_and_respects_cap() {
    let keys: Vec<String> = (0..7).map(|i| format!("audio/{i:02}.mp3")).collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let store = memory_store_with(&refs).await;
    let runner = MigrationRunner::new(store.clone(), shared(ScriptedTranscoder::default()));

    let paged = MigrationOptions {
        page_size: 2,
        ..test_migration_options()
    };
    assert_eq!(runner.scan(&paged).await.unwrap().len(), 7);

    let capped = MigrationOptions {
        page_size: 2,
        max_objects: 3,
        ..test_migration_options()
    };
    let found = runner.scan(&capped).await.unwrap();
    assert_eq!(found.len(), 3);
    assert_eq!(found[2].key, "audio/02.mp3");
}

#[tokio::test]
async fn test_concurrency_is_bounded_by_batch_size() {
    let keys: Vec<String> = (0..9).map(|i| format!("audio/{i}.mp3")).collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let store = memory_store_with(&refs).await;

    let transcoder = shared(ScriptedTranscoder::slow(Duration::from_millis(20)));
    let options = MigrationOptions {
        concurrency: 3,
        ..test_migration_options()
    };
    let (summary, _) = run(&store, transcoder.clone(), &options).await;

    assert_eq!(summary.counts.converted, 9);
    assert_eq!(transcoder.peak.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_progress_logging_is_sampled() {
    let keys: Vec<String> = (0..10).map(|i| format!("audio/{i}.mp3")).collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let store = memory_store_with(&refs).await;

    let options = MigrationOptions {
        log_every: 5,
        ..test_migration_options()
    };
    let (_, progress) = run(&store, shared(ScriptedTranscoder::default()), &options).await;

    let item_entries = progress.log_entries().into_iter().filter(|e| e.key.is_some()).count();
    assert_eq!(item_entries, 2);
}

#[tokio::test]
async fn test_log_is_capped() {
    let keys: Vec<String> = (0..20).map(|i| format!("audio/{i:02}-bad.mp3")).collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let store = memory_store_with(&refs).await;

    let options = MigrationOptions {
        log_capacity: 5,
        ..test_migration_options()
    };
    let (summary, progress) = run(&store, shared(ScriptedTranscoder::default()), &options).await;

    assert_eq!(summary.counts.failed, 20);
    let entries = progress.log_entries();
    assert_eq!(entries.len(), 5);
    assert!(entries.last().unwrap().message.starts_with("Finished"));
}

// =============================================================================
// Options and References
// =============================================================================

#[tokio::test]
async fn test_invalid_options_rejected_before_scanning() {
    let store = Arc::new(MemoryObjectStore::new());
    let runner = MigrationRunner::new(store, shared(ScriptedTranscoder::default()));
    let progress = MigrationProgress::new(10);

    let options = MigrationOptions {
        concurrency: 51,
        ..test_migration_options()
    };
    let err = runner.run(&options, &progress, &AbortFlag::new()).await.unwrap_err();
    assert!(matches!(err, MigrationError::InvalidOptions(_)));

    let options = MigrationOptions {
        rewrite_references: true,
        ..test_migration_options()
    };
    let err = runner.run(&options, &progress, &AbortFlag::new()).await.unwrap_err();
    assert!(matches!(err, MigrationError::InvalidOptions(_)));
}

#[tokio::test]
async fn test_rewrite_references_points_cards_at_new_keys() {
    let (db, _temp) = create_test_db().await;
    let catalog = seed_catalog(&db, "film-a").await;
    let keys: Vec<String> = catalog.cards.iter().filter_map(|c| c.audio_key.clone()).collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    let store = memory_store_with(&refs).await;

    let runner = MigrationRunner::new(store.clone(), shared(ScriptedTranscoder::default()))
        .with_references(Arc::new(db.clone()));
    let options = MigrationOptions {
        rewrite_references: true,
        delete_original: true,
        ..test_migration_options()
    };
    let progress = MigrationProgress::new(options.log_capacity);
    let summary = runner.run(&options, &progress, &AbortFlag::new()).await.unwrap();
    assert_eq!(summary.counts.converted, 3);

    for card in &catalog.cards {
        let stored = db.get_card(&card.id).await.unwrap().unwrap();
        let key = stored.audio_key.expect("audio key");
        assert!(key.ends_with(".opus"), "unexpected key {key}");
        assert!(store.exists(&key).await.unwrap());
        assert_eq!(db.count_media_references(&key).await.unwrap(), 1);
    }
}
