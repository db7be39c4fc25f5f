// ABOUTME: Integration tests for the dump/import pipeline coordinator
// ABOUTME: Covers scheduling, concurrency bounds, causal ordering, and abort behaviour

mod common;

use common::{dump_body, FakeDrush};
use drush_reload::alias::Target;
use drush_reload::migration::{Pipeline, PipelineState, StageContext};
use drush_reload::progress::ReloadProgress;
use drush_reload::ReloadError;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn target(alias: &str, cores: usize) -> Target {
    Target {
        alias: alias.to_string(),
        is_local: true,
        core_count: cores,
    }
}

fn pipeline(fake: &Arc<FakeDrush>, dir: &Path, source_cores: usize, dest_cores: usize) -> Pipeline {
    Pipeline::new(StageContext {
        runner: Arc::clone(fake) as Arc<dyn drush_reload::drush::DrushRunner>,
        source: target("prod", source_cores),
        dest: target("stage", dest_cores),
        dump_dir: dir.to_path_buf(),
        verbose: false,
    })
}

fn tables(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("table_{i}")).collect()
}

fn sorted(mut v: Vec<String>) -> Vec<String> {
    v.sort();
    v
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_table_is_dumped_and_imported_once() {
    let dir = tempfile::tempdir().unwrap();
    let names = tables(10);
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let fake = Arc::new(FakeDrush::with_tables(&refs));
    let progress = ReloadProgress::hidden(names.len() as u64);

    let mut pipeline = pipeline(&fake, dir.path(), 2, 3);
    let report = pipeline.run(names.clone(), &progress).await.unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(report.scheduled, 10);
    assert_eq!(report.dumped, 10);
    assert_eq!(report.imported, 10);
    assert_eq!(progress.completed(), 10);
    assert_eq!(sorted(fake.dumped_tables()), sorted(names.clone()));
    assert_eq!(sorted(fake.imported_tables()), sorted(names.clone()));
    assert!(fake.ordering_violations().is_empty());

    // One decompressed file per table, nothing else
    let mut files: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    files.sort();
    let expected: Vec<String> = sorted(names.iter().map(|t| format!("{t}.sql")).collect());
    assert_eq!(files, expected);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("table_3.sql")).unwrap(),
        dump_body("table_3")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrency_never_exceeds_core_counts() {
    let dir = tempfile::tempdir().unwrap();
    let names = tables(16);
    let fake = Arc::new(FakeDrush::with_tables(&[]).delay(Duration::from_millis(20)));
    let progress = ReloadProgress::hidden(16);

    let mut pipeline = pipeline(&fake, dir.path(), 2, 3);
    pipeline.run(names, &progress).await.unwrap();

    assert!(fake.peak_dumps() >= 1 && fake.peak_dumps() <= 2);
    assert!(fake.peak_imports() >= 1 && fake.peak_imports() <= 3);
}

#[tokio::test]
async fn test_single_core_targets_still_make_progress() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeDrush::with_tables(&[]));
    let progress = ReloadProgress::hidden(4);

    let mut pipeline = pipeline(&fake, dir.path(), 0, 1);
    let report = pipeline.run(tables(4), &progress).await.unwrap();

    assert_eq!(report.imported, 4);
    assert_eq!(fake.peak_dumps(), 1);
    assert_eq!(fake.peak_imports(), 1);
}

#[tokio::test]
async fn test_enumeration_drops_sentinel_entries() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeDrush::with_tables(&["node", "user", "."]));

    let mut pipeline = pipeline(&fake, dir.path(), 2, 2);
    let report = pipeline
        .enumerate_and_run(&HashSet::new(), ReloadProgress::hidden)
        .await
        .unwrap();

    assert_eq!(report.scheduled, 2);
    assert_eq!(sorted(fake.dumped_tables()), vec!["node", "user"]);
}

#[tokio::test]
async fn test_enumeration_applies_skip_list() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeDrush::with_tables(&["cache", "queue"]));
    let skip: HashSet<String> = ["queue".to_string()].into_iter().collect();

    let mut pipeline = pipeline(&fake, dir.path(), 2, 2);
    let report = pipeline
        .enumerate_and_run(&skip, ReloadProgress::hidden)
        .await
        .unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(fake.dumped_tables(), vec!["cache"]);
    assert_eq!(fake.imported_tables(), vec!["cache"]);
}

#[tokio::test]
async fn test_enumeration_keeps_unicode_and_spaced_names() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeDrush::with_tables(&[
        "node",
        "données",
        "order items",
        "cache.form",
    ]));

    let mut pipeline = pipeline(&fake, dir.path(), 2, 2);
    let report = pipeline
        .enumerate_and_run(&HashSet::new(), ReloadProgress::hidden)
        .await
        .unwrap();

    assert_eq!(report.scheduled, 4);
    assert_eq!(report.imported, 4);
    assert_eq!(
        sorted(fake.imported_tables()),
        vec!["cache.form", "données", "node", "order items"]
    );
    assert!(fake.ordering_violations().is_empty());
    assert!(dir.path().join("order items.sql").exists());
}

#[tokio::test]
async fn test_hostile_table_name_fails_enumeration() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeDrush::with_tables(&["node", "../../etc/cron.d/x"]));

    let mut pipeline = pipeline(&fake, dir.path(), 2, 2);
    let err = pipeline
        .enumerate_and_run(&HashSet::new(), ReloadProgress::hidden)
        .await
        .unwrap_err();

    assert!(matches!(err, ReloadError::TableList { .. }));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(fake.calls_to("sql-dump").is_empty());
}

#[tokio::test]
async fn test_dump_failure_aborts_without_importing_that_table() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeDrush::with_tables(&[]).failing_dump("user"));
    let progress = ReloadProgress::hidden(3);

    let mut pipeline = pipeline(&fake, dir.path(), 1, 1);
    let err = pipeline
        .run(
            vec!["node".to_string(), "user".to_string(), "cache".to_string()],
            &progress,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReloadError::Dump { ref table, .. } if table == "user"));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(!fake.imported_tables().contains(&"user".to_string()));
    assert!(fake
        .calls_to("sqlc")
        .iter()
        .all(|inv| !inv.stdin_file.as_ref().unwrap().ends_with("user.sql")));
    // With one dump worker, "cache" was still queued and never started
    assert!(!fake.dumped_tables().contains(&"cache".to_string()));
}

#[tokio::test]
async fn test_import_failure_stops_scheduling() {
    let dir = tempfile::tempdir().unwrap();
    let names = tables(8);
    let fake = Arc::new(FakeDrush::with_tables(&[]).failing_import("table_0"));
    let progress = ReloadProgress::hidden(8);

    let mut pipeline = pipeline(&fake, dir.path(), 1, 1);
    let err = pipeline.run(names, &progress).await.unwrap_err();

    assert!(matches!(err, ReloadError::Import { ref table, .. } if table == "table_0"));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(fake.calls_to("sqlc").len() < 8);
    assert!(fake.dumped_tables().len() < 8);
    assert!((progress.completed() as usize) < 8);
}

#[tokio::test]
async fn test_empty_table_set_completes_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let fake = Arc::new(FakeDrush::with_tables(&["."]));

    let mut pipeline = pipeline(&fake, dir.path(), 4, 4);
    let report = pipeline
        .enumerate_and_run(&HashSet::new(), ReloadProgress::hidden)
        .await
        .unwrap();

    assert_eq!(pipeline.state(), PipelineState::Done);
    assert_eq!(report.scheduled, 0);
    assert_eq!(report.imported, 0);
    assert!(fake.calls_to("sql-dump").is_empty());
}
