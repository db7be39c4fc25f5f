// ABOUTME: Reload command: resolve, drop, enumerate, dump/import, clean up, update
// ABOUTME: Runs each phase in order and stops at the first fatal error

use crate::alias::{self, Target};
use crate::config::ReloadOptions;
use crate::drush::DrushRunner;
use crate::migration::{self, Pipeline, PipelineReport, StageContext};
use crate::progress::ReloadProgress;
use crate::utils;
use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

/// What a successful run did
#[derive(Debug, Clone)]
pub struct ReloadSummary {
    pub source: Target,
    pub dest: Target,
    pub report: PipelineReport,
    pub dump_dir: PathBuf,
}

/// Copy every table from the source alias into the destination alias.
///
/// Phases run strictly in order:
/// 1. Resolve both aliases (local/remote, core counts)
/// 2. Drop destination tables, unless `skip_drop` is set
/// 3. List source tables and run the dump/import pipeline
/// 4. Remove the dump directory (failures are logged, never fatal)
/// 5. Run database updates on the destination
///
/// The destination is not restored if a later phase fails.
pub async fn reload(options: &ReloadOptions, runner: Arc<dyn DrushRunner>) -> Result<ReloadSummary> {
    tracing::info!(
        "Starting reload from '{}' to '{}'",
        options.source,
        options.dest
    );

    let (source, dest) = alias::resolve_targets(
        runner.as_ref(),
        &options.source,
        &options.dest,
        alias::local_core_count(),
    )
    .await
    .context("Failed to resolve site aliases")?;
    log_target("Source", &source);
    log_target("Destination", &dest);

    if options.skip_drop {
        tracing::info!("Skipping destination table drop");
    } else {
        migration::drop_tables(runner.as_ref(), &dest).await?;
    }

    let dump_dir = utils::create_dump_dir(&options.temp_root, &source.alias, &dest.alias)?;

    let mut pipeline = Pipeline::new(StageContext {
        runner: Arc::clone(&runner),
        source: source.clone(),
        dest: dest.clone(),
        dump_dir: dump_dir.clone(),
        verbose: options.verbose,
    });
    let result = pipeline
        .enumerate_and_run(&options.skip_tables, |total| {
            progress_for(&dest.alias, total)
        })
        .await;

    if let Err(e) = utils::remove_dump_dir(&options.temp_root, &dump_dir) {
        tracing::warn!(
            "The temporary dump directory was not correctly removed: {}",
            e
        );
    }

    let report = result.context("Reload failed")?;

    migration::update_database(runner.as_ref(), &dest).await?;

    tracing::info!(
        "✓ Reload complete: {} table(s) copied from '{}' to '{}'",
        report.imported,
        source.alias,
        dest.alias
    );

    Ok(ReloadSummary {
        source,
        dest,
        report,
        dump_dir,
    })
}

fn log_target(role: &str, target: &Target) {
    tracing::info!(
        "{} '{}': {} ({} core(s))",
        role,
        target.alias,
        if target.is_local { "local" } else { "remote" },
        target.core_count
    );
}

fn progress_for(dest_alias: &str, total: u64) -> ReloadProgress {
    if std::io::stderr().is_terminal() {
        ReloadProgress::new(dest_alias, total)
    } else {
        ReloadProgress::hidden(total)
    }
}
