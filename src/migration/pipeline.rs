// ABOUTME: Coordinates the dump and import pools for a reload run
// ABOUTME: Feeds each finished dump into the import pool and reports completion once both drain

use super::dump::{dump_table, DumpJob, DumpResult};
use super::import::import_dump;
use super::pool::{AbortSignal, WorkerPool};
use crate::alias::Target;
use crate::drush::DrushRunner;
use crate::error::ReloadError;
use crate::progress::ReloadProgress;
use crate::tables::list_tables;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Lifecycle of a reload run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Enumerating,
    /// Dump and import pools both active
    Transferring,
    /// Dump pool drained, imports still outstanding
    Draining,
    Done,
    Failed,
}

/// Everything the stages need, shared read-only by every job
pub struct StageContext {
    pub runner: Arc<dyn DrushRunner>,
    pub source: Target,
    pub dest: Target,
    pub dump_dir: PathBuf,
    /// Log each dump and import start at info level
    pub verbose: bool,
}

/// Outcome of a successful pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub scheduled: usize,
    pub dumped: usize,
    pub imported: usize,
    pub bytes_dumped: u64,
}

pub struct Pipeline {
    ctx: Arc<StageContext>,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(ctx: StageContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn transition(&mut self, next: PipelineState) {
        tracing::debug!("Pipeline state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// List the source tables, then dump and import each of them.
    ///
    /// `make_progress` receives the number of scheduled tables.
    pub async fn enumerate_and_run(
        &mut self,
        skip: &HashSet<String>,
        make_progress: impl FnOnce(u64) -> ReloadProgress,
    ) -> Result<PipelineReport, ReloadError> {
        self.transition(PipelineState::Enumerating);
        let listed = list_tables(self.ctx.runner.as_ref(), &self.ctx.source, skip).await;
        let tables = match listed {
            Ok(tables) => tables,
            Err(e) => {
                self.transition(PipelineState::Failed);
                return Err(e);
            }
        };

        let progress = make_progress(tables.len() as u64);
        self.run(tables, &progress).await
    }

    /// Dump and import every table.
    ///
    /// The first failure closes both pools so no queued job starts; jobs
    /// already running are awaited before that failure is returned.
    pub async fn run(
        &mut self,
        tables: Vec<String>,
        progress: &ReloadProgress,
    ) -> Result<PipelineReport, ReloadError> {
        let mut report = PipelineReport {
            scheduled: tables.len(),
            ..Default::default()
        };

        let abort = AbortSignal::new();
        let mut dumps: WorkerPool<DumpResult> =
            WorkerPool::paused("dump", self.ctx.source.core_count, abort.clone());
        let mut imports: WorkerPool<String> =
            WorkerPool::new("import", self.ctx.dest.core_count, abort);

        tracing::info!(
            "Reloading {} table(s) from '{}' ({} dump workers) into '{}' ({} import workers)",
            tables.len(),
            self.ctx.source.alias,
            dumps.size(),
            self.ctx.dest.alias,
            imports.size()
        );

        for table in tables {
            let job = DumpJob::new(&self.ctx.dump_dir, table);
            let ctx = Arc::clone(&self.ctx);
            dumps.push(job.table.clone(), async move {
                if ctx.verbose {
                    tracing::info!("Dumping {}.", job.table);
                }
                dump_table(ctx.runner.as_ref(), &ctx.source, job).await
            });
        }

        self.transition(PipelineState::Transferring);
        dumps.resume();

        let mut first_error: Option<ReloadError> = None;

        loop {
            tokio::select! {
                Some(result) = dumps.join_next(), if !dumps.is_drained() => {
                    match result {
                        Ok(dump) if first_error.is_none() => {
                            report.dumped += 1;
                            report.bytes_dumped += dump.bytes_written;
                            self.schedule_import(&mut imports, dump, progress);
                        }
                        Ok(dump) => {
                            tracing::debug!("Discarding dump of '{}' after abort", dump.table);
                        }
                        Err(e) => record_failure(&mut first_error, e, &dumps, &imports),
                    }

                    if dumps.is_drained() && first_error.is_none() {
                        self.transition(PipelineState::Draining);
                    }
                }
                Some(result) = imports.join_next(), if !imports.is_drained() => {
                    match result {
                        Ok(_table) => report.imported += 1,
                        Err(e) => record_failure(&mut first_error, e, &dumps, &imports),
                    }
                }
                else => break,
            }
        }

        if let Some(e) = first_error {
            self.transition(PipelineState::Failed);
            progress.abandon();
            return Err(e);
        }

        self.transition(PipelineState::Done);
        progress.finish();
        tracing::info!(
            "✓ Reloaded {} table(s) into '{}'",
            report.imported,
            self.ctx.dest.alias
        );
        Ok(report)
    }

    fn schedule_import(
        &self,
        imports: &mut WorkerPool<String>,
        dump: DumpResult,
        progress: &ReloadProgress,
    ) {
        let ctx = Arc::clone(&self.ctx);
        let progress = progress.clone();
        imports.push(dump.table.clone(), async move {
            if ctx.verbose {
                tracing::info!("Importing {}.", dump.table);
            }
            import_dump(ctx.runner.as_ref(), &ctx.dest, &dump, &progress).await?;
            Ok(dump.table)
        });
    }
}

fn record_failure<A, B>(
    first_error: &mut Option<ReloadError>,
    error: ReloadError,
    dumps: &WorkerPool<A>,
    imports: &WorkerPool<B>,
) where
    A: Send + 'static,
    B: Send + 'static,
{
    // A job can be cancelled by a sibling's failure before the coordinator
    // sees that failure; the real error replaces the cancellation.
    if let Some(existing) = first_error.as_ref() {
        if existing.is_cancelled() && !error.is_cancelled() {
            tracing::error!("{}", error);
            *first_error = Some(error);
        } else if !error.is_cancelled() {
            tracing::warn!("Additional failure while aborting: {}", error);
        }
        return;
    }

    tracing::error!("{}", error);
    tracing::warn!(
        "Aborting reload; waiting for in-flight jobs ({} dump, {} import outstanding)",
        dumps.outstanding(),
        imports.outstanding()
    );
    dumps.close();
    imports.close();
    *first_error = Some(error);
}
