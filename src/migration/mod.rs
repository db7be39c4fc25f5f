// ABOUTME: Reload pipeline: dump and import stages, worker pools, coordinator
// ABOUTME: Also holds the destination drop and post-migration update steps

pub mod dump;
pub mod finalize;
pub mod import;
pub mod pipeline;
pub mod pool;

pub use dump::{dump_table, DumpJob, DumpResult};
pub use finalize::{drop_tables, update_database};
pub use import::import_dump;
pub use pipeline::{Pipeline, PipelineReport, PipelineState, StageContext};
pub use pool::{AbortSignal, WorkerPool};
