// ABOUTME: Error taxonomy for a reload run
// ABOUTME: Every fatal stage failure maps to one variant; the first one aborts the run

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised by the reload stages.
///
/// `CoreLookup` and `Cleanup` are recoverable: callers log them and carry on.
/// Every other variant aborts the run at first occurrence.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("failed to resolve alias '{alias}': {source}")]
    AliasResolution {
        alias: String,
        #[source]
        source: Box<ReloadError>,
    },

    #[error("could not read core count for '{alias}': {reason}")]
    CoreLookup { alias: String, reason: String },

    #[error("failed to list tables on '{alias}': {source}")]
    TableList {
        alias: String,
        #[source]
        source: Box<ReloadError>,
    },

    #[error("invalid table name '{name}': {reason}")]
    InvalidTable { name: String, reason: String },

    #[error("failed to dump table '{table}': {source}")]
    Dump {
        table: String,
        #[source]
        source: Box<ReloadError>,
    },

    #[error("failed to import table '{table}': {source}")]
    Import {
        table: String,
        #[source]
        source: Box<ReloadError>,
    },

    #[error("failed to drop tables on '{alias}': {source}")]
    Drop {
        alias: String,
        #[source]
        source: Box<ReloadError>,
    },

    #[error("post-migration update failed on '{alias}': {source}")]
    PostMigration {
        alias: String,
        #[source]
        source: Box<ReloadError>,
    },

    #[error("failed to clean up {}: {source}", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Command {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("job for table '{table}' was not started because the run aborted")]
    Cancelled { table: String },

    #[error("worker task panicked or was aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ReloadError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ReloadError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn dump(table: &str, source: ReloadError) -> Self {
        ReloadError::Dump {
            table: table.to_string(),
            source: Box::new(source),
        }
    }

    pub fn import(table: &str, source: ReloadError) -> Self {
        ReloadError::Import {
            table: table.to_string(),
            source: Box::new(source),
        }
    }

    /// True for errors produced by a job that never ran
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ReloadError::Cancelled { .. })
    }
}
