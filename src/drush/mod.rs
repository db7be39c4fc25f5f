// ABOUTME: Wrapper around the drush command line for every upstream operation
// ABOUTME: Defines the DrushRunner seam and the process-backed implementation

use crate::error::ReloadError;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use which::which;

/// Default program name looked up in PATH
pub const DEFAULT_DRUSH: &str = "drush";

/// Remote command used to count processors on a remote alias
const CPU_COUNT_COMMAND: &str = "grep -c ^processor /proc/cpuinfo";

/// One drush invocation: optional `@alias`, arguments, optional stdin file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub alias: Option<String>,
    pub args: Vec<String>,
    pub stdin_file: Option<PathBuf>,
}

impl Invocation {
    fn new(alias: Option<&str>, args: &[&str]) -> Self {
        Self {
            alias: alias.map(str::to_string),
            args: args.iter().map(|a| a.to_string()).collect(),
            stdin_file: None,
        }
    }

    /// `drush sa <alias> --full`
    pub fn site_alias(alias: &str) -> Self {
        Self::new(None, &["sa", alias, "--full"])
    }

    /// `drush @alias ssh "grep -c ^processor /proc/cpuinfo"`
    pub fn cpu_count(alias: &str) -> Self {
        Self::new(Some(alias), &["ssh", CPU_COUNT_COMMAND])
    }

    /// `drush @alias sqlq --extra=--skip-column-names "SHOW TABLES"`
    pub fn list_tables(alias: &str) -> Self {
        Self::new(
            Some(alias),
            &["sqlq", "--extra=--skip-column-names", "SHOW TABLES"],
        )
    }

    /// `drush @alias sql-dump --gzip --tables-list=<table>`
    pub fn dump_table(alias: &str, table: &str) -> Self {
        let tables_list = format!("--tables-list={}", table);
        Self::new(Some(alias), &["sql-dump", "--gzip", &tables_list])
    }

    /// `drush @alias sql-drop --yes`
    pub fn drop_tables(alias: &str) -> Self {
        Self::new(Some(alias), &["sql-drop", "--yes"])
    }

    /// `drush @alias sqlc < <path>`
    pub fn import_file(alias: &str, path: &Path) -> Self {
        let mut invocation = Self::new(Some(alias), &["sqlc"]);
        invocation.stdin_file = Some(path.to_path_buf());
        invocation
    }

    /// `drush @alias updb --yes`
    pub fn update_database(alias: &str) -> Self {
        Self::new(Some(alias), &["updb", "--yes"])
    }

    /// Arguments as passed to the program, alias first
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        if let Some(alias) = &self.alias {
            argv.push(format!("@{}", alias));
        }
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Subcommand name, used to tell invocations apart
    pub fn subcommand(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "drush {}", self.argv().join(" "))?;
        if let Some(path) = &self.stdin_file {
            write!(f, " < {}", path.display())?;
        }
        Ok(())
    }
}

/// Runs drush invocations and returns captured stdout as raw bytes.
///
/// Implementations must be shareable across worker tasks.
#[async_trait]
pub trait DrushRunner: Send + Sync {
    async fn exec(&self, invocation: &Invocation) -> Result<Vec<u8>, ReloadError>;
}

/// Runs drush as a child process
#[derive(Debug, Clone)]
pub struct Drush {
    program: PathBuf,
}

impl Drush {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for Drush {
    fn default() -> Self {
        Self::new(DEFAULT_DRUSH)
    }
}

#[async_trait]
impl DrushRunner for Drush {
    async fn exec(&self, invocation: &Invocation) -> Result<Vec<u8>, ReloadError> {
        let command_line = invocation.to_string();
        tracing::debug!("Running {}", command_line);

        let stdin = match &invocation.stdin_file {
            Some(path) => {
                let file = tokio::fs::File::open(path).await.map_err(|e| {
                    ReloadError::io(format!("failed to open {}", path.display()), e)
                })?;
                Stdio::from(file.into_std().await)
            }
            None => Stdio::null(),
        };

        let output = Command::new(&self.program)
            .args(invocation.argv())
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ReloadError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ReloadError::Command {
                command: command_line,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Check that the drush program can be found
///
/// Accepts either a bare program name looked up in PATH or an explicit path.
///
/// # Errors
///
/// Returns an error with installation guidance if the program is missing.
pub fn check_drush_available(program: &Path) -> anyhow::Result<()> {
    if program.components().count() > 1 {
        if program.is_file() {
            return Ok(());
        }
        anyhow::bail!("drush executable not found at {}", program.display());
    }

    if which(program).is_err() {
        anyhow::bail!(
            "Missing required tool: {}\n\
             \n\
             Please install Drush and make sure it is in PATH:\n\
             - Composer: composer global require drush/drush\n\
             - Or pass an explicit path with --drush /path/to/drush",
            program.display()
        );
    }

    Ok(())
}
