// ABOUTME: Parses the optional TOML config file and resolves run options
// ABOUTME: Merges CLI flags over file settings into an immutable ReloadOptions

use crate::drush::DEFAULT_DRUSH;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings that may be kept in a config file
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Path to the drush program
    pub drush: Option<PathBuf>,
    #[serde(default)]
    pub skip_tables: Vec<String>,
    #[serde(default)]
    pub skip_drop: bool,
    /// Directory under which the per-run dump directory is created
    pub temp_root: Option<PathBuf>,
}

pub fn load_config_file(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    toml::from_str(&raw)
        .with_context(|| format!("Failed to parse TOML config at {}", path.display()))
}

/// Resolved options for a run, passed by reference to every stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadOptions {
    pub source: String,
    pub dest: String,
    pub skip_tables: HashSet<String>,
    pub verbose: bool,
    pub skip_drop: bool,
    pub drush: PathBuf,
    pub temp_root: PathBuf,
}

/// Flags as they arrive from the command line
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub source: String,
    pub dest: String,
    pub skip_tables: Vec<String>,
    pub verbose: bool,
    pub skip_drop: bool,
    pub drush: Option<PathBuf>,
}

impl ReloadOptions {
    /// CLI flags win over file settings; skip lists are unioned and boolean
    /// flags are enabled if either side sets them.
    pub fn resolve(cli: CliOverrides, file: FileConfig) -> Result<Self> {
        let source = crate::utils::validate_alias(&cli.source).context("Invalid source alias")?;
        let dest = crate::utils::validate_alias(&cli.dest).context("Invalid destination alias")?;
        crate::utils::validate_source_dest_different(&source, &dest)?;

        let skip_tables = cli
            .skip_tables
            .into_iter()
            .chain(file.skip_tables)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self {
            source,
            dest,
            skip_tables,
            verbose: cli.verbose,
            skip_drop: cli.skip_drop || file.skip_drop,
            drush: cli
                .drush
                .or(file.drush)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DRUSH)),
            temp_root: file.temp_root.unwrap_or_else(std::env::temp_dir),
        })
    }
}
