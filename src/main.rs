// ABOUTME: CLI entry point for drush-reload
// ABOUTME: Parses flags, sets up logging, and runs the reload command

use clap::Parser;
use drush_reload::commands;
use drush_reload::config::{load_config_file, CliOverrides, FileConfig, ReloadOptions};
use drush_reload::drush::{check_drush_available, Drush};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "drush-reload", version)]
#[command(
    about = "Reload a Drupal database from one Drush alias into another, table by table in parallel",
    long_about = None
)]
struct Cli {
    /// Source site alias
    #[arg(short = 's', long = "source")]
    source: String,
    /// Destination site alias
    #[arg(short = 'd', long = "dest")]
    dest: String,
    /// Tables to skip (comma-separated)
    #[arg(short = 't', long = "skip-tables", value_delimiter = ',')]
    skip_tables: Vec<String>,
    /// Log each table as it is dumped and imported
    #[arg(short = 'v', long)]
    verbose: bool,
    /// Do not drop destination tables before importing
    #[arg(short = 'r', long = "skip-drop")]
    skip_drop: bool,
    /// TOML config file with default settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Path to the drush executable
    #[arg(long)]
    drush: Option<PathBuf>,
}

impl Cli {
    fn into_options(self) -> anyhow::Result<ReloadOptions> {
        let file = match &self.config {
            Some(path) => load_config_file(path)?,
            None => FileConfig::default(),
        };

        ReloadOptions::resolve(
            CliOverrides {
                source: self.source,
                dest: self.dest,
                skip_tables: self.skip_tables,
                verbose: self.verbose,
                skip_drop: self.skip_drop,
                drush: self.drush,
            },
            file,
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging - default to INFO level if RUST_LOG not set
    let default_filter = if cli.verbose {
        "info,drush_reload=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = cli.into_options()?;
    check_drush_available(&options.drush)?;

    let runner = Arc::new(Drush::new(options.drush.clone()));
    commands::reload(&options, runner).await?;
    Ok(())
}
