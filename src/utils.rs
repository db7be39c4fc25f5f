// ABOUTME: Utility functions for validation and dump directory management
// ABOUTME: Provides alias validation, display sanitizing, and temp directory cleanup

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Sanitize an identifier (table name, alias, etc.) for display
///
/// Removes control characters and limits length to prevent log injection and
/// keep error messages readable.
///
/// # Examples
///
/// ```
/// # use drush_reload::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\x00name"), "tablename");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
///
/// let long_name = "a".repeat(200);
/// assert_eq!(sanitize_identifier(&long_name).len(), 100);
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Validate a site alias given on the command line
///
/// Accepts aliases with or without a leading `@`; returns the bare name.
///
/// # Errors
///
/// Returns an error if the alias is empty or contains whitespace, path
/// separators or control characters. The alias ends up in the dump directory
/// name, so anything that would change the path is rejected.
pub fn validate_alias(alias: &str) -> Result<String> {
    let bare = alias.trim().trim_start_matches('@');
    if bare.is_empty() {
        bail!("Alias cannot be empty");
    }

    if let Some(c) = bare
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || *c == '/' || *c == '\\')
    {
        bail!(
            "Alias '{}' contains invalid character {:?}",
            sanitize_identifier(bare),
            c
        );
    }

    Ok(bare.to_string())
}

/// Validate that source and destination aliases are different
///
/// Reloading an alias onto itself drops every table before dumping it.
///
/// # Examples
///
/// ```
/// # use drush_reload::utils::validate_source_dest_different;
/// assert!(validate_source_dest_different("prod", "stage").is_ok());
/// assert!(validate_source_dest_different("prod", "@prod").is_err());
/// ```
pub fn validate_source_dest_different(source: &str, dest: &str) -> Result<()> {
    let source = source.trim().trim_start_matches('@');
    let dest = dest.trim().trim_start_matches('@');

    if source == dest {
        bail!(
            "Source and destination aliases are the same ('{}')!\n\
             \n\
             This would drop every table on the source before dumping it.\n\
             Please check the -s and -d arguments.",
            sanitize_identifier(source)
        );
    }

    Ok(())
}

/// Directory name for one run: `<unix-ms>-<source>-<dest>`
pub fn dump_dir_name(timestamp_ms: u128, source: &str, dest: &str) -> String {
    format!("{}-{}-{}", timestamp_ms, source, dest)
}

/// Create the dump directory for a run under `temp_root`
///
/// # Errors
///
/// Returns an error if the directory cannot be created or already exists.
pub fn create_dump_dir(temp_root: &Path, source: &str, dest: &str) -> Result<PathBuf> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the Unix epoch")?
        .as_millis();

    create_run_dir(temp_root, &dump_dir_name(timestamp, source, dest))
}

/// Create `temp_root/name`, failing if it already exists
fn create_run_dir(temp_root: &Path, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(temp_root)
        .with_context(|| format!("Failed to create temp root at {}", temp_root.display()))?;

    let path = temp_root.join(name);
    std::fs::create_dir(&path).with_context(|| {
        format!(
            "Failed to create dump directory at {} (another run may be using it)",
            path.display()
        )
    })?;

    tracing::debug!("Created dump directory: {}", path.display());
    Ok(path)
}

/// Remove a dump directory created by `create_dump_dir()`
///
/// # Errors
///
/// Refuses to remove anything that is not a direct child of `temp_root`.
/// Returns `ReloadError::Cleanup` if removal fails.
pub fn remove_dump_dir(temp_root: &Path, path: &Path) -> Result<(), crate::error::ReloadError> {
    use crate::error::ReloadError;

    if path.parent() != Some(temp_root) || path.file_name().is_none() {
        return Err(ReloadError::Cleanup {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "refusing to remove a directory outside the temp root",
            ),
        });
    }

    tracing::debug!("Removing dump directory: {}", path.display());

    std::fs::remove_dir_all(path).map_err(|source| ReloadError::Cleanup {
        path: path.to_path_buf(),
        source,
    })
}
