// ABOUTME: Enumerates the source tables to reload
// ABOUTME: Splits the listing, drops sentinels and skipped tables, validates names

use crate::alias::Target;
use crate::drush::{DrushRunner, Invocation};
use crate::error::ReloadError;
use std::collections::HashSet;

/// Entries the listing may carry that are never real tables
const SENTINELS: &[&str] = &["", "."];

/// Filter raw `SHOW TABLES` output into the tables to reload.
///
/// Keeps listing order, removes duplicates, sentinel entries and anything in
/// `skip`.
pub fn filter_tables(listing: &str, skip: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    listing
        .lines()
        .map(str::trim)
        .filter(|name| !SENTINELS.contains(name))
        .filter(|name| !skip.contains(*name))
        .filter(|name| seen.insert(name.to_string()))
        .map(str::to_string)
        .collect()
}

/// Validate a table name before it is used as a dump file name and passed
/// through drush to the database client
///
/// Drush is run without a shell, so quoting and metacharacters are harmless.
/// What matters is the file name inside the dump directory and the argument
/// position on the command line.
///
/// # Errors
///
/// Rejects path separators, NUL and other control characters, the names `.`
/// and `..`, a leading `-`, and names longer than 64 characters.
pub fn validate_table_name(name: &str) -> Result<(), ReloadError> {
    let invalid = |reason: String| ReloadError::InvalidTable {
        name: crate::utils::sanitize_identifier(name),
        reason,
    };

    let length = name.chars().count();
    if length > 64 {
        return Err(invalid(format!(
            "exceeds maximum length of 64 characters (got {})",
            length
        )));
    }
    if name == "." || name == ".." {
        return Err(invalid("is a relative path component".to_string()));
    }
    if name.starts_with('-') {
        return Err(invalid("must not start with '-'".to_string()));
    }

    for (i, c) in name.chars().enumerate() {
        if c == '/' || c == '\\' || c.is_control() {
            let shown = if c.is_control() {
                format!("\\x{:02x}", c as u32)
            } else {
                c.to_string()
            };
            return Err(invalid(format!(
                "contains invalid character '{}' at position {}",
                shown, i
            )));
        }
    }

    Ok(())
}

/// List the tables on the source target, minus the skip-list
pub async fn list_tables(
    runner: &dyn DrushRunner,
    source: &Target,
    skip: &HashSet<String>,
) -> Result<Vec<String>, ReloadError> {
    let table_list_error = |e: ReloadError| ReloadError::TableList {
        alias: source.alias.clone(),
        source: Box::new(e),
    };

    let output = runner
        .exec(&Invocation::list_tables(&source.alias))
        .await
        .map_err(table_list_error)?;

    let tables = filter_tables(&String::from_utf8_lossy(&output), skip);
    for table in &tables {
        validate_table_name(table).map_err(table_list_error)?;
    }

    tracing::info!(
        "Found {} table(s) to reload on '{}'",
        tables.len(),
        source.alias
    );
    Ok(tables)
}
