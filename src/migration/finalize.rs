// ABOUTME: Destination steps around the pipeline: table drop before, updb after
// ABOUTME: Both run through drush against the destination alias

use crate::alias::Target;
use crate::drush::{DrushRunner, Invocation};
use crate::error::ReloadError;

/// Drop every table on the destination before reloading
pub async fn drop_tables(runner: &dyn DrushRunner, dest: &Target) -> Result<(), ReloadError> {
    tracing::info!("Dropping all tables on '{}'", dest.alias);

    runner
        .exec(&Invocation::drop_tables(&dest.alias))
        .await
        .map_err(|e| ReloadError::Drop {
            alias: dest.alias.clone(),
            source: Box::new(e),
        })?;

    tracing::info!("✓ Destination tables dropped");
    Ok(())
}

/// Run pending schema updates on the destination after the import
pub async fn update_database(runner: &dyn DrushRunner, dest: &Target) -> Result<(), ReloadError> {
    tracing::info!("Running database updates on '{}'", dest.alias);

    let output = runner
        .exec(&Invocation::update_database(&dest.alias))
        .await
        .map_err(|e| ReloadError::PostMigration {
            alias: dest.alias.clone(),
            source: Box::new(e),
        })?;

    let text = String::from_utf8_lossy(&output);
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        tracing::debug!("updb: {}", line.trim());
    }

    tracing::info!("✓ Database updates complete");
    Ok(())
}
