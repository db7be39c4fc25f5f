// ABOUTME: Import stage: loads one dump file into the destination via drush sqlc
// ABOUTME: Ticks the shared progress counter once per successful import

use super::dump::DumpResult;
use crate::alias::Target;
use crate::drush::{DrushRunner, Invocation};
use crate::error::ReloadError;
use crate::progress::ReloadProgress;

/// Import a finished dump into the destination
pub async fn import_dump(
    runner: &dyn DrushRunner,
    dest: &Target,
    dump: &DumpResult,
    progress: &ReloadProgress,
) -> Result<(), ReloadError> {
    runner
        .exec(&Invocation::import_file(&dest.alias, &dump.file_path))
        .await
        .map_err(|e| ReloadError::import(&dump.table, e))?;

    let done = progress.tick();
    tracing::debug!(
        "Imported '{}' into '{}' ({}/{})",
        dump.table,
        dest.alias,
        done,
        progress.total()
    );
    Ok(())
}
