// ABOUTME: Resolves source and destination aliases into Targets
// ABOUTME: Detects local vs remote aliases and sizes concurrency from core counts

use crate::drush::{DrushRunner, Invocation};
use crate::error::ReloadError;

/// Marker present in `drush sa --full` output for aliases on another host
const REMOTE_HOST_MARKER: &str = "remote-host";

/// A resolved environment. Immutable after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub alias: String,
    pub is_local: bool,
    pub core_count: usize,
}

/// Logical CPU count of this machine, used for local aliases and as fallback
pub fn local_core_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Classify alias metadata: local unless it names a remote host
pub fn is_local_alias(metadata: &str) -> bool {
    !metadata.contains(REMOTE_HOST_MARKER)
}

/// Parse the first run of ASCII digits in a core-count response
///
/// Returns `None` for empty output, output without digits, or a zero count.
pub fn parse_core_count(output: &str) -> Option<usize> {
    let digits: String = output
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    match digits.parse::<usize>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}

/// Resolve one alias into a Target.
///
/// Core lookup failures never abort: the default core count is used and a
/// warning is logged.
pub async fn resolve_target(
    runner: &dyn DrushRunner,
    alias: &str,
    default_cores: usize,
) -> Result<Target, ReloadError> {
    let metadata = runner
        .exec(&Invocation::site_alias(alias))
        .await
        .map_err(|e| ReloadError::AliasResolution {
            alias: alias.to_string(),
            source: Box::new(e),
        })?;
    let is_local = is_local_alias(&String::from_utf8_lossy(&metadata));

    let core_count = if is_local {
        default_cores.max(1)
    } else {
        match lookup_remote_cores(runner, alias).await {
            Ok(cores) => cores,
            Err(e) => {
                tracing::warn!("{}; using default of {} cores", e, default_cores);
                default_cores.max(1)
            }
        }
    };

    tracing::debug!(
        "Resolved alias '{}' (local={}, cores={})",
        alias,
        is_local,
        core_count
    );

    Ok(Target {
        alias: alias.to_string(),
        is_local,
        core_count,
    })
}

async fn lookup_remote_cores(runner: &dyn DrushRunner, alias: &str) -> Result<usize, ReloadError> {
    let output = runner
        .exec(&Invocation::cpu_count(alias))
        .await
        .map_err(|e| ReloadError::CoreLookup {
            alias: alias.to_string(),
            reason: e.to_string(),
        })?;
    let text = String::from_utf8_lossy(&output);

    parse_core_count(&text).ok_or_else(|| ReloadError::CoreLookup {
        alias: alias.to_string(),
        reason: if text.trim().is_empty() {
            "empty response".to_string()
        } else {
            format!("unparseable response '{}'", text.trim())
        },
    })
}

/// Resolve the source and destination aliases concurrently
pub async fn resolve_targets(
    runner: &dyn DrushRunner,
    source: &str,
    dest: &str,
    default_cores: usize,
) -> Result<(Target, Target), ReloadError> {
    futures::try_join!(
        resolve_target(runner, source, default_cores),
        resolve_target(runner, dest, default_cores),
    )
}
