// ABOUTME: Dump stage: exports one table through drush sql-dump --gzip
// ABOUTME: Decompresses the dump incrementally into <table>.sql in the run directory

use crate::alias::Target;
use crate::drush::{DrushRunner, Invocation};
use crate::error::ReloadError;
use flate2::write::GzDecoder;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Compressed bytes fed to the decoder per step
const CHUNK_SIZE: usize = 64 * 1024;

/// A table scheduled for dumping and the file it will be written to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpJob {
    pub table: String,
    pub output_path: PathBuf,
}

impl DumpJob {
    pub fn new(dump_dir: &Path, table: impl Into<String>) -> Self {
        let table = table.into();
        let output_path = dump_dir.join(format!("{}.sql", table));
        Self { table, output_path }
    }
}

/// A finished dump, owned by the pipeline until imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpResult {
    pub table: String,
    pub file_path: PathBuf,
    pub bytes_written: u64,
}

/// Dump a single table from the source into its job file.
///
/// Resolves only after the decompressed file has been fully flushed.
pub async fn dump_table(
    runner: &dyn DrushRunner,
    source: &Target,
    job: DumpJob,
) -> Result<DumpResult, ReloadError> {
    let compressed = runner
        .exec(&Invocation::dump_table(&source.alias, &job.table))
        .await
        .map_err(|e| ReloadError::dump(&job.table, e))?;

    let bytes_written = write_decompressed(&compressed, &job.output_path)
        .await
        .map_err(|e| ReloadError::dump(&job.table, e))?;

    tracing::debug!(
        "Dumped '{}' to {} ({} bytes)",
        job.table,
        job.output_path.display(),
        bytes_written
    );

    Ok(DumpResult {
        table: job.table,
        file_path: job.output_path,
        bytes_written,
    })
}

/// Gunzip `compressed` into a new file at `path`, chunk by chunk.
///
/// Returns the number of decompressed bytes written.
pub async fn write_decompressed(compressed: &[u8], path: &Path) -> Result<u64, ReloadError> {
    if compressed.is_empty() {
        return Err(ReloadError::io(
            "sql-dump produced no output",
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "empty gzip stream"),
        ));
    }

    let mut file = File::create(path)
        .await
        .map_err(|e| ReloadError::io(format!("failed to create {}", path.display()), e))?;
    let mut decoder = GzDecoder::new(Vec::with_capacity(CHUNK_SIZE));
    let mut written = 0u64;

    for chunk in compressed.chunks(CHUNK_SIZE) {
        decoder
            .write_all(chunk)
            .map_err(|e| ReloadError::io("failed to decompress dump", e))?;
        written += drain_decoded(&mut decoder, &mut file, path).await?;
    }

    decoder
        .try_finish()
        .map_err(|e| ReloadError::io("failed to decompress dump", e))?;
    written += drain_decoded(&mut decoder, &mut file, path).await?;

    file.flush()
        .await
        .map_err(|e| ReloadError::io(format!("failed to write {}", path.display()), e))?;

    Ok(written)
}

async fn drain_decoded(
    decoder: &mut GzDecoder<Vec<u8>>,
    file: &mut File,
    path: &Path,
) -> Result<u64, ReloadError> {
    let buf = decoder.get_mut();
    if buf.is_empty() {
        return Ok(0);
    }

    file.write_all(buf)
        .await
        .map_err(|e| ReloadError::io(format!("failed to write {}", path.display()), e))?;
    let n = buf.len() as u64;
    buf.clear();
    Ok(n)
}
