// ABOUTME: Scripted in-memory drush used by the integration tests
// ABOUTME: Records every invocation and measures dump/import concurrency

#![allow(dead_code)]

use async_trait::async_trait;
use drush_reload::drush::{DrushRunner, Invocation};
use drush_reload::ReloadError;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Body every fake dump of `table` decompresses to
pub fn dump_body(table: &str) -> String {
    format!(
        "-- Dump of {table}\nCREATE TABLE `{table}` (id int);\nINSERT INTO `{table}` VALUES (1);\n"
    )
}

#[derive(Default)]
struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeDrush {
    listing: String,
    remote_cores: HashMap<String, String>,
    unknown_aliases: HashSet<String>,
    fail_dump: HashSet<String>,
    fail_import: HashSet<String>,
    wipe_dump_dir_after: Option<String>,
    delay: Duration,
    calls: Mutex<Vec<Invocation>>,
    imported: Mutex<Vec<String>>,
    ordering_violations: Mutex<Vec<String>>,
    dumps: Gauge,
    imports: Gauge,
}

impl FakeDrush {
    pub fn with_tables(tables: &[&str]) -> Self {
        let mut listing = tables.join("\n");
        listing.push('\n');
        Self {
            listing,
            delay: Duration::from_millis(5),
            ..Default::default()
        }
    }

    /// Mark an alias as remote; `cores` is the raw ssh response
    pub fn remote(mut self, alias: &str, cores: &str) -> Self {
        self.remote_cores
            .insert(alias.to_string(), cores.to_string());
        self
    }

    pub fn unknown_alias(mut self, alias: &str) -> Self {
        self.unknown_aliases.insert(alias.to_string());
        self
    }

    pub fn failing_dump(mut self, table: &str) -> Self {
        self.fail_dump.insert(table.to_string());
        self
    }

    pub fn failing_import(mut self, table: &str) -> Self {
        self.fail_import.insert(table.to_string());
        self
    }

    /// Delete the whole dump directory once `table` is imported
    pub fn wipes_dump_dir_after(mut self, table: &str) -> Self {
        self.wipe_dump_dir_after = Some(table.to_string());
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, subcommand: &str) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|inv| inv.subcommand() == subcommand)
            .collect()
    }

    /// Tables passed to sql-dump, in call order
    pub fn dumped_tables(&self) -> Vec<String> {
        self.calls_to("sql-dump")
            .iter()
            .map(|inv| inv.args[2].trim_start_matches("--tables-list=").to_string())
            .collect()
    }

    /// Tables successfully imported, in completion order
    pub fn imported_tables(&self) -> Vec<String> {
        self.imported.lock().unwrap().clone()
    }

    pub fn ordering_violations(&self) -> Vec<String> {
        self.ordering_violations.lock().unwrap().clone()
    }

    pub fn peak_dumps(&self) -> usize {
        self.dumps.peak.load(Ordering::SeqCst)
    }

    pub fn peak_imports(&self) -> usize {
        self.imports.peak.load(Ordering::SeqCst)
    }

    fn exit_failure(inv: &Invocation) -> ReloadError {
        ReloadError::Command {
            command: inv.to_string(),
            status: ExitStatus::from_raw(1 << 8),
            stderr: "simulated failure".to_string(),
        }
    }

    async fn dump(&self, inv: &Invocation) -> Result<Vec<u8>, ReloadError> {
        let table = inv.args[2].trim_start_matches("--tables-list=").to_string();
        self.dumps.enter();
        tokio::time::sleep(self.delay).await;
        self.dumps.leave();

        if self.fail_dump.contains(&table) {
            return Err(Self::exit_failure(inv));
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder
            .write_all(dump_body(&table).as_bytes())
            .expect("gzip into memory");
        Ok(encoder.finish().expect("gzip into memory"))
    }

    async fn import(&self, inv: &Invocation) -> Result<Vec<u8>, ReloadError> {
        let path = inv.stdin_file.clone().expect("sqlc always reads a dump file");
        let table = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        // The dump file must be complete before its import starts
        match std::fs::read_to_string(&path) {
            Ok(body) if body == dump_body(&table) => {}
            _ => self.ordering_violations.lock().unwrap().push(table.clone()),
        }

        self.imports.enter();
        tokio::time::sleep(self.delay).await;
        self.imports.leave();

        if self.fail_import.contains(&table) {
            return Err(Self::exit_failure(inv));
        }

        if self.wipe_dump_dir_after.as_deref() == Some(table.as_str()) {
            if let Some(dir) = path.parent() {
                std::fs::remove_dir_all(dir).expect("wipe dump directory");
            }
        }

        self.imported.lock().unwrap().push(table);
        Ok(Vec::new())
    }
}

#[async_trait]
impl DrushRunner for FakeDrush {
    async fn exec(&self, inv: &Invocation) -> Result<Vec<u8>, ReloadError> {
        self.calls.lock().unwrap().push(inv.clone());

        match inv.subcommand() {
            "sa" => {
                let alias = &inv.args[1];
                if self.unknown_aliases.contains(alias) {
                    return Err(Self::exit_failure(inv));
                }
                if self.remote_cores.contains_key(alias) {
                    Ok(format!("remote-host: {alias}.example.com\n").into_bytes())
                } else {
                    Ok(b"root: /var/www/html\n".to_vec())
                }
            }
            "ssh" => {
                let alias = inv.alias.clone().unwrap_or_default();
                Ok(self
                    .remote_cores
                    .get(&alias)
                    .cloned()
                    .unwrap_or_default()
                    .into_bytes())
            }
            "sqlq" => Ok(self.listing.clone().into_bytes()),
            "sql-dump" => self.dump(inv).await,
            "sqlc" => self.import(inv).await,
            "sql-drop" | "updb" => Ok(Vec::new()),
            other => panic!("unexpected drush subcommand: {other}"),
        }
    }
}
