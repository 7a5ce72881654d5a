use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use super::{sort_oldest_first, validate_tenant, HistoryFilter, ResultStore, RiskRecord, StoredRecord};
use crate::error::RiskEngineError;
use crate::RiskEngineResult;

/// Append-only file store, one JSON document per line.
///
/// Writers within the process are serialised by a mutex; the file is
/// reopened for every call so other readers always see whole lines.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    /// Open (or lazily create) a store at `path`. Missing parent
    /// directories are created.
    pub fn open(path: impl AsRef<Path>) -> RiskEngineResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(JsonLinesStore {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> RiskEngineResult<Vec<StoredRecord>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let rec: StoredRecord = serde_json::from_str(&line).map_err(|e| {
                warn!(path = %self.path.display(), line = idx + 1, "corrupt history line");
                RiskEngineError::SerializationError(format!(
                    "{}:{}: {}",
                    self.path.display(),
                    idx + 1,
                    e
                ))
            })?;
            records.push(rec);
        }
        Ok(records)
    }
}

impl ResultStore for JsonLinesStore {
    fn backend_name(&self) -> &'static str {
        "jsonl"
    }

    fn store_result(&self, record: RiskRecord, tenant_id: &str) -> RiskEngineResult<StoredRecord> {
        validate_tenant(tenant_id)?;
        let stored = StoredRecord {
            tenant_id: tenant_id.to_string(),
            stored_at: Utc::now(),
            record,
        };
        let line = serde_json::to_string(&stored)?;

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| RiskEngineError::Storage(format!("Lock error: {e}")))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        file.flush()?;

        debug!(
            backend = self.backend_name(),
            path = %self.path.display(),
            tenant = tenant_id,
            kind = stored.record.kind(),
            "result stored"
        );
        Ok(stored)
    }

    fn fetch_history(
        &self,
        tenant_id: &str,
        portfolio_id: Option<&str>,
        since_days: u32,
    ) -> RiskEngineResult<Vec<StoredRecord>> {
        validate_tenant(tenant_id)?;
        let filter = HistoryFilter::new(tenant_id, portfolio_id, since_days);
        let mut out: Vec<StoredRecord> = self
            .read_all()?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        sort_oldest_first(&mut out);
        Ok(out)
    }
}
