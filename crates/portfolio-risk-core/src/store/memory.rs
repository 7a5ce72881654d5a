use chrono::Utc;
use std::sync::RwLock;
use tracing::debug;

use super::{sort_oldest_first, validate_tenant, HistoryFilter, ResultStore, RiskRecord, StoredRecord};
use crate::error::RiskEngineError;
use crate::RiskEngineResult;

/// Process-local store guarded by an `RwLock`. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        // A poisoned lock still holds every record pushed before the panic.
        match self.records.read() {
            Ok(records) => records.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) -> RiskEngineResult<()> {
        self.records.write().map_err(lock_error)?.clear();
        Ok(())
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> RiskEngineError {
    RiskEngineError::Storage(format!("Lock error: {e}"))
}

impl ResultStore for InMemoryResultStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn store_result(&self, record: RiskRecord, tenant_id: &str) -> RiskEngineResult<StoredRecord> {
        validate_tenant(tenant_id)?;
        let stored = StoredRecord {
            tenant_id: tenant_id.to_string(),
            stored_at: Utc::now(),
            record,
        };
        self.records
            .write()
            .map_err(lock_error)?
            .push(stored.clone());
        debug!(
            backend = self.backend_name(),
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
            .records
            .read()
            .map_err(lock_error)?
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        sort_oldest_first(&mut out);
        Ok(out)
    }
}
