//! Persistence contract for produced results.
//!
//! The numeric core never writes anywhere by itself. Callers hand finished
//! results to a [`ResultStore`] together with the tenant they belong to, and
//! read them back through `fetch_history`. Store failures are returned as
//! [`RiskEngineError::Storage`], never swallowed.

mod jsonl;
mod memory;
mod report;

pub use jsonl::JsonLinesStore;
pub use memory::InMemoryResultStore;
pub use report::{summarize_history, HistoryReport};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RiskEngineError;
use crate::stress::StressTestResult;
use crate::var::VaRResult;
use crate::RiskEngineResult;

/// Any result the engine produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum RiskRecord {
    Var(VaRResult),
    Stress(StressTestResult),
}

impl RiskRecord {
    pub fn portfolio_id(&self) -> &str {
        match self {
            RiskRecord::Var(r) => &r.portfolio_id,
            RiskRecord::Stress(r) => &r.portfolio_id,
        }
    }

    /// When the underlying result was computed.
    pub fn produced_at(&self) -> DateTime<Utc> {
        match self {
            RiskRecord::Var(r) => r.calculation_date,
            RiskRecord::Stress(r) => r.calculated_at,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RiskRecord::Var(_) => "var",
            RiskRecord::Stress(_) => "stress",
        }
    }
}

impl From<VaRResult> for RiskRecord {
    fn from(r: VaRResult) -> Self {
        RiskRecord::Var(r)
    }
}

impl From<StressTestResult> for RiskRecord {
    fn from(r: StressTestResult) -> Self {
        RiskRecord::Stress(r)
    }
}

/// A record as held by a store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub tenant_id: String,
    pub stored_at: DateTime<Utc>,
    pub record: RiskRecord,
}

/// Storage backend for results.
pub trait ResultStore: Send + Sync {
    /// Backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Persist one result under `tenant_id`.
    fn store_result(&self, record: RiskRecord, tenant_id: &str) -> RiskEngineResult<StoredRecord>;

    /// Results for `tenant_id` produced within the last `since_days` days,
    /// optionally limited to one portfolio, oldest first.
    fn fetch_history(
        &self,
        tenant_id: &str,
        portfolio_id: Option<&str>,
        since_days: u32,
    ) -> RiskEngineResult<Vec<StoredRecord>>;
}

pub(crate) fn validate_tenant(tenant_id: &str) -> RiskEngineResult<()> {
    if tenant_id.trim().is_empty() {
        return Err(RiskEngineError::InvalidInput {
            field: "tenant_id".into(),
            reason: "Tenant identifier must not be empty".into(),
        });
    }
    Ok(())
}

/// Shared history filter for store implementations.
pub(crate) struct HistoryFilter<'a> {
    tenant_id: &'a str,
    portfolio_id: Option<&'a str>,
    cutoff: DateTime<Utc>,
}

impl<'a> HistoryFilter<'a> {
    pub(crate) fn new(tenant_id: &'a str, portfolio_id: Option<&'a str>, since_days: u32) -> Self {
        HistoryFilter {
            tenant_id,
            portfolio_id,
            // Windows reaching past the representable range keep everything.
            cutoff: Utc::now()
                .checked_sub_signed(Duration::days(i64::from(since_days)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }

    pub(crate) fn matches(&self, stored: &StoredRecord) -> bool {
        stored.tenant_id == self.tenant_id
            && self
                .portfolio_id
                .map_or(true, |p| stored.record.portfolio_id() == p)
            && stored.record.produced_at() >= self.cutoff
    }
}

pub(crate) fn sort_oldest_first(records: &mut [StoredRecord]) {
    records.sort_by_key(|r| r.record.produced_at());
}
