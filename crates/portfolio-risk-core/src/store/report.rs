use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{RiskRecord, StoredRecord};

/// Aggregate view over a slice of stored history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryReport {
    pub record_count: usize,
    pub var_count: usize,
    pub stress_count: usize,
    /// VaR result count per method
    pub var_methods: BTreeMap<String, usize>,
    pub average_var_percentage: Option<f64>,
    pub max_var_percentage: Option<f64>,
    pub low_confidence_count: usize,
    /// Largest stress percentage loss and the scenario that produced it
    pub worst_stress_loss: Option<f64>,
    pub worst_stress_scenario: Option<String>,
    pub first_produced_at: Option<DateTime<Utc>>,
    pub last_produced_at: Option<DateTime<Utc>>,
}

pub fn summarize_history(records: &[StoredRecord]) -> HistoryReport {
    let mut report = HistoryReport {
        record_count: records.len(),
        var_count: 0,
        stress_count: 0,
        var_methods: BTreeMap::new(),
        average_var_percentage: None,
        max_var_percentage: None,
        low_confidence_count: 0,
        worst_stress_loss: None,
        worst_stress_scenario: None,
        first_produced_at: None,
        last_produced_at: None,
    };
    let mut var_pct_total = 0.0;

    for stored in records {
        let at = stored.record.produced_at();
        report.first_produced_at = Some(report.first_produced_at.map_or(at, |t| t.min(at)));
        report.last_produced_at = Some(report.last_produced_at.map_or(at, |t| t.max(at)));

        match &stored.record {
            RiskRecord::Var(v) => {
                report.var_count += 1;
                *report.var_methods.entry(v.method.to_string()).or_insert(0) += 1;
                var_pct_total += v.var_percentage;
                report.max_var_percentage = Some(
                    report
                        .max_var_percentage
                        .map_or(v.var_percentage, |m| m.max(v.var_percentage)),
                );
                if v.low_confidence {
                    report.low_confidence_count += 1;
                }
            }
            RiskRecord::Stress(s) => {
                report.stress_count += 1;
                if report.worst_stress_loss.map_or(true, |w| s.percentage_loss > w) {
                    report.worst_stress_loss = Some(s.percentage_loss);
                    report.worst_stress_scenario = Some(s.scenario_id.clone());
                }
            }
        }
    }

    if report.var_count > 0 {
        report.average_var_percentage = Some(var_pct_total / report.var_count as f64);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history() {
        let r = summarize_history(&[]);
        assert_eq!(r.record_count, 0);
        assert!(r.average_var_percentage.is_none());
        assert!(r.worst_stress_scenario.is_none());
        assert!(r.first_produced_at.is_none());
    }
}
