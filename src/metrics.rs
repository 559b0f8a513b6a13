use crate::aggregate::{vendor_rollup, VendorTotals};
use crate::types::{KpiSummary, TelemetryRecord};
use crate::util::percent_of;
use std::collections::HashSet;

/// Share of vendors whose aggregated usage stays within entitlement.
/// No vendors at all counts as 0, not an error.
pub fn compliance_rate(totals: &[VendorTotals]) -> f64 {
    if totals.is_empty() {
        return 0.0;
    }
    let compliant = totals.iter().filter(|t| t.usage <= t.entitled).count();
    percent_of(compliant as f64, totals.len() as f64)
}

/// What the entitlements cost: Σ(entitled × cost) over all rows.
pub fn actual_spend(records: &[TelemetryRecord]) -> f64 {
    records
        .iter()
        .map(|r| r.entitled_licenses as f64 * r.cost_per_license)
        .sum()
}

/// What the licenses actually in use cost: Σ(usage × cost) over all rows.
pub fn effective_spend(records: &[TelemetryRecord]) -> f64 {
    records
        .iter()
        .map(|r| r.actual_usage as f64 * r.cost_per_license)
        .sum()
}

/// Budget overshoot plus the entitled-vs-used gap, each floored at zero.
pub fn savings_opportunity(actual: f64, effective: f64, budget: f64) -> f64 {
    (actual - budget).max(0.0) + (actual - effective).max(0.0)
}

pub fn distinct_employees(records: &[TelemetryRecord]) -> usize {
    records
        .iter()
        .map(|r| r.employee_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

pub fn active_employees(records: &[TelemetryRecord]) -> usize {
    records
        .iter()
        .filter(|r| r.actual_usage > 0)
        .map(|r| r.employee_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Headline figures for the summary view and the JSON export. `budget` is
/// the user's spend budget for the savings-opportunity comparison.
pub fn kpi_summary(records: &[TelemetryRecord], budget: f64) -> KpiSummary {
    let totals = vendor_rollup(records);
    let total_entitled: u64 = totals.iter().map(|t| t.entitled).sum();
    let total_usage: u64 = totals.iter().map(|t| t.usage).sum();
    let actual = actual_spend(records);
    let effective = effective_spend(records);
    let employees = distinct_employees(records);
    let active = active_employees(records);

    KpiSummary {
        total_entitled,
        total_usage,
        unused_licenses: total_entitled as i64 - total_usage as i64,
        overall_utilization_pct: percent_of(total_usage as f64, total_entitled as f64),
        compliance_rate: compliance_rate(&totals),
        distinct_vendors: totals.len(),
        distinct_employees: employees,
        active_employees: active,
        actual_spend: actual,
        effective_spend: effective,
        savings_opportunity: savings_opportunity(actual, effective, budget),
        cost_per_employee: actual / employees.max(1) as f64,
        cost_per_active_user: effective / active.max(1) as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TelemetryRecord;
    use pretty_assertions::assert_eq;

    fn three_vendor_sample() -> Vec<TelemetryRecord> {
        vec![
            TelemetryRecord::sample("A", 10, 12, 5.0),
            TelemetryRecord::sample("A", 5, 3, 5.0),
            TelemetryRecord::sample("B", 20, 20, 2.0),
        ]
    }

    #[test]
    fn test_compliance_rate_counts_vendor_level_totals() {
        // A nets to 15/15 after aggregation, so both vendors are compliant.
        let totals = vendor_rollup(&three_vendor_sample());
        assert_eq!(compliance_rate(&totals), 100.0);
    }

    #[test]
    fn test_compliance_rate_stays_in_range() {
        let records = vec![
            TelemetryRecord::sample("A", 1, 5, 1.0),
            TelemetryRecord::sample("B", 5, 1, 1.0),
            TelemetryRecord::sample("C", 2, 2, 1.0),
        ];
        // 2 of 3 vendors compliant.
        let rate = compliance_rate(&vendor_rollup(&records));
        assert!((0.0..=100.0).contains(&rate));
        assert!((rate - 66.666_666_666_666_67).abs() < 1e-9);
    }

    #[test]
    fn test_compliance_rate_zero_vendors_is_zero() {
        assert_eq!(compliance_rate(&[]), 0.0);
    }

    #[test]
    fn test_spend_totals() {
        let records = three_vendor_sample();
        // actual = 10*5 + 5*5 + 20*2 = 115; effective = 12*5 + 3*5 + 20*2 = 115.
        assert_eq!(actual_spend(&records), 115.0);
        assert_eq!(effective_spend(&records), 115.0);
    }

    #[test]
    fn test_savings_opportunity_floors_each_term() {
        // Over budget and over effective: both terms contribute.
        assert_eq!(savings_opportunity(115.0, 100.0, 50.0), 80.0);
        // Under budget, effective above actual: nothing to save.
        assert_eq!(savings_opportunity(115.0, 120.0, 200.0), 0.0);
    }

    #[test]
    fn test_kpi_summary_on_empty_table() {
        let summary = kpi_summary(&[], 100_000.0);
        assert_eq!(summary.total_entitled, 0);
        assert_eq!(summary.compliance_rate, 0.0);
        assert_eq!(summary.overall_utilization_pct, 0.0);
        // The max(1, ..) guards keep the per-head costs at zero, not NaN.
        assert_eq!(summary.cost_per_employee, 0.0);
        assert_eq!(summary.cost_per_active_user, 0.0);
    }

    #[test]
    fn test_kpi_summary_distinct_and_active_employees() {
        let mut records = three_vendor_sample();
        records[0].employee_id = "E001".to_string();
        records[1].employee_id = "E002".to_string();
        records[2].employee_id = "E002".to_string();
        // E002 appears twice; one row of it has zero usage.
        records[1].actual_usage = 0;

        let summary = kpi_summary(&records, 100.0);
        assert_eq!(summary.distinct_vendors, 2);
        assert_eq!(summary.distinct_employees, 2);
        // E001 (usage 12) and E002 (usage 20 on its B row) are both active.
        assert_eq!(summary.active_employees, 2);
        // actual = 115; per employee = 115 / 2.
        assert_eq!(summary.cost_per_employee, 57.5);
        // savings = max(0, 115-100) + max(0, 115-effective).
        let effective = effective_spend(&records);
        assert_eq!(
            summary.savings_opportunity,
            15.0 + (115.0 - effective).max(0.0)
        );
    }
}
