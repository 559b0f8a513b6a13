use crate::types::{DowngradePolicy, TelemetryRecord};

/// The projected savings split the summary view prints. All three parts are
/// non-negative when the inputs honor the documented contract.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioSavings {
    pub shelfware: f64,
    pub downgrade: f64,
    pub consolidation: f64,
    pub total: f64,
}

/// Scale the baseline savings figures by the user's reclaim and downgrade
/// percentages and add the flat consolidation assumption. Percentages must
/// already be clamped to [0, 100] by the caller.
pub fn project(
    baseline_shelfware: f64,
    baseline_downgrade: f64,
    reclaim_percent: f64,
    downgrade_percent: f64,
    consolidation_savings: f64,
) -> ScenarioSavings {
    let shelfware = baseline_shelfware * reclaim_percent / 100.0;
    let downgrade = baseline_downgrade * downgrade_percent / 100.0;
    ScenarioSavings {
        shelfware,
        downgrade,
        consolidation: consolidation_savings,
        total: shelfware + downgrade + consolidation_savings,
    }
}

/// Potential savings from moving barely-used licenses to a cheaper edition.
/// A row qualifies when it matches the policy vendor, sits on one of the
/// policy editions, and its usage is at or below the ceiling; it then
/// contributes the edition's fraction of its license cost.
pub fn downgrade_baseline(records: &[TelemetryRecord], policy: &DowngradePolicy) -> f64 {
    records
        .iter()
        .filter(|r| r.vendor == policy.vendor && r.actual_usage <= policy.usage_ceiling)
        .filter_map(|r| {
            policy
                .rules
                .iter()
                .find(|rule| rule.edition == r.edition)
                .map(|rule| rule.fraction * r.cost_per_license)
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TelemetryRecord;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_project_scales_baselines() {
        let s = project(1000.0, 500.0, 50.0, 30.0, 40_000.0);
        assert_eq!(s.shelfware, 500.0);
        assert_eq!(s.downgrade, 150.0);
        assert_eq!(s.consolidation, 40_000.0);
        assert_eq!(s.total, 40_650.0);
    }

    #[test]
    fn test_project_zero_percentages_leave_only_consolidation() {
        let s = project(1000.0, 500.0, 0.0, 0.0, 40_000.0);
        assert_eq!(s.total, 40_000.0);
    }

    #[test]
    fn test_project_total_monotonic_in_reclaim_percent() {
        let mut last = f64::MIN;
        for step in 0..=10 {
            let reclaim = step as f64 * 10.0;
            let s = project(1234.5, 678.9, reclaim, 30.0, 40_000.0);
            assert!(s.total >= last, "total dropped at reclaim {}", reclaim);
            last = s.total;
        }
    }

    #[test]
    fn test_downgrade_baseline_applies_policy() {
        let policy = DowngradePolicy::default();
        let mut records = vec![
            TelemetryRecord::sample("Microsoft 365", 1, 1, 15.0),
            TelemetryRecord::sample("Microsoft 365", 1, 0, 15.0),
            TelemetryRecord::sample("Microsoft 365", 1, 5, 15.0),
            TelemetryRecord::sample("Microsoft 365", 1, 1, 15.0),
            TelemetryRecord::sample("Adobe CC", 1, 0, 25.0),
        ];
        records[0].edition = "E5".to_string(); // usage 1, qualifies at 0.8
        records[1].edition = "E3".to_string(); // usage 0, qualifies at 0.4
        records[2].edition = "E5".to_string(); // usage 5, over the ceiling
        records[3].edition = "F1".to_string(); // edition outside the policy
        records[4].edition = "E5".to_string(); // wrong vendor

        // 0.8*15 + 0.4*15 = 18.
        assert_eq!(downgrade_baseline(&records, &policy), 18.0);
    }

    #[test]
    fn test_downgrade_baseline_empty_table_is_zero() {
        assert_eq!(downgrade_baseline(&[], &DowngradePolicy::default()), 0.0);
    }
}
