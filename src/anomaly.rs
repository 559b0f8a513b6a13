use crate::aggregate::{aggregate, AggColumn};
use crate::types::{CloudCostRecord, CoverageRow, MonthlySpend};
use crate::util::{average, percent_of, sample_std_dev};

/// Total spend (on-demand + discounted) per month, in chronological order
/// of the `YYYY-MM` labels.
pub fn monthly_spend(costs: &[CloudCostRecord]) -> Vec<MonthlySpend> {
    let mut rows: Vec<MonthlySpend> = aggregate(
        costs,
        |c| c.month.clone(),
        &[AggColumn::Sum(|c: &CloudCostRecord| {
            c.on_demand_cost + c.discounted_cost
        })],
    )
    .into_iter()
    .map(|g| MonthlySpend {
        month: g.key,
        spend: g.values[0],
    })
    .collect();
    rows.sort_by(|a, b| a.month.cmp(&b.month));
    rows
}

/// Flag months whose spend exceeds mean + 2 standard deviations, keeping
/// the input order. Under two points there is no deviation to measure, so
/// nothing is flagged.
///
/// This is a static threshold, not a seasonal model: a series with a real
/// seasonal peak every December will flag those Decembers even though they
/// are expected.
pub fn detect_anomalies(series: &[MonthlySpend]) -> Vec<MonthlySpend> {
    if series.len() < 2 {
        return Vec::new();
    }
    let values: Vec<f64> = series.iter().map(|p| p.spend).collect();
    let threshold = average(&values) + 2.0 * sample_std_dev(&values);
    series
        .iter()
        .filter(|p| p.spend > threshold)
        .cloned()
        .collect()
}

/// Commitment coverage per (month, provider): how much of the bill ran on
/// discounted commitments. Zero cost on both sides reads as 0% coverage.
pub fn commitment_coverage(costs: &[CloudCostRecord]) -> Vec<CoverageRow> {
    let mut rows: Vec<CoverageRow> = aggregate(
        costs,
        |c| (c.month.clone(), c.provider.clone()),
        &[
            AggColumn::Sum(|c: &CloudCostRecord| c.on_demand_cost),
            AggColumn::Sum(|c: &CloudCostRecord| c.discounted_cost),
        ],
    )
    .into_iter()
    .map(|g| {
        let (month, provider) = g.key;
        let total = g.values[0] + g.values[1];
        CoverageRow {
            month,
            provider,
            total_cost: total,
            coverage_pct: percent_of(g.values[1], total),
        }
    })
    .collect();
    rows.sort_by(|a, b| a.month.cmp(&b.month).then_with(|| a.provider.cmp(&b.provider)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cost(month: &str, provider: &str, on_demand: f64, discounted: f64) -> CloudCostRecord {
        CloudCostRecord {
            month: month.to_string(),
            provider: provider.to_string(),
            on_demand_cost: on_demand,
            discounted_cost: discounted,
        }
    }

    fn point(month: &str, spend: f64) -> MonthlySpend {
        MonthlySpend {
            month: month.to_string(),
            spend,
        }
    }

    #[test]
    fn test_monthly_spend_merges_providers_and_sorts() {
        let costs = vec![
            cost("2025-02", "AWS", 100.0, 50.0),
            cost("2025-01", "AWS", 200.0, 100.0),
            cost("2025-01", "Azure", 300.0, 0.0),
        ];
        let series = monthly_spend(&costs);
        assert_eq!(
            series,
            vec![point("2025-01", 600.0), point("2025-02", 150.0)]
        );
    }

    #[test]
    fn test_constant_series_has_no_anomalies() {
        let series = vec![
            point("2025-01", 500.0),
            point("2025-02", 500.0),
            point("2025-03", 500.0),
        ];
        assert!(detect_anomalies(&series).is_empty());
    }

    #[test]
    fn test_single_point_has_no_anomalies() {
        assert!(detect_anomalies(&[point("2025-01", 1e9)]).is_empty());
        assert!(detect_anomalies(&[]).is_empty());
    }

    #[test]
    fn test_spike_is_flagged_in_input_order() {
        let mut series: Vec<MonthlySpend> = (1..=11)
            .map(|m| point(&format!("2025-{:02}", m), 100.0))
            .collect();
        series.push(point("2025-12", 1000.0));
        // Mean 175, sample std dev ~259.8; threshold ~694.6.
        let flagged = detect_anomalies(&series);
        assert_eq!(flagged, vec![point("2025-12", 1000.0)]);
    }

    #[test]
    fn test_commitment_coverage_percentages() {
        let costs = vec![
            cost("2025-01", "AWS", 75.0, 25.0),
            cost("2025-01", "Azure", 0.0, 0.0),
        ];
        let rows = commitment_coverage(&costs);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].provider, "AWS");
        assert_eq!(rows[0].total_cost, 100.0);
        assert_eq!(rows[0].coverage_pct, 25.0);
        // All-zero month/provider reads as 0% coverage, not NaN.
        assert_eq!(rows[1].coverage_pct, 0.0);
    }
}
