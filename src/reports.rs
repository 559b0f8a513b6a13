use crate::aggregate::{aggregate, vendor_rollup, AggColumn};
use crate::types::{
    ActionItem, AdoptionRow, Assumptions, ComplianceRiskRow, ForecastRow, IdleLicenseRow,
    LocationUsageRow, OptimizationRow, RenewalQuarterRow, RenewalWindowRow, SecurityExposureRow,
    SpendRow, TelemetryRecord, VendorUsageRow,
};
use crate::util::percent_of;
use chrono::{Datelike, Duration, NaiveDate};
use std::cmp::Ordering;

pub const DEFAULT_IDLE_THRESHOLD_DAYS: u32 = 90;

/// Days of lead time shown ahead of each contract end date.
const RENEWAL_LEAD_DAYS: i64 = 90;

/// Days ahead of today covered by the renewal calendar.
const RENEWAL_HORIZON_DAYS: i64 = 365;

/// Per-vendor entitlement vs usage with a utilization percentage. Vendors
/// with zero entitlement show 0% rather than dividing by zero.
pub fn vendor_usage(records: &[TelemetryRecord]) -> Vec<VendorUsageRow> {
    let mut rows: Vec<VendorUsageRow> = vendor_rollup(records)
        .into_iter()
        .map(|t| VendorUsageRow {
            vendor: t.vendor,
            entitled: t.entitled,
            usage: t.usage,
            unused: t.entitled as i64 - t.usage as i64,
            utilization_pct: percent_of(t.usage as f64, t.entitled as f64),
        })
        .collect();
    rows.sort_by(|a, b| b.entitled.cmp(&a.entitled));
    rows
}

/// Vendors whose aggregated usage exceeds entitlement, with the audit
/// exposure priced at the penalty constant. Compliant vendors are omitted.
pub fn compliance_risk(
    records: &[TelemetryRecord],
    assumptions: &Assumptions,
) -> Vec<ComplianceRiskRow> {
    let mut rows: Vec<ComplianceRiskRow> = vendor_rollup(records)
        .into_iter()
        .filter(|t| t.usage > t.entitled)
        .map(|t| {
            let over = t.usage - t.entitled;
            ComplianceRiskRow {
                vendor: t.vendor,
                entitled: t.entitled,
                usage: t.usage,
                over_usage: over,
                penalty_risk: over as f64 * assumptions.penalty_per_license,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.penalty_risk
            .partial_cmp(&a.penalty_risk)
            .unwrap_or(Ordering::Equal)
    });
    rows
}

/// Per-vendor shelfware: entitlements beyond usage, priced at the vendor's
/// summed per-license cost (the same basis the entitled/usage sums use).
pub fn optimization(records: &[TelemetryRecord]) -> Vec<OptimizationRow> {
    let mut rows: Vec<OptimizationRow> = vendor_rollup(records)
        .into_iter()
        .map(|t| {
            let under = t.entitled.saturating_sub(t.usage);
            OptimizationRow {
                vendor: t.vendor,
                under_utilized: under,
                wasted_spend: under as f64 * t.cost_per_license,
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.wasted_spend
            .partial_cmp(&a.wasted_spend)
            .unwrap_or(Ordering::Equal)
    });
    rows
}

/// Total shelfware value across all vendors, the baseline the scenario
/// projector scales by the reclaim percentage.
pub fn shelfware_baseline(records: &[TelemetryRecord]) -> f64 {
    optimization(records).iter().map(|r| r.wasted_spend).sum()
}

/// Installs not touched for at least `idle_threshold_days`, grouped by
/// vendor with their summed license cost as the savings potential.
pub fn idle_licenses(records: &[TelemetryRecord], idle_threshold_days: u32) -> Vec<IdleLicenseRow> {
    let idle: Vec<TelemetryRecord> = records
        .iter()
        .filter(|r| r.last_used_days >= idle_threshold_days)
        .cloned()
        .collect();
    let mut rows: Vec<IdleLicenseRow> = aggregate(
        &idle,
        |r| r.vendor.clone(),
        &[
            AggColumn::Count,
            AggColumn::Sum(|r: &TelemetryRecord| r.cost_per_license),
        ],
    )
    .into_iter()
    .map(|g| IdleLicenseRow {
        vendor: g.key,
        idle_count: g.values[0] as u64,
        savings_potential: g.values[1],
    })
    .collect();
    rows.sort_by(|a, b| {
        b.savings_potential
            .partial_cmp(&a.savings_potential)
            .unwrap_or(Ordering::Equal)
    });
    rows
}

/// Per-vendor exposure tuple: install count, EOL installs, known
/// vulnerabilities, mean days since last patch. Deliberately not reduced to
/// a single score.
pub fn security_exposure(records: &[TelemetryRecord]) -> Vec<SecurityExposureRow> {
    let mut rows: Vec<SecurityExposureRow> = aggregate(
        records,
        |r| r.vendor.clone(),
        &[
            AggColumn::Count,
            AggColumn::Sum(|r: &TelemetryRecord| if r.is_eol { 1.0 } else { 0.0 }),
            AggColumn::Sum(|r: &TelemetryRecord| r.known_vulns as f64),
            AggColumn::Mean(|r: &TelemetryRecord| r.days_since_patch as f64),
        ],
    )
    .into_iter()
    .map(|g| SecurityExposureRow {
        vendor: g.key,
        installs: g.values[0] as u64,
        eol_installs: g.values[1] as u64,
        known_vulns: g.values[2] as u64,
        avg_days_since_patch: g.values[3],
    })
    .collect();
    rows.sort_by(|a, b| b.known_vulns.cmp(&a.known_vulns));
    rows
}

/// Share of each department's assignments that are actually used.
pub fn adoption_by_department(records: &[TelemetryRecord]) -> Vec<AdoptionRow> {
    let mut rows: Vec<AdoptionRow> = aggregate(
        records,
        |r| r.department.clone(),
        &[
            AggColumn::Count,
            AggColumn::Sum(|r: &TelemetryRecord| if r.actual_usage > 0 { 1.0 } else { 0.0 }),
        ],
    )
    .into_iter()
    .map(|g| AdoptionRow {
        department: g.key,
        rows: g.values[0] as u64,
        active_rows: g.values[1] as u64,
        adoption_pct: percent_of(g.values[1], g.values[0]),
    })
    .collect();
    rows.sort_by(|a, b| {
        b.adoption_pct
            .partial_cmp(&a.adoption_pct)
            .unwrap_or(Ordering::Equal)
    });
    rows
}

fn quarter_label(date: NaiveDate) -> String {
    format!("{}Q{}", date.year(), (date.month() - 1) / 3 + 1)
}

/// Renewal value per calendar quarter of the contract end date, in
/// chronological order. Value is Σ(entitled × cost) per quarter.
pub fn renewal_quarters(records: &[TelemetryRecord]) -> Vec<RenewalQuarterRow> {
    let mut rows: Vec<RenewalQuarterRow> = aggregate(
        records,
        |r| quarter_label(r.contract_end_date),
        &[
            AggColumn::Count,
            AggColumn::Sum(|r: &TelemetryRecord| {
                r.entitled_licenses as f64 * r.cost_per_license
            }),
        ],
    )
    .into_iter()
    .map(|g| RenewalQuarterRow {
        quarter: g.key,
        contracts: g.values[0] as u64,
        renewal_value: g.values[1],
    })
    .collect();
    rows.sort_by(|a, b| a.quarter.cmp(&b.quarter));
    rows
}

/// Renewals due within the next year, bucketed by (vendor, end date), with
/// the negotiation window opening 90 days before each end date.
pub fn renewal_window(records: &[TelemetryRecord], today: NaiveDate) -> Vec<RenewalWindowRow> {
    let horizon = today + Duration::days(RENEWAL_HORIZON_DAYS);
    let upcoming: Vec<TelemetryRecord> = records
        .iter()
        .filter(|r| r.contract_end_date >= today && r.contract_end_date <= horizon)
        .cloned()
        .collect();
    let mut rows: Vec<RenewalWindowRow> = aggregate(
        &upcoming,
        |r| (r.vendor.clone(), r.contract_end_date),
        &[AggColumn::Sum(|r: &TelemetryRecord| {
            r.entitled_licenses as f64 * r.cost_per_license
        })],
    )
    .into_iter()
    .map(|g| {
        let (vendor, end) = g.key;
        RenewalWindowRow {
            vendor,
            contract_end_date: end,
            window_start: end - Duration::days(RENEWAL_LEAD_DAYS),
            renewal_value: g.values[0],
        }
    })
    .collect();
    rows.sort_by(|a, b| {
        a.contract_end_date
            .cmp(&b.contract_end_date)
            .then_with(|| a.vendor.cmp(&b.vendor))
    });
    rows
}

/// Procurement spend per vendor, Σ(entitled × cost), largest first.
pub fn spend_by_vendor(records: &[TelemetryRecord]) -> Vec<SpendRow> {
    let mut rows: Vec<SpendRow> = aggregate(
        records,
        |r| r.vendor.clone(),
        &[AggColumn::Sum(|r: &TelemetryRecord| {
            r.entitled_licenses as f64 * r.cost_per_license
        })],
    )
    .into_iter()
    .map(|g| SpendRow {
        vendor: g.key,
        total_cost: g.values[0],
    })
    .collect();
    rows.sort_by(|a, b| {
        b.total_cost
            .partial_cmp(&a.total_cost)
            .unwrap_or(Ordering::Equal)
    });
    rows
}

pub fn usage_by_location(records: &[TelemetryRecord]) -> Vec<LocationUsageRow> {
    let mut rows: Vec<LocationUsageRow> = aggregate(
        records,
        |r| r.location.clone(),
        &[AggColumn::Sum(|r: &TelemetryRecord| r.actual_usage as f64)],
    )
    .into_iter()
    .map(|g| LocationUsageRow {
        location: g.key,
        usage: g.values[0] as u64,
    })
    .collect();
    rows.sort_by(|a, b| b.usage.cmp(&a.usage));
    rows
}

/// Next-quarter usage per vendor from the flat growth factor.
pub fn usage_forecast(records: &[TelemetryRecord], assumptions: &Assumptions) -> Vec<ForecastRow> {
    let mut rows: Vec<ForecastRow> = vendor_rollup(records)
        .into_iter()
        .map(|t| ForecastRow {
            vendor: t.vendor,
            usage: t.usage,
            forecast_next_quarter: t.usage as f64 * assumptions.usage_growth_factor,
        })
        .collect();
    rows.sort_by(|a, b| b.usage.cmp(&a.usage));
    rows
}

/// Flatten the risk and savings views into one actionable list, highest
/// dollar impact first. EOL retirements carry no dollar estimate and sort
/// last.
pub fn action_items(records: &[TelemetryRecord], assumptions: &Assumptions) -> Vec<ActionItem> {
    let mut items: Vec<ActionItem> = Vec::new();

    for row in compliance_risk(records, assumptions) {
        items.push(ActionItem {
            category: "True-up".to_string(),
            vendor: row.vendor,
            detail: format!("{} licenses used beyond entitlement", row.over_usage),
            impact: row.penalty_risk,
        });
    }
    for row in optimization(records) {
        if row.under_utilized > 0 && row.wasted_spend > 0.0 {
            items.push(ActionItem {
                category: "Reclaim shelfware".to_string(),
                vendor: row.vendor,
                detail: format!("{} entitlements without matching usage", row.under_utilized),
                impact: row.wasted_spend,
            });
        }
    }
    for row in idle_licenses(records, DEFAULT_IDLE_THRESHOLD_DAYS) {
        items.push(ActionItem {
            category: "Harvest idle licenses".to_string(),
            vendor: row.vendor,
            detail: format!(
                "{} installs unused for {}+ days",
                row.idle_count, DEFAULT_IDLE_THRESHOLD_DAYS
            ),
            impact: row.savings_potential,
        });
    }
    for row in security_exposure(records) {
        if row.eol_installs > 0 {
            items.push(ActionItem {
                category: "Retire EOL software".to_string(),
                vendor: row.vendor,
                detail: format!(
                    "{} end-of-life installs, {} known vulnerabilities",
                    row.eol_installs, row.known_vulns
                ),
                impact: 0.0,
            });
        }
    }

    items.sort_by(|a, b| b.impact.partial_cmp(&a.impact).unwrap_or(Ordering::Equal));
    items
}
