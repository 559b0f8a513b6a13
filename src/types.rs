use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::util::format_number;

fn display_number(value: &f64) -> String {
    format_number(*value, 2)
}

/// One raw CSV row. Every field is optional so the same struct covers both
/// the base schema and the enhanced schema with lifecycle/risk columns; the
/// loader decides which absences are fatal and which take defaults.
#[derive(Debug, Deserialize)]
pub struct RawTelemetryRow {
    #[serde(rename = "EmployeeID")]
    pub employee_id: Option<String>,
    #[serde(rename = "DeviceID")]
    pub device_id: Option<String>,
    #[serde(rename = "Vendor")]
    pub vendor: Option<String>,
    #[serde(rename = "Product")]
    pub product: Option<String>,
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Department")]
    pub department: Option<String>,
    #[serde(rename = "DeploymentType")]
    pub deployment_type: Option<String>,
    #[serde(rename = "Edition")]
    pub edition: Option<String>,
    #[serde(rename = "LicenseType")]
    pub license_type: Option<String>,
    #[serde(rename = "EntitledLicenses")]
    pub entitled_licenses: Option<String>,
    #[serde(rename = "ActualUsage")]
    pub actual_usage: Option<String>,
    #[serde(rename = "CostPerLicense")]
    pub cost_per_license: Option<String>,
    #[serde(rename = "LastUsedDays")]
    pub last_used_days: Option<String>,
    #[serde(rename = "ContractEndDate")]
    pub contract_end_date: Option<String>,
    #[serde(rename = "IsEOL")]
    pub is_eol: Option<String>,
    #[serde(rename = "KnownVulns")]
    pub known_vulns: Option<String>,
    #[serde(rename = "DaysSincePatch")]
    pub days_since_patch: Option<String>,
}

/// One raw row of the optional cloud-cost sidecar file.
#[derive(Debug, Deserialize)]
pub struct RawCloudCostRow {
    #[serde(rename = "Month")]
    pub month: Option<String>,
    #[serde(rename = "Provider")]
    pub provider: Option<String>,
    #[serde(rename = "OnDemandCost")]
    pub on_demand_cost: Option<String>,
    #[serde(rename = "DiscountedCost")]
    pub discounted_cost: Option<String>,
}

/// A fully normalized telemetry record: after loading, every field is
/// populated and every downstream calculator can assume a complete schema.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryRecord {
    #[serde(rename = "EmployeeID")]
    pub employee_id: String,
    #[serde(rename = "DeviceID")]
    pub device_id: String,
    #[serde(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "Product")]
    pub product: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Department")]
    pub department: String,
    #[serde(rename = "DeploymentType")]
    pub deployment_type: String,
    #[serde(rename = "Edition")]
    pub edition: String,
    #[serde(rename = "LicenseType")]
    pub license_type: String,
    #[serde(rename = "EntitledLicenses")]
    pub entitled_licenses: u32,
    #[serde(rename = "ActualUsage")]
    pub actual_usage: u32,
    #[serde(rename = "CostPerLicense")]
    pub cost_per_license: f64,
    #[serde(rename = "LastUsedDays")]
    pub last_used_days: u32,
    #[serde(rename = "ContractEndDate")]
    pub contract_end_date: NaiveDate,
    #[serde(rename = "IsEOL")]
    pub is_eol: bool,
    #[serde(rename = "KnownVulns")]
    pub known_vulns: u32,
    #[serde(rename = "DaysSincePatch")]
    pub days_since_patch: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloudCostRecord {
    #[serde(rename = "Month")]
    pub month: String,
    #[serde(rename = "Provider")]
    pub provider: String,
    #[serde(rename = "OnDemandCost")]
    pub on_demand_cost: f64,
    #[serde(rename = "DiscountedCost")]
    pub discounted_cost: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct VendorUsageRow {
    #[serde(rename = "Vendor")]
    #[tabled(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "EntitledLicenses")]
    #[tabled(rename = "Entitled")]
    pub entitled: u64,
    #[serde(rename = "ActualUsage")]
    #[tabled(rename = "Usage")]
    pub usage: u64,
    #[serde(rename = "Unused")]
    #[tabled(rename = "Unused")]
    pub unused: i64,
    #[serde(rename = "UtilizationPct")]
    #[tabled(rename = "Utilization%", display_with = "display_number")]
    pub utilization_pct: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ComplianceRiskRow {
    #[serde(rename = "Vendor")]
    #[tabled(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "EntitledLicenses")]
    #[tabled(rename = "Entitled")]
    pub entitled: u64,
    #[serde(rename = "ActualUsage")]
    #[tabled(rename = "Usage")]
    pub usage: u64,
    #[serde(rename = "OverUsage")]
    #[tabled(rename = "OverUsage")]
    pub over_usage: u64,
    #[serde(rename = "PenaltyRisk")]
    #[tabled(rename = "PenaltyRisk", display_with = "display_number")]
    pub penalty_risk: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct OptimizationRow {
    #[serde(rename = "Vendor")]
    #[tabled(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "UnderUtilized")]
    #[tabled(rename = "UnderUtilized")]
    pub under_utilized: u64,
    #[serde(rename = "WastedSpend")]
    #[tabled(rename = "WastedSpend", display_with = "display_number")]
    pub wasted_spend: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct IdleLicenseRow {
    #[serde(rename = "Vendor")]
    #[tabled(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "IdleLicenses")]
    #[tabled(rename = "IdleLicenses")]
    pub idle_count: u64,
    #[serde(rename = "SavingsPotential")]
    #[tabled(rename = "SavingsPotential", display_with = "display_number")]
    pub savings_potential: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SecurityExposureRow {
    #[serde(rename = "Vendor")]
    #[tabled(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "Installs")]
    #[tabled(rename = "Installs")]
    pub installs: u64,
    #[serde(rename = "EolInstalls")]
    #[tabled(rename = "EOL")]
    pub eol_installs: u64,
    #[serde(rename = "KnownVulns")]
    #[tabled(rename = "KnownVulns")]
    pub known_vulns: u64,
    #[serde(rename = "AvgDaysSincePatch")]
    #[tabled(rename = "AvgDaysSincePatch", display_with = "display_number")]
    pub avg_days_since_patch: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AdoptionRow {
    #[serde(rename = "Department")]
    #[tabled(rename = "Department")]
    pub department: String,
    #[serde(rename = "Rows")]
    #[tabled(rename = "Assignments")]
    pub rows: u64,
    #[serde(rename = "ActiveRows")]
    #[tabled(rename = "Active")]
    pub active_rows: u64,
    #[serde(rename = "AdoptionPct")]
    #[tabled(rename = "Adoption%", display_with = "display_number")]
    pub adoption_pct: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RenewalQuarterRow {
    #[serde(rename = "Quarter")]
    #[tabled(rename = "Quarter")]
    pub quarter: String,
    #[serde(rename = "Contracts")]
    #[tabled(rename = "Contracts")]
    pub contracts: u64,
    #[serde(rename = "RenewalValue")]
    #[tabled(rename = "RenewalValue", display_with = "display_number")]
    pub renewal_value: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RenewalWindowRow {
    #[serde(rename = "Vendor")]
    #[tabled(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "ContractEndDate")]
    #[tabled(rename = "ContractEnd")]
    pub contract_end_date: NaiveDate,
    #[serde(rename = "WindowStart")]
    #[tabled(rename = "WindowStart")]
    pub window_start: NaiveDate,
    #[serde(rename = "RenewalValue")]
    #[tabled(rename = "RenewalValue", display_with = "display_number")]
    pub renewal_value: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SpendRow {
    #[serde(rename = "Vendor")]
    #[tabled(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "TotalCost")]
    #[tabled(rename = "TotalCost", display_with = "display_number")]
    pub total_cost: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct LocationUsageRow {
    #[serde(rename = "Location")]
    #[tabled(rename = "Location")]
    pub location: String,
    #[serde(rename = "ActualUsage")]
    #[tabled(rename = "Usage")]
    pub usage: u64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ForecastRow {
    #[serde(rename = "Vendor")]
    #[tabled(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "ActualUsage")]
    #[tabled(rename = "Usage")]
    pub usage: u64,
    #[serde(rename = "ForecastNextQuarter")]
    #[tabled(rename = "NextQuarter", display_with = "display_number")]
    pub forecast_next_quarter: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ActionItem {
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "Vendor")]
    #[tabled(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "Detail")]
    #[tabled(rename = "Detail")]
    pub detail: String,
    #[serde(rename = "EstimatedImpact")]
    #[tabled(rename = "Impact", display_with = "display_number")]
    pub impact: f64,
}

#[derive(Debug, Serialize, Tabled, Clone, PartialEq)]
pub struct MonthlySpend {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Spend")]
    #[tabled(rename = "Spend", display_with = "display_number")]
    pub spend: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CoverageRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Provider")]
    #[tabled(rename = "Provider")]
    pub provider: String,
    #[serde(rename = "TotalCost")]
    #[tabled(rename = "TotalCost", display_with = "display_number")]
    pub total_cost: f64,
    #[serde(rename = "CoveragePct")]
    #[tabled(rename = "Coverage%", display_with = "display_number")]
    pub coverage_pct: f64,
}

/// Headline figures for the summary view and the `summary.json` export.
#[derive(Debug, Serialize)]
pub struct KpiSummary {
    pub total_entitled: u64,
    pub total_usage: u64,
    pub unused_licenses: i64,
    pub overall_utilization_pct: f64,
    pub compliance_rate: f64,
    pub distinct_vendors: usize,
    pub distinct_employees: usize,
    pub active_employees: usize,
    pub actual_spend: f64,
    pub effective_spend: f64,
    pub savings_opportunity: f64,
    pub cost_per_employee: f64,
    pub cost_per_active_user: f64,
}

/// User-chosen knobs for the savings scenario. Supplied per report pass,
/// never stored with the data.
#[derive(Debug, Clone)]
pub struct ScenarioParameters {
    pub reclaim_percent: f64,
    pub downgrade_percent: f64,
    pub budget: f64,
}

impl ScenarioParameters {
    /// Clamp into the valid ranges. Core calculators expect pre-clamped
    /// values; the shell applies this before every pass.
    pub fn clamped(&self) -> Self {
        Self {
            reclaim_percent: self.reclaim_percent.clamp(0.0, 100.0),
            downgrade_percent: self.downgrade_percent.clamp(0.0, 100.0),
            budget: self.budget.max(0.0),
        }
    }
}

impl Default for ScenarioParameters {
    fn default() -> Self {
        Self {
            reclaim_percent: 50.0,
            downgrade_percent: 30.0,
            budget: 100_000.0,
        }
    }
}

/// One edition's downgrade rule: licenses on this edition whose usage is at
/// or below the policy ceiling contribute `fraction` of their cost.
#[derive(Debug, Clone)]
pub struct EditionRule {
    pub edition: String,
    pub fraction: f64,
}

/// Which vendor/edition combinations qualify for downgrade savings. Domain
/// policy rather than an algorithm, so it stays configurable.
#[derive(Debug, Clone)]
pub struct DowngradePolicy {
    pub vendor: String,
    pub rules: Vec<EditionRule>,
    pub usage_ceiling: u32,
}

impl Default for DowngradePolicy {
    fn default() -> Self {
        Self {
            vendor: "Microsoft 365".to_string(),
            rules: vec![
                EditionRule {
                    edition: "E5".to_string(),
                    fraction: 0.8,
                },
                EditionRule {
                    edition: "E3".to_string(),
                    fraction: 0.4,
                },
            ],
            usage_ceiling: 1,
        }
    }
}

/// Illustrative business constants carried from the source dashboards.
/// None of them has a stated derivation, so they stay parameters.
#[derive(Debug, Clone)]
pub struct Assumptions {
    /// Dollars of audit exposure per over-used license.
    pub penalty_per_license: f64,
    /// Flat savings assumed from consolidating overlapping tools.
    pub consolidation_savings: f64,
    /// Next-quarter usage forecast multiplier.
    pub usage_growth_factor: f64,
    pub downgrade: DowngradePolicy,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            penalty_per_license: 200.0,
            consolidation_savings: 40_000.0,
            usage_growth_factor: 1.1,
            downgrade: DowngradePolicy::default(),
        }
    }
}

#[cfg(test)]
impl TelemetryRecord {
    /// Fully-populated record for tests; override fields with struct update
    /// syntax where a test needs something specific.
    pub(crate) fn sample(vendor: &str, entitled: u32, usage: u32, cost: f64) -> Self {
        Self {
            employee_id: "E001".to_string(),
            device_id: "D001".to_string(),
            vendor: vendor.to_string(),
            product: format!("{} Suite", vendor),
            location: "London".to_string(),
            department: "Engineering".to_string(),
            deployment_type: "Cloud".to_string(),
            edition: "Standard".to_string(),
            license_type: "Subscription".to_string(),
            entitled_licenses: entitled,
            actual_usage: usage,
            cost_per_license: cost,
            last_used_days: 0,
            contract_end_date: chrono::NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            is_eol: false,
            known_vulns: 0,
            days_since_patch: 30,
        }
    }
}
