use crate::types::{CloudCostRecord, RawCloudCostRow, RawTelemetryRow, TelemetryRecord};
use crate::util::{parse_bool_safe, parse_date_safe, parse_f64_safe, parse_u32_safe};
use chrono::{Datelike, Duration, Local, NaiveDate};
use csv::ReaderBuilder;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Published list prices used when a row arrives without CostPerLicense.
/// Vendors outside this table get `FALLBACK_PRICE`.
const VENDOR_PRICES: &[(&str, f64)] = &[
    ("Microsoft 365", 15.0),
    ("Adobe CC", 25.0),
    ("Oracle DB", 500.0),
    ("SQL Server", 300.0),
    ("Zoom", 12.0),
    ("Salesforce", 120.0),
];

pub const FALLBACK_PRICE: f64 = 50.0;

/// Number of months in the synthetic cloud-cost series.
const SYNTHETIC_MONTHS: usize = 12;

/// Monthly on-demand baselines for the synthetic series, per provider.
const SYNTHETIC_PROVIDERS: &[(&str, f64)] = &[("AWS", 42_000.0), ("Azure", 28_000.0)];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed input: row {row} is missing required column {field}")]
    MissingField { row: usize, field: &'static str },

    #[error("Malformed input: row {row} has unparseable {field} value {value:?}")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },
}

/// Knobs the loader needs beyond the file path. `today` anchors contract-date
/// synthesis and the renewal windows; `seed` makes the synthesis repeatable
/// (tests and reproducible report runs pass `Some`, the shell passes `None`).
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub today: NaiveDate,
    pub seed: Option<u64>,
}

impl LoadOptions {
    pub fn for_today() -> Self {
        Self {
            today: Local::now().date_naive(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    /// Rows priced from the vendor table because CostPerLicense was absent.
    pub defaulted_prices: usize,
    /// Rows whose ContractEndDate was absent and had to be synthesized.
    pub synthesized_dates: usize,
    /// Rows whose ContractEndDate was present but unparseable (set to today).
    pub fallback_dates: usize,
}

pub fn default_price(vendor: &str) -> f64 {
    VENDOR_PRICES
        .iter()
        .find(|(v, _)| *v == vendor)
        .map(|(_, price)| *price)
        .unwrap_or(FALLBACK_PRICE)
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Load the telemetry CSV and normalize every row. A missing or unparseable
/// required field aborts the whole load; optional fields take the documented
/// defaults and are tallied in the `LoadReport`.
pub fn load_records(
    path: &str,
    opts: &LoadOptions,
) -> Result<(Vec<TelemetryRecord>, LoadReport), LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut rng = make_rng(opts.seed);
    let mut report = LoadReport {
        total_rows: 0,
        loaded_rows: 0,
        defaulted_prices: 0,
        synthesized_dates: 0,
        fallback_dates: 0,
    };
    let mut records: Vec<TelemetryRecord> = Vec::new();

    for result in rdr.deserialize::<RawTelemetryRow>() {
        report.total_rows += 1;
        let raw = result?;
        let record = normalize_row(raw, report.total_rows, opts.today, &mut rng, &mut report)?;
        records.push(record);
    }

    report.loaded_rows = records.len();
    Ok((records, report))
}

fn normalize_row(
    raw: RawTelemetryRow,
    row: usize,
    today: NaiveDate,
    rng: &mut StdRng,
    report: &mut LoadReport,
) -> Result<TelemetryRecord, LoadError> {
    let employee_id = required_text(raw.employee_id, row, "EmployeeID")?;
    let device_id = required_text(raw.device_id, row, "DeviceID")?;
    let vendor = required_text(raw.vendor, row, "Vendor")?;
    let product = required_text(raw.product, row, "Product")?;
    let location = required_text(raw.location, row, "Location")?;
    let deployment_type = required_text(raw.deployment_type, row, "DeploymentType")?;
    let entitled_licenses = required_count(raw.entitled_licenses, row, "EntitledLicenses")?;
    let actual_usage = required_count(raw.actual_usage, row, "ActualUsage")?;

    let department = optional_text(raw.department, "Unknown");
    let edition = optional_text(raw.edition, "Standard");
    let license_type = optional_text(raw.license_type, "Subscription");

    let cost_per_license = match parse_f64_safe(raw.cost_per_license.as_deref()) {
        Some(v) if v >= 0.0 => v,
        _ => {
            report.defaulted_prices += 1;
            default_price(&vendor)
        }
    };

    let last_used_days = parse_u32_safe(raw.last_used_days.as_deref()).unwrap_or(0);

    // An absent end date gets a plausible synthetic one so renewal views stay
    // populated; a present but garbled one collapses to today (urgent bucket)
    // rather than inventing a horizon the file never claimed.
    let has_date_text = raw
        .contract_end_date
        .as_deref()
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);
    let contract_end_date = match parse_date_safe(raw.contract_end_date.as_deref()) {
        Some(d) => d,
        None if has_date_text => {
            report.fallback_dates += 1;
            today
        }
        None => {
            report.synthesized_dates += 1;
            today + Duration::days(rng.gen_range(30..=365))
        }
    };

    let is_eol = parse_bool_safe(raw.is_eol.as_deref()).unwrap_or(false);
    let known_vulns = parse_u32_safe(raw.known_vulns.as_deref()).unwrap_or(0);
    let days_since_patch = parse_u32_safe(raw.days_since_patch.as_deref()).unwrap_or(30);

    Ok(TelemetryRecord {
        employee_id,
        device_id,
        vendor,
        product,
        location,
        department,
        deployment_type,
        edition,
        license_type,
        entitled_licenses,
        actual_usage,
        cost_per_license,
        last_used_days,
        contract_end_date,
        is_eol,
        known_vulns,
        days_since_patch,
    })
}

fn required_text(
    value: Option<String>,
    row: usize,
    field: &'static str,
) -> Result<String, LoadError> {
    match value {
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(LoadError::MissingField { row, field })
            } else {
                Ok(trimmed.to_string())
            }
        }
        None => Err(LoadError::MissingField { row, field }),
    }
}

fn required_count(
    value: Option<String>,
    row: usize,
    field: &'static str,
) -> Result<u32, LoadError> {
    let text = match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Err(LoadError::MissingField { row, field }),
    };
    parse_u32_safe(Some(text.as_str())).ok_or_else(|| LoadError::InvalidField {
        row,
        field,
        value: text.trim().to_string(),
    })
}

fn optional_text(value: Option<String>, default: &str) -> String {
    match value {
        Some(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                default.to_string()
            } else {
                trimmed.to_string()
            }
        }
        None => default.to_string(),
    }
}

/// Load the optional cloud-cost sidecar. Any failure (file missing,
/// unreadable, or empty) falls back to a synthetic series; the boolean says
/// whether the returned data is synthetic so the caller can label it.
pub fn load_cloud_costs(path: &str, opts: &LoadOptions) -> (Vec<CloudCostRecord>, bool) {
    match read_cloud_costs(path) {
        Ok(rows) if !rows.is_empty() => (rows, false),
        _ => (synthetic_cloud_costs(opts), true),
    }
}

fn read_cloud_costs(path: &str) -> Result<Vec<CloudCostRecord>, LoadError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut rows: Vec<CloudCostRecord> = Vec::new();
    for result in rdr.deserialize::<RawCloudCostRow>() {
        let raw = result?;
        // The sidecar is best-effort: rows without a month or provider are
        // skipped, never fatal.
        let month = match raw.month.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => continue,
        };
        let provider = match raw.provider.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => continue,
        };
        rows.push(CloudCostRecord {
            month,
            provider,
            on_demand_cost: parse_f64_safe(raw.on_demand_cost.as_deref()).unwrap_or(0.0),
            discounted_cost: parse_f64_safe(raw.discounted_cost.as_deref()).unwrap_or(0.0),
        });
    }
    Ok(rows)
}

/// Twelve months of plausible per-provider cloud spend ending at `today`'s
/// month. Stands in for a billing feed when no sidecar file is present.
pub fn synthetic_cloud_costs(opts: &LoadOptions) -> Vec<CloudCostRecord> {
    let mut rng = make_rng(opts.seed);
    let months = recent_months(opts.today, SYNTHETIC_MONTHS);
    let mut rows = Vec::with_capacity(months.len() * SYNTHETIC_PROVIDERS.len());
    for month in &months {
        for (provider, base) in SYNTHETIC_PROVIDERS {
            let on_demand = base * rng.gen_range(0.8..1.25);
            let discounted = on_demand * rng.gen_range(0.35..0.65);
            rows.push(CloudCostRecord {
                month: month.clone(),
                provider: (*provider).to_string(),
                on_demand_cost: on_demand,
                discounted_cost: discounted,
            });
        }
    }
    rows
}

/// `count` month labels (`YYYY-MM`) ending at `today`'s month, oldest first.
pub fn recent_months(today: NaiveDate, count: usize) -> Vec<String> {
    let end = today.year() * 12 + today.month() as i32 - 1;
    let mut labels = Vec::with_capacity(count);
    for idx in (0..count as i32).rev() {
        let m = end - idx;
        let year = m.div_euclid(12);
        let month = m.rem_euclid(12) + 1;
        labels.push(format!("{:04}-{:02}", year, month));
    }
    labels
}
