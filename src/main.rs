// Entry point and high-level CLI flow.
//
// - Option [1] loads the telemetry CSV into the table cache, printing
//   diagnostics about applied defaults.
// - Option [2] runs the full report pass: console previews, CSV exports
//   per view, and a JSON KPI summary.
// - Option [3] sets the scenario parameters used by the savings projection.
// - Option [4] filters records by search text and a categorical column and
//   exports the matching subset.
// - After generating reports, the user can choose to go back to the
//   selection menu or exit.
mod aggregate;
mod anomaly;
mod cache;
mod filter;
mod loader;
mod metrics;
mod output;
mod reports;
mod scenario;
mod types;
mod util;

use cache::TableCache;
use loader::LoadOptions;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::io::{self, Write};
use std::sync::Mutex;
use tabled::Tabled;
use types::{Assumptions, ScenarioParameters, TelemetryRecord};

const TELEMETRY_PATH: &str = "telemetry_data.csv";
const CLOUD_COSTS_PATH: &str = "cloud_costs.csv";

/// Rows shown per console preview; the CSV export always has the full table.
const PREVIEW_ROWS: usize = 5;

// Simple in-memory app state so we only load the CSV once but can generate
// reports multiple times in a single run.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        cache: TableCache::new(),
        scenario: ScenarioParameters::default(),
    })
});

struct AppState {
    cache: TableCache,
    scenario: ScenarioParameters,
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    print!("Enter choice: ");
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Prompt for one line of free text with a label, e.g. a search query.
fn read_text(label: &str) -> String {
    print!("{}: ", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

/// Prompt for a number, keeping `current` on blank or unparseable input.
fn read_number(label: &str, current: f64) -> f64 {
    print!("{} [{}]: ", label, current);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    let trimmed = buf.trim();
    if trimmed.is_empty() {
        return current;
    }
    match trimmed.parse::<f64>() {
        Ok(v) => v,
        Err(_) => {
            println!("Not a number; keeping {}.", current);
            current
        }
    }
}

/// Ask the user whether to go back to the report selection menu after
/// generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        print!("Back to Report Selection (Y/N): ");
        let _ = io::stdout().flush();
        let mut buf = String::new();
        io::stdin().read_line(&mut buf).ok();
        let resp = buf.trim().to_uppercase();
        match resp.as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Preview a derived table on the console and export the full table as CSV.
fn emit_report<T>(title: &str, note: Option<&str>, rows: &[T], file: &str)
where
    T: Tabled + Clone + Serialize,
{
    output::preview_table(title, note, rows, PREVIEW_ROWS);
    match output::write_csv(file, rows) {
        Ok(count) => println!(
            "(Full table: {} rows exported to {})\n",
            util::format_int(count),
            file
        ),
        Err(e) => eprintln!("Write error: {}", e),
    }
}

/// Handle option [1]: (re)load the telemetry CSV into the cache.
///
/// On success we print a short summary of the load, including how many rows
/// needed default prices or synthetic contract dates.
fn handle_load() {
    let opts = LoadOptions::for_today();
    let mut state = APP_STATE.lock().unwrap();
    match state.cache.reload(TELEMETRY_PATH, &opts) {
        Ok(entry) => {
            let report = &entry.report;
            println!(
                "Processing telemetry... ({} rows read, {} records loaded)",
                util::format_int(report.total_rows),
                util::format_int(report.loaded_rows)
            );
            if report.defaulted_prices > 0 {
                println!(
                    "Note: {} rows priced from the vendor default table.",
                    util::format_int(report.defaulted_prices)
                );
            }
            if report.synthesized_dates > 0 {
                println!(
                    "Note: {} rows assigned a synthetic contract end date.",
                    util::format_int(report.synthesized_dates)
                );
            }
            if report.fallback_dates > 0 {
                println!(
                    "Note: {} unparseable contract end dates set to today.",
                    util::format_int(report.fallback_dates)
                );
            }
            println!();
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

/// Clone the cached records out of the app state, or report the missing
/// load and return `None`.
fn loaded_records() -> Option<Vec<TelemetryRecord>> {
    let state = APP_STATE.lock().unwrap();
    match state.cache.get() {
        Some(entry) => Some(entry.records.clone()),
        None => {
            println!("Error: No data loaded. Please load the telemetry file first (option 1).\n");
            None
        }
    }
}

/// Handle option [2]: generate every report view.
///
/// This function is intentionally side-effectful: it writes one CSV per
/// view, a JSON summary, and prints Markdown previews to the console.
fn handle_generate_reports() {
    let Some(records) = loaded_records() else {
        return;
    };
    let params = {
        let state = APP_STATE.lock().unwrap();
        state.scenario.clamped()
    };
    let assumptions = Assumptions::default();
    let opts = LoadOptions::for_today();

    println!("Generating reports...");
    println!("Outputs saved to individual files...");

    let kpis = metrics::kpi_summary(&records, params.budget);
    println!("\nKPI Summary");
    println!(
        "  Total entitled / usage:  {} / {}",
        util::format_int(kpis.total_entitled),
        util::format_int(kpis.total_usage)
    );
    println!(
        "  Unused licenses:         {}",
        util::format_int(kpis.unused_licenses)
    );
    println!(
        "  Overall utilization:     {}%",
        util::format_number(kpis.overall_utilization_pct, 2)
    );
    println!(
        "  Compliance rate:         {}%",
        util::format_number(kpis.compliance_rate, 2)
    );
    println!(
        "  Vendors:                 {}",
        util::format_int(kpis.distinct_vendors)
    );
    println!(
        "  Employees (active):      {} ({})",
        util::format_int(kpis.distinct_employees),
        util::format_int(kpis.active_employees)
    );
    println!(
        "  Actual spend:            {}",
        util::format_number(kpis.actual_spend, 2)
    );
    println!(
        "  Effective spend:         {}",
        util::format_number(kpis.effective_spend, 2)
    );
    println!(
        "  Savings opportunity:     {}",
        util::format_number(kpis.savings_opportunity, 2)
    );
    println!(
        "  Cost per employee:       {}",
        util::format_number(kpis.cost_per_employee, 2)
    );
    println!(
        "  Cost per active user:    {}",
        util::format_number(kpis.cost_per_active_user, 2)
    );
    if let Err(e) = output::write_json("summary.json", &kpis) {
        eprintln!("Write error: {}", e);
    }
    println!("(Summary exported to summary.json)");

    emit_report(
        "Vendor Usage & Utilization",
        None,
        &reports::vendor_usage(&records),
        "vendor_usage.csv",
    );
    emit_report(
        "Compliance Risk",
        Some("vendors using beyond entitlement"),
        &reports::compliance_risk(&records, &assumptions),
        "compliance_risk.csv",
    );
    emit_report(
        "Optimization Opportunities",
        Some("under-utilized entitlements and their cost"),
        &reports::optimization(&records),
        "optimization.csv",
    );
    emit_report(
        "Idle Licenses",
        Some("unused for 90+ days"),
        &reports::idle_licenses(&records, reports::DEFAULT_IDLE_THRESHOLD_DAYS),
        "idle_licenses.csv",
    );
    emit_report(
        "Security Exposure",
        None,
        &reports::security_exposure(&records),
        "security_exposure.csv",
    );
    emit_report(
        "Adoption by Department",
        None,
        &reports::adoption_by_department(&records),
        "adoption.csv",
    );
    emit_report(
        "Renewals by Quarter",
        None,
        &reports::renewal_quarters(&records),
        "renewal_quarters.csv",
    );
    emit_report(
        "Renewal Calendar",
        Some("contracts ending within 365 days"),
        &reports::renewal_window(&records, opts.today),
        "renewal_window.csv",
    );
    emit_report(
        "Spend by Vendor",
        None,
        &reports::spend_by_vendor(&records),
        "spend_by_vendor.csv",
    );
    emit_report(
        "Usage by Location",
        None,
        &reports::usage_by_location(&records),
        "usage_by_location.csv",
    );
    emit_report(
        "Usage Forecast",
        Some("next quarter at the assumed growth factor"),
        &reports::usage_forecast(&records, &assumptions),
        "usage_forecast.csv",
    );

    let shelfware = reports::shelfware_baseline(&records);
    let downgrade = scenario::downgrade_baseline(&records, &assumptions.downgrade);
    let savings = scenario::project(
        shelfware,
        downgrade,
        params.reclaim_percent,
        params.downgrade_percent,
        assumptions.consolidation_savings,
    );
    println!(
        "Scenario Projection (reclaim {}%, downgrade {}%)",
        util::format_number(params.reclaim_percent, 0),
        util::format_number(params.downgrade_percent, 0)
    );
    println!(
        "  Shelfware reclaim:       {}",
        util::format_number(savings.shelfware, 2)
    );
    println!(
        "  Edition downgrade:       {}",
        util::format_number(savings.downgrade, 2)
    );
    println!(
        "  Consolidation:           {}",
        util::format_number(savings.consolidation, 2)
    );
    println!(
        "  Total projected savings: {}",
        util::format_number(savings.total, 2)
    );

    let (costs, synthetic) = loader::load_cloud_costs(CLOUD_COSTS_PATH, &opts);
    let cloud_note = if synthetic {
        Some("synthetic series; no cloud_costs.csv found")
    } else {
        None
    };
    let series = anomaly::monthly_spend(&costs);
    emit_report(
        "Monthly Cloud Spend",
        cloud_note,
        &series,
        "monthly_cloud_spend.csv",
    );
    let flagged = anomaly::detect_anomalies(&series);
    if flagged.is_empty() {
        println!("No spend anomalies flagged.\n");
    } else {
        emit_report(
            "Spend Anomalies",
            Some("months above mean + 2 std dev"),
            &flagged,
            "spend_anomalies.csv",
        );
    }
    emit_report(
        "Commitment Coverage",
        cloud_note,
        &anomaly::commitment_coverage(&costs),
        "commitment_coverage.csv",
    );

    emit_report(
        "Action Items",
        Some("highest estimated impact first"),
        &reports::action_items(&records, &assumptions),
        "action_items.csv",
    );
}

/// Handle option [3]: update the stored scenario parameters.
fn handle_scenario() {
    println!("\nScenario Parameters (blank keeps the current value)");
    let mut state = APP_STATE.lock().unwrap();
    let current = state.scenario.clone();
    let updated = ScenarioParameters {
        reclaim_percent: read_number("Reclaim percent", current.reclaim_percent),
        downgrade_percent: read_number("Downgrade percent", current.downgrade_percent),
        budget: read_number("Annual budget", current.budget),
    }
    .clamped();
    println!(
        "Scenario set: reclaim {}%, downgrade {}%, budget {}\n",
        util::format_number(updated.reclaim_percent, 0),
        util::format_number(updated.downgrade_percent, 0),
        util::format_number(updated.budget, 2)
    );
    state.scenario = updated;
}

/// Pick the categorical column an accepted-value filter applies to.
fn read_filter_column() -> Option<filter::FilterColumn> {
    println!("Filter column: [1] Vendor [2] Product [3] Location [4] Department");
    println!("               [5] DeploymentType [6] Edition [7] LicenseType [blank] none");
    match read_text("Column").as_str() {
        "1" => Some(filter::FilterColumn::Vendor),
        "2" => Some(filter::FilterColumn::Product),
        "3" => Some(filter::FilterColumn::Location),
        "4" => Some(filter::FilterColumn::Department),
        "5" => Some(filter::FilterColumn::DeploymentType),
        "6" => Some(filter::FilterColumn::Edition),
        "7" => Some(filter::FilterColumn::LicenseType),
        _ => None,
    }
}

/// Handle option [4]: filter the loaded records and export the subset.
fn handle_search() {
    let Some(records) = loaded_records() else {
        return;
    };
    let query = read_text("Search text (blank for all)");
    let mut criteria = filter::FilterCriteria::new().with_query(&query);
    if let Some(column) = read_filter_column() {
        let values = read_text("Accepted values, comma separated (blank for all)");
        let list: Vec<String> = values
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        criteria = criteria.select(column, list);
    }
    let result = filter::filter_records(&records, &criteria);

    println!(
        "\nMatched {} of {} records.",
        util::format_int(result.matched),
        util::format_int(result.total)
    );
    match output::write_csv("filtered_records.csv", &result.rows) {
        Ok(count) => println!(
            "({} rows exported to filtered_records.csv)\n",
            util::format_int(count)
        ),
        Err(e) => eprintln!("Write error: {}", e),
    }
}

fn main() {
    loop {
        println!("SAM Telemetry Reports:");
        println!("[1] Load telemetry data");
        println!("[2] Generate reports");
        println!("[3] Set scenario parameters");
        println!("[4] Search & export records\n");
        match read_choice().as_str() {
            "1" => {
                handle_load();
            }
            "2" => {
                println!();
                handle_generate_reports();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => {
                handle_scenario();
            }
            "4" => {
                handle_search();
            }
            _ => {
                println!("Invalid choice. Please enter 1-4.\n");
            }
        }
    }
}
