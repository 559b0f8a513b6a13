use crate::types::TelemetryRecord;
use std::collections::{HashMap, HashSet};

/// Columns that accept set-membership filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterColumn {
    Vendor,
    Product,
    Location,
    Department,
    DeploymentType,
    Edition,
    LicenseType,
}

impl FilterColumn {
    fn value<'a>(&self, record: &'a TelemetryRecord) -> &'a str {
        match self {
            FilterColumn::Vendor => &record.vendor,
            FilterColumn::Product => &record.product,
            FilterColumn::Location => &record.location,
            FilterColumn::Department => &record.department,
            FilterColumn::DeploymentType => &record.deployment_type,
            FilterColumn::Edition => &record.edition,
            FilterColumn::LicenseType => &record.license_type,
        }
    }
}

/// Combined filter state: per-column accepted-value sets ANDed together,
/// plus a free-text query ORed across the searchable identity columns
/// (EmployeeID, DeviceID, Location, Vendor, Product). An empty set and an
/// empty query both mean "no filter".
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    selections: HashMap<FilterColumn, HashSet<String>>,
    query: String,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict `column` to the given values, replacing any earlier
    /// selection for it.
    pub fn select<I, S>(mut self, column: FilterColumn, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: HashSet<String> = values.into_iter().map(Into::into).collect();
        self.selections.insert(column, set);
        self
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = query.to_string();
        self
    }
}

/// A filtered view plus the counts the shell displays ("N of M records").
#[derive(Debug)]
pub struct FilteredTable {
    pub rows: Vec<TelemetryRecord>,
    pub matched: usize,
    pub total: usize,
}

pub fn filter_records(records: &[TelemetryRecord], criteria: &FilterCriteria) -> FilteredTable {
    let needle = criteria.query.trim().to_lowercase();
    let rows: Vec<TelemetryRecord> = records
        .iter()
        .filter(|r| {
            passes_selections(r, &criteria.selections)
                && (needle.is_empty() || matches_query(r, &needle))
        })
        .cloned()
        .collect();
    FilteredTable {
        matched: rows.len(),
        total: records.len(),
        rows,
    }
}

fn passes_selections(
    record: &TelemetryRecord,
    selections: &HashMap<FilterColumn, HashSet<String>>,
) -> bool {
    selections
        .iter()
        .all(|(column, accepted)| accepted.is_empty() || accepted.contains(column.value(record)))
}

fn matches_query(record: &TelemetryRecord, needle: &str) -> bool {
    [
        record.employee_id.as_str(),
        record.device_id.as_str(),
        record.location.as_str(),
        record.vendor.as_str(),
        record.product.as_str(),
    ]
    .iter()
    .any(|text| text.to_lowercase().contains(needle))
}
