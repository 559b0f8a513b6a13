use crate::loader::{self, LoadError, LoadOptions, LoadReport};
use crate::types::TelemetryRecord;

/// A loaded table plus the diagnostics from loading it.
#[derive(Debug)]
pub struct CachedTable {
    pub records: Vec<TelemetryRecord>,
    pub report: LoadReport,
}

/// Single-entry cache over the telemetry load. The table is read once and
/// reused by every report pass; `reload` and `invalidate` are the only two
/// ways the cached data ever changes.
#[derive(Debug, Default)]
pub struct TableCache {
    entry: Option<CachedTable>,
}

impl TableCache {
    pub fn new() -> Self {
        Self { entry: None }
    }

    /// Return the cached table, loading it on first use.
    pub fn load(&mut self, path: &str, opts: &LoadOptions) -> Result<&CachedTable, LoadError> {
        let entry = match self.entry.take() {
            Some(existing) => existing,
            None => {
                let (records, report) = loader::load_records(path, opts)?;
                CachedTable { records, report }
            }
        };
        Ok(self.entry.insert(entry))
    }

    /// Drop whatever is cached and load fresh from disk.
    pub fn reload(&mut self, path: &str, opts: &LoadOptions) -> Result<&CachedTable, LoadError> {
        self.invalidate();
        self.load(path, opts)
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn get(&self) -> Option<&CachedTable> {
        self.entry.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    const HEADER: &str =
        "EmployeeID,DeviceID,Vendor,Product,Location,EntitledLicenses,ActualUsage,DeploymentType";

    fn write_temp_csv(name: &str, rows: &[&str]) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(name);
        let mut contents = String::from(HEADER);
        for row in rows {
            contents.push('\n');
            contents.push_str(row);
        }
        contents.push('\n');
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn opts() -> LoadOptions {
        LoadOptions {
            today: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            seed: Some(11),
        }
    }

    #[test]
    fn test_load_serves_cached_entry_until_invalidated() {
        let path = write_temp_csv(
            "sam_report_cache_basic.csv",
            &["E001,D001,Zoom,Zoom One,Austin,3,2,Cloud"],
        );
        let path_str = path.to_str().unwrap();
        let mut cache = TableCache::new();
        assert!(cache.get().is_none());

        let first_len = cache.load(path_str, &opts()).unwrap().records.len();
        assert_eq!(first_len, 1);
        assert!(cache.get().is_some());

        // Grow the file on disk; a plain load must keep serving the old table.
        write_temp_csv(
            "sam_report_cache_basic.csv",
            &[
                "E001,D001,Zoom,Zoom One,Austin,3,2,Cloud",
                "E002,D002,Zoom,Zoom One,Austin,1,1,Cloud",
            ],
        );
        assert_eq!(cache.load(path_str, &opts()).unwrap().records.len(), 1);

        // An explicit reload picks up the change.
        assert_eq!(cache.reload(path_str, &opts()).unwrap().records.len(), 2);
    }

    #[test]
    fn test_invalidate_clears_the_entry() {
        let path = write_temp_csv(
            "sam_report_cache_invalidate.csv",
            &["E001,D001,Zoom,Zoom One,Austin,3,2,Cloud"],
        );
        let mut cache = TableCache::new();
        cache.load(path.to_str().unwrap(), &opts()).unwrap();
        assert!(cache.get().is_some());

        cache.invalidate();
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_failed_load_leaves_cache_empty() {
        let mut cache = TableCache::new();
        assert!(cache.load("no_such_telemetry.csv", &opts()).is_err());
        assert!(cache.get().is_none());
    }

    #[test]
    fn test_load_report_travels_with_the_table() {
        let path = write_temp_csv(
            "sam_report_cache_report.csv",
            &["E001,D001,Zoom,Zoom One,Austin,3,2,Cloud"],
        );
        let mut cache = TableCache::new();
        let entry = cache.load(path.to_str().unwrap(), &opts()).unwrap();
        assert_eq!(entry.report.total_rows, 1);
        assert_eq!(entry.report.loaded_rows, 1);
        // The base schema has no price or date columns.
        assert_eq!(entry.report.defaulted_prices, 1);
        assert_eq!(entry.report.synthesized_dates, 1);
    }
}
