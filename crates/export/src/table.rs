use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use classify::ExtractionResult;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ExportError;

pub const DEFAULT_OWNER: &str = "Your name";
pub const TABLE_TITLE: &str = "Utläggsräkning";
pub const TABLE_HEADER: [&str; 4] = ["Bolag", "Type", "Date", "Cost"];

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Owner written on the `Namn:` row when a request names nobody.
    pub default_owner: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_owner: DEFAULT_OWNER.to_string(),
        }
    }
}

impl ExportConfig {
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.default_owner.trim().is_empty() {
            return Err(ExportError::InvalidConfig("default_owner must not be empty".into()));
        }
        Ok(())
    }

    /// `requested` when it has content, otherwise the configured default.
    pub fn owner_or_default<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.default_owner)
    }
}

/// `expenses_<Mon><year>.csv`, e.g. `expenses_Oct2026.csv`.
pub fn table_file_name(date: NaiveDate) -> String {
    format!("expenses_{}.csv", date.format("%b%Y"))
}

/// Writes the expense table into `dir`, named for the current month.
pub fn write_table<'a, I>(results: I, owner: &str, dir: &Path) -> Result<PathBuf, ExportError>
where
    I: IntoIterator<Item = &'a ExtractionResult>,
{
    write_table_dated(results, owner, dir, Local::now().date_naive())
}

/// [`write_table`] for an explicit month.
///
/// Rows are ordered by receipt date (undated last), then company, cost,
/// category and source file. The order pipelines finished in never shows.
pub fn write_table_dated<'a, I>(
    results: I,
    owner: &str,
    dir: &Path,
    month: NaiveDate,
) -> Result<PathBuf, ExportError>
where
    I: IntoIterator<Item = &'a ExtractionResult>,
{
    let mut rows: Vec<&ExtractionResult> = results.into_iter().collect();
    rows.sort_by(|a, b| compare_rows(a, b));

    let path = dir.join(table_file_name(month));
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(&path)?;

    let owner = match owner.trim() {
        "" => DEFAULT_OWNER,
        trimmed => trimmed,
    };
    writer.write_record([TABLE_TITLE])?;
    writer.write_record(["Namn:", owner])?;
    writer.write_record(["", "", "", ""])?;
    writer.write_record(TABLE_HEADER)?;
    for row in &rows {
        let cost = row.cost.to_string();
        writer.write_record([
            row.company_name.as_str(),
            row.category.label(),
            row.date.as_str(),
            cost.as_str(),
        ])?;
    }
    writer.flush().map_err(|e| ExportError::io(&path, e))?;

    info!(path = %path.display(), rows = rows.len(), "table_written");
    Ok(path)
}

fn parsed_date(result: &ExtractionResult) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&result.date, "%d-%m-%Y").ok()
}

fn compare_rows(a: &ExtractionResult, b: &ExtractionResult) -> Ordering {
    let by_date = match (parsed_date(a), parsed_date(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date
        .then_with(|| a.company_name.cmp(&b.company_name))
        .then_with(|| a.cost.cmp(&b.cost))
        .then_with(|| a.category.label().cmp(b.category.label()))
        .then_with(|| a.source_path.cmp(&b.source_path))
}
