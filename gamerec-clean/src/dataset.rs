//! CSV dataset I/O
//!
//! The input must carry an app id column and all seven critical columns,
//! under their canonical names or one of the localized aliases. Any other
//! column is carried through verbatim. Output keeps the input's headers and
//! column order.

use crate::types::{CriticalField, FieldValue, Record};
use gamerec_common::{Error, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Accepted spellings of the app id header
const APP_ID_HEADERS: [&str; 3] = ["app_id", "appid", "AppID"];

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// What a column holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    AppId,
    Critical(CriticalField),
    /// Index into `Record::passthrough`
    Passthrough(usize),
}

/// A loaded dataset
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Headers as they appeared in the file
    pub headers: Vec<String>,
    pub roles: Vec<ColumnRole>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn is_app_id_header(header: &str) -> bool {
    APP_ID_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(header))
}

/// Map headers to column roles
///
/// Fails if the app id or any critical column is missing or repeated.
pub fn column_roles(headers: &[String]) -> Result<Vec<ColumnRole>> {
    let mut roles = Vec::with_capacity(headers.len());
    let mut passthrough = 0;

    for header in headers {
        let header = header.trim();
        let role = if is_app_id_header(header) {
            ColumnRole::AppId
        } else if let Some(field) = CriticalField::from_header(header) {
            ColumnRole::Critical(field)
        } else {
            passthrough += 1;
            ColumnRole::Passthrough(passthrough - 1)
        };
        if !matches!(role, ColumnRole::Passthrough(_)) && roles.contains(&role) {
            return Err(Error::Config(format!("Duplicate column for {:?}", role)));
        }
        roles.push(role);
    }

    let mut absent: Vec<&str> = Vec::new();
    if !roles.contains(&ColumnRole::AppId) {
        absent.push("app_id");
    }
    for field in CriticalField::ALL {
        if !roles.contains(&ColumnRole::Critical(field)) {
            absent.push(field.column());
        }
    }
    if !absent.is_empty() {
        return Err(Error::Config(format!(
            "Dataset is missing required columns: {}",
            absent.join(", ")
        )));
    }

    Ok(roles)
}

/// Parse an app id cell ("730" or "730.0")
fn parse_app_id(cell: &str) -> Option<u64> {
    let cell = cell.trim();
    cell.parse::<u64>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite() && *n > 0.0 && n.fract() == 0.0)
            .map(|n| n as u64)
    })
}

/// Read a dataset from `path`
///
/// Rows without a usable app id are skipped with a warning.
pub fn load_records(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| Error::Config(format!("Cannot open dataset {}: {}", path.display(), e)))?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();
    let roles = column_roles(&headers)?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (row, result) in reader.records().enumerate() {
        let row_data = result?;
        let mut record = Record::default();
        let mut app_id = None;

        for (role, cell) in roles.iter().zip(row_data.iter()) {
            match role {
                ColumnRole::AppId => app_id = parse_app_id(cell),
                ColumnRole::Critical(field) => record.set(*field, FieldValue::from_cell(cell)),
                ColumnRole::Passthrough(_) => record.passthrough.push(if cell.is_empty() {
                    FieldValue::Null
                } else {
                    FieldValue::Text(cell.to_string())
                }),
            }
        }

        match app_id {
            Some(id) => {
                record.app_id = id;
                records.push(record);
            }
            None => {
                // Header is line 1
                warn!(line = row + 2, "Skipping row without a valid app id");
                skipped += 1;
            }
        }
    }

    info!(
        path = %path.display(),
        records = records.len(),
        skipped,
        columns = headers.len(),
        "Loaded dataset"
    );
    Ok(Dataset {
        headers,
        roles,
        records,
    })
}

/// Write `records` using the headers and column order of `layout`
///
/// The file starts with a UTF-8 BOM so spreadsheet tools pick up the
/// localized headers correctly.
pub fn write_records(path: &Path, layout: &Dataset, records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(&layout.headers)?;

    for record in records {
        let row: Vec<String> = layout
            .roles
            .iter()
            .map(|role| match role {
                ColumnRole::AppId => record.app_id.to_string(),
                ColumnRole::Critical(field) => record.get(*field).to_cell(),
                ColumnRole::Passthrough(i) => record
                    .passthrough
                    .get(*i)
                    .map(FieldValue::to_cell)
                    .unwrap_or_default(),
            })
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), records = records.len(), "Wrote dataset");
    Ok(())
}

/// `<dir>/<stem>_cleaned.csv` next to the input
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    input.with_file_name(format!("{}_cleaned.csv", stem))
}
