//! Output formatting and persistence for pipeline results.
//!
//! Supports pretty-printing, JSON, per-view CSV tables, and the canonical
//! wide CSV export.

use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::facts::FactTable;
use crate::schema::{LINE_NAME, SERVICE_MONTH, STATION_ID, STATION_NAME};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl std::fmt::Debug) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes result rows to a fresh CSV file with a header line.
pub fn write_rows<T: Serialize>(path: impl AsRef<Path>, rows: &[T]) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path.as_ref())?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.as_ref().display(), rows = rows.len(), "Rows written");
    Ok(())
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: impl AsRef<Path>, record: &impl Serialize) -> Result<()> {
    let path = path.as_ref();
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Writes the canonical wide table as UTF-8 with a BOM.
///
/// Columns are the four identity fields followed by `HH_승차`/`HH_하차` in
/// canonical column order; one record per valid source row.
pub fn export_wide_csv<W: Write>(table: &FactTable, mut out: W) -> Result<()> {
    out.write_all(UTF8_BOM)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(out);

    let mut header = vec![
        SERVICE_MONTH.to_string(),
        LINE_NAME.to_string(),
        STATION_ID.to_string(),
        STATION_NAME.to_string(),
    ];
    header.extend(table.columns.iter().map(|c| c.label()));
    writer.write_record(&header)?;

    for (idx, row) in table.rows.iter().enumerate() {
        let mut record = vec![
            row.service_month.clone(),
            row.line_name.clone(),
            row.station_id.clone(),
            row.station_name.clone(),
        ];
        record.extend(table.row_facts(idx).iter().map(|f| f.count.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Exports the wide table to `path`, gzip-compressed when `gzip` is set.
pub fn export_to_path(table: &FactTable, path: impl AsRef<Path>, gzip: bool) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;

    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        export_wide_csv(table, &mut encoder)?;
        encoder.finish()?;
    } else {
        export_wide_csv(table, file)?;
    }

    info!(path = %path.display(), rows = table.rows.len(), gzip, "Wide table exported");
    Ok(())
}
