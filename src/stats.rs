use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::facts::FactTable;
use crate::loader::TextEncoding;
use crate::schema::Direction;

#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    pub loaded_at: DateTime<Utc>,
    pub source_hash: String,
    pub encoding: TextEncoding,

    // rows
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub rows_kept: usize,

    // columns
    pub columns_kept: usize,
    pub columns_dropped: usize,

    // facts
    pub facts: usize,
    pub stations: usize,
    pub combined_stations: usize,
    pub lines: usize,
    pub total_boarding: u64,
    pub total_alighting: u64,
}

impl DatasetSummary {
    pub fn from_table(table: &FactTable) -> Self {
        let combined_stations = table.station_names().len();
        let stations = table
            .rows
            .iter()
            .map(|r| (r.line_name.as_str(), r.station_name.as_str()))
            .collect::<std::collections::BTreeSet<_>>()
            .len();

        DatasetSummary {
            loaded_at: Utc::now(),
            source_hash: table.source_hash.clone(),
            encoding: table.encoding,
            rows_read: table.rows_read,
            rows_dropped: table.rows_dropped,
            rows_kept: table.rows.len(),
            columns_kept: table.columns.len(),
            columns_dropped: table.columns_dropped,
            facts: table.facts.len(),
            stations,
            combined_stations,
            lines: table.line_names().len(),
            total_boarding: table.total(Direction::Boarding),
            total_alighting: table.total(Direction::Alighting),
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn dropped_row_pct(&self) -> f64 {
        Self::pct(self.rows_dropped, self.rows_read)
    }
}
