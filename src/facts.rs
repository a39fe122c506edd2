//! Long-format fact table built from canonical wide rows.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::error::Result;
use crate::hours::Hour;
use crate::loader::{RawTable, TextEncoding};
use crate::schema::{CanonicalColumn, CanonicalSchema, Direction, normalize_headers};

/// One count for a station, line, hour bucket and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fact {
    pub station_name: String,
    pub line_name: String,
    pub hour: Hour,
    pub direction: Direction,
    pub count: u64,
}

/// Identity fields of a valid source row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIdentity {
    pub service_month: String,
    pub line_name: String,
    pub station_id: String,
    pub station_name: String,
}

/// The single source of truth every analysis reads from.
///
/// Facts are row-major: the fact for row `r` and column `c` sits at
/// `r * columns.len() + c`.
#[derive(Debug, Clone)]
pub struct FactTable {
    pub rows: Vec<RowIdentity>,
    pub columns: Vec<CanonicalColumn>,
    pub facts: Vec<Fact>,
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub columns_dropped: usize,
    pub encoding: TextEncoding,
    pub source_hash: String,
}

impl FactTable {
    /// Normalizes the raw header and builds the facts in one step.
    pub fn from_raw(raw: &RawTable) -> Result<Self> {
        let schema = normalize_headers(&raw.headers)?;
        Ok(build_facts(raw, &schema))
    }

    /// Facts belonging to the `row`-th valid row, in column order.
    pub fn row_facts(&self, row: usize) -> &[Fact] {
        let width = self.columns.len();
        &self.facts[row * width..(row + 1) * width]
    }

    pub fn station_names(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.station_name.as_str()).collect()
    }

    pub fn line_names(&self) -> BTreeSet<&str> {
        self.rows.iter().map(|r| r.line_name.as_str()).collect()
    }

    pub fn total(&self, direction: Direction) -> u64 {
        sum_counts(
            self.facts
                .iter()
                .filter(|f| f.direction == direction)
                .map(|f| f.count),
        )
    }
}

/// Largest cell value accepted as a count.
pub const MAX_COUNT: u64 = u32::MAX as u64;

/// Parses a raw count cell.
///
/// Thousands separators and whitespace are ignored. Anything that is not a
/// plain non-negative decimal up to [`MAX_COUNT`], including empty cells and
/// exponent notation, counts as zero. Fractional values are truncated.
pub fn parse_count(raw: &str) -> u64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.contains(['e', 'E']) {
        return 0;
    }

    let value = cleaned.parse::<u64>().ok().or_else(|| {
        cleaned
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && *v <= MAX_COUNT as f64)
            .map(|v| v.trunc() as u64)
    });
    match value {
        Some(value) if value <= MAX_COUNT => value,
        _ => 0,
    }
}

/// Sums counts without overflowing.
pub fn sum_counts(counts: impl IntoIterator<Item = u64>) -> u64 {
    counts.into_iter().fold(0, u64::saturating_add)
}

fn cell(record: &csv::StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Converts every valid raw row into one fact per canonical column.
///
/// Rows with an empty line or station cell are dropped. The output holds
/// exactly `valid rows × columns` facts.
#[tracing::instrument(skip_all, fields(records = raw.records.len(), columns = schema.columns.len()))]
pub fn build_facts(raw: &RawTable, schema: &CanonicalSchema) -> FactTable {
    let identity = &schema.identity;
    let columns = schema.canonical_columns();
    let mut rows = Vec::new();
    let mut facts = Vec::with_capacity(raw.records.len() * columns.len());
    let mut rows_dropped = 0;

    for (line_no, record) in raw.records.iter().enumerate() {
        let line_name = cell(record, Some(identity.line));
        let station_name = cell(record, Some(identity.station));
        if line_name.is_empty() || station_name.is_empty() {
            debug!(record = line_no + 1, "Row without line or station dropped");
            rows_dropped += 1;
            continue;
        }

        for (idx, column) in &schema.columns {
            facts.push(Fact {
                station_name: station_name.clone(),
                line_name: line_name.clone(),
                hour: column.hour,
                direction: column.direction,
                count: record.get(*idx).map(parse_count).unwrap_or(0),
            });
        }

        rows.push(RowIdentity {
            service_month: cell(record, identity.service_month),
            line_name,
            station_id: cell(record, identity.station_id),
            station_name,
        });
    }

    info!(
        rows = rows.len(),
        rows_dropped,
        facts = facts.len(),
        "Fact table built"
    );

    FactTable {
        rows,
        columns,
        facts,
        rows_read: raw.records.len(),
        rows_dropped,
        columns_dropped: schema.dropped.len(),
        encoding: raw.encoding,
        source_hash: raw.source_hash.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::StringRecord;

    fn raw_table(headers: &[&str], records: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            records: records.iter().map(|r| StringRecord::from(r.to_vec())).collect(),
            encoding: TextEncoding::Cp949,
            source_hash: "test".to_string(),
        }
    }

    #[test]
    fn test_parse_count_handles_noise() {
        assert_eq!(parse_count("1,234"), 1234);
        assert_eq!(parse_count(" 56 "), 56);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("N/A"), 0);
        assert_eq!(parse_count("-5"), 0);
        assert_eq!(parse_count("12.9"), 12);
        assert_eq!(parse_count("NaN"), 0);
    }

    #[test]
    fn test_parse_count_rejects_huge_values() {
        assert_eq!(parse_count("1e30"), 0);
        assert_eq!(parse_count("3E2"), 0);
        assert_eq!(parse_count("99,999,999,999,999,999,999"), 0);
        assert_eq!(parse_count("4294967296"), 0);
        assert_eq!(parse_count("4294967295"), MAX_COUNT);
        assert_eq!(parse_count("1234567.5"), 1_234_567);
    }

    #[test]
    fn test_sum_counts_saturates() {
        assert_eq!(sum_counts([1, 2, 3]), 6);
        assert_eq!(sum_counts([u64::MAX, 1]), u64::MAX);
    }

    #[test]
    fn test_noise_cell_does_not_break_aggregation() {
        use crate::analyzers::aggregate::{AggregateQuery, aggregate};

        let raw = raw_table(
            &["호선명", "지하철역", "04시 승차", "04시 하차"],
            &[&["2호선", "강남", "1e30", "5"], &["2호선", "강남", "18446744073709551615", "7"]],
        );
        let table = FactTable::from_raw(&raw).unwrap();

        let rows = aggregate(&table, &AggregateQuery::default());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].count, 12);
        assert_eq!(table.total(Direction::Boarding), 0);
    }

    #[test]
    fn test_build_facts_row_times_columns() {
        let raw = raw_table(
            &["사용월", "호선명", "역ID", "지하철역", "04시 승차", "04시 하차", "시간외", "작업일자"],
            &[
                &["202401", "2호선", "222", "강남", "100", "50", "x", "20240201"],
                &["202401", "", "999", "유령", "1", "1", "x", "20240201"],
                &["202401", "신분당선", "D7", "강남", "1,000", "", "x", "20240201"],
            ],
        );
        let schema = normalize_headers(&raw.headers).unwrap();
        let table = build_facts(&raw, &schema);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.facts.len(), 2 * 2);
        assert_eq!(table.rows_read, 3);
        assert_eq!(table.rows_dropped, 1);
        assert_eq!(table.columns_dropped, 2);

        let second = table.row_facts(1);
        assert_eq!(second[0].line_name, "신분당선");
        assert_eq!(second[0].count, 1000);
        assert_eq!(second[1].count, 0);
        assert_eq!(table.total(Direction::Boarding), 1100);
    }

    #[test]
    fn test_short_record_counts_as_zero() {
        let raw = raw_table(
            &["호선명", "지하철역", "04시 승차", "04시 하차"],
            &[&["1호선", "서울역", "7"]],
        );
        let schema = normalize_headers(&raw.headers).unwrap();
        let table = build_facts(&raw, &schema);

        assert_eq!(table.facts.len(), 2);
        assert_eq!(table.facts[1].count, 0);
        assert_eq!(table.rows[0].service_month, "");
    }

    #[test]
    fn test_station_and_line_names_are_sorted_sets() {
        let raw = raw_table(
            &["호선명", "지하철역", "04시 승차"],
            &[&["2호선", "홍대입구", "1"], &["2호선", "강남", "1"], &["신분당선", "강남", "1"]],
        );
        let schema = normalize_headers(&raw.headers).unwrap();
        let table = build_facts(&raw, &schema);

        assert_eq!(table.station_names().into_iter().collect::<Vec<_>>(), vec!["강남", "홍대입구"]);
        assert_eq!(table.line_names().len(), 2);
    }
}
