//! Small fact tables for analyzer tests.

use csv::StringRecord;

use crate::facts::{FactTable, build_facts};
use crate::hours::Hour;
use crate::loader::{RawTable, TextEncoding};
use crate::schema::normalize_headers;

pub fn hour(value: u8) -> Hour {
    Hour::new(value).unwrap()
}

/// Builds a fact table from hourly headers and `(line, station, counts)` rows.
pub fn table(hourly_headers: &[&str], rows: &[(&str, &str, &[u64])]) -> FactTable {
    let mut headers = vec!["호선명".to_string(), "지하철역".to_string()];
    headers.extend(hourly_headers.iter().map(|h| h.to_string()));

    let records = rows
        .iter()
        .map(|(line, station, counts)| {
            let mut fields = vec![line.to_string(), station.to_string()];
            fields.extend(counts.iter().map(u64::to_string));
            StringRecord::from(fields)
        })
        .collect();

    let raw = RawTable {
        headers,
        records,
        encoding: TextEncoding::Cp949,
        source_hash: "fixture".to_string(),
    };
    let schema = normalize_headers(&raw.headers).unwrap();
    build_facts(&raw, &schema)
}
