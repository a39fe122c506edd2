//! Maps loosely formatted wide headers onto the canonical schema.
//!
//! Identity headers are recognised by name. Every other header is offered to
//! an ordered list of [`HeaderMatcher`]s; the first one that finds an hour
//! decides it. Headers nobody recognises are dropped, never fatal.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::hours::Hour;

pub const SERVICE_MONTH: &str = "사용월";
pub const LINE_NAME: &str = "호선명";
pub const STATION_ID: &str = "역ID";
pub const STATION_NAME: &str = "지하철역";

/// Ridership direction, identified by a marker substring in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Direction {
    #[serde(rename = "승차")]
    Boarding,
    #[serde(rename = "하차")]
    Alighting,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Boarding, Direction::Alighting];

    pub fn marker(self) -> &'static str {
        match self {
            Direction::Boarding => "승차",
            Direction::Alighting => "하차",
        }
    }

    /// Boarding wins when a header carries both markers.
    pub fn from_header(header: &str) -> Option<Self> {
        Direction::ALL
            .into_iter()
            .find(|direction| header.contains(direction.marker()))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "승차" | "boarding" => Ok(Direction::Boarding),
            "하차" | "alighting" => Ok(Direction::Alighting),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

/// One hourly count column of the canonical wide schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CanonicalColumn {
    pub hour: Hour,
    pub direction: Direction,
}

impl CanonicalColumn {
    /// Canonical header text, e.g. `04_승차`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.hour, self.direction.marker())
    }
}

static HOUR_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})[:시]").expect("static regex"));
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(\d{1,2})\D").expect("static regex"));

/// Strategies for finding the hour embedded in a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMatcher {
    /// `04:00~05:00`, `04시-05시`: digits directly before `:` or `시`.
    HourMarker,
    /// `04 ~ 05 승차`: digits at the start or after whitespace.
    LeadingNumber,
}

impl HeaderMatcher {
    pub const ORDERED: [HeaderMatcher; 2] = [HeaderMatcher::HourMarker, HeaderMatcher::LeadingNumber];

    fn regex(self) -> &'static Regex {
        match self {
            HeaderMatcher::HourMarker => &HOUR_MARKER,
            HeaderMatcher::LeadingNumber => &LEADING_NUMBER,
        }
    }

    /// The raw number this matcher finds, before any range check.
    pub fn capture(self, header: &str) -> Option<u32> {
        self.regex()
            .captures(header)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// Parses one non-identity header into a [`CanonicalColumn`].
///
/// The first matcher that captures a number decides the hour; an out-of-range
/// number drops the header rather than falling through to the next matcher.
pub fn parse_header(header: &str) -> Option<CanonicalColumn> {
    let direction = Direction::from_header(header)?;
    let raw = HeaderMatcher::ORDERED
        .into_iter()
        .find_map(|matcher| matcher.capture(header))?;
    let hour = u8::try_from(raw).ok().and_then(Hour::new)?;
    Some(CanonicalColumn { hour, direction })
}

/// Positions of the identity columns in the source header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityIndex {
    pub service_month: Option<usize>,
    pub line: usize,
    pub station_id: Option<usize>,
    pub station: usize,
}

/// Result of header normalization.
#[derive(Debug, Clone)]
pub struct CanonicalSchema {
    pub identity: IdentityIndex,
    /// Source position and canonical meaning of every kept hourly column,
    /// in source order.
    pub columns: Vec<(usize, CanonicalColumn)>,
    /// Original text of every dropped header.
    pub dropped: Vec<String>,
}

impl CanonicalSchema {
    pub fn canonical_columns(&self) -> Vec<CanonicalColumn> {
        self.columns.iter().map(|(_, column)| *column).collect()
    }
}

fn clean_header(raw: &str) -> &str {
    raw.trim().trim_start_matches('\u{feff}').trim()
}

/// Builds the canonical schema from raw header text.
///
/// # Errors
///
/// [`PipelineError::Schema`] when the line or station identity header is
/// missing, or when no hourly boarding/alighting column survives.
#[tracing::instrument(skip(headers), fields(headers = headers.len()))]
pub fn normalize_headers(headers: &[String]) -> Result<CanonicalSchema> {
    let mut service_month = None;
    let mut line = None;
    let mut station_id = None;
    let mut station = None;
    let mut columns = Vec::new();
    let mut seen = HashSet::new();
    let mut dropped = Vec::new();

    for (idx, raw) in headers.iter().enumerate() {
        let header = clean_header(raw);

        let identity_slot = match header {
            SERVICE_MONTH => Some(&mut service_month),
            LINE_NAME => Some(&mut line),
            STATION_ID => Some(&mut station_id),
            STATION_NAME => Some(&mut station),
            _ => None,
        };
        if let Some(slot) = identity_slot {
            if slot.is_none() {
                *slot = Some(idx);
            } else {
                warn!(header, idx, "Duplicate identity header ignored");
                dropped.push(raw.clone());
            }
            continue;
        }

        match parse_header(header) {
            Some(column) if seen.insert(column) => columns.push((idx, column)),
            Some(column) => {
                warn!(header, canonical = %column.label(), "Duplicate hourly column dropped");
                dropped.push(raw.clone());
            }
            None => {
                debug!(header, "Header dropped");
                dropped.push(raw.clone());
            }
        }
    }

    let missing: Vec<&str> = [(LINE_NAME, line), (STATION_NAME, station)]
        .into_iter()
        .filter(|(_, idx)| idx.is_none())
        .map(|(name, _)| name)
        .collect();
    let (Some(line), Some(station)) = (line, station) else {
        return Err(PipelineError::Schema(format!(
            "required identity column(s) missing: {}",
            missing.join(", ")
        )));
    };

    if columns.is_empty() {
        return Err(PipelineError::Schema(format!(
            "no hourly boarding/alighting columns found among {} headers",
            headers.len()
        )));
    }

    info!(
        kept = columns.len(),
        dropped = dropped.len(),
        "Headers normalized"
    );

    Ok(CanonicalSchema {
        identity: IdentityIndex {
            service_month,
            line,
            station_id,
            station,
        },
        columns,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn column(hour: u8, direction: Direction) -> CanonicalColumn {
        CanonicalColumn {
            hour: Hour::new(hour).unwrap(),
            direction,
        }
    }

    #[test]
    fn test_parse_header_formats() {
        assert_eq!(
            parse_header("04:00~05:00 승차"),
            Some(column(4, Direction::Boarding))
        );
        assert_eq!(
            parse_header("18시-19시 하차인원"),
            Some(column(18, Direction::Alighting))
        );
        assert_eq!(parse_header("7시 승차"), Some(column(7, Direction::Boarding)));
        assert_eq!(
            parse_header("23 ~ 24 하차"),
            Some(column(23, Direction::Alighting))
        );
    }

    #[test]
    fn test_parse_header_rejects_unrecognised() {
        assert_eq!(parse_header("시간외"), None);
        assert_eq!(parse_header("작업일자"), None);
        assert_eq!(parse_header("04:00~05:00"), None);
        assert_eq!(parse_header("25시 승차"), None);
    }

    #[test]
    fn test_normalize_keeps_valid_and_drops_malformed() {
        let schema = normalize_headers(&headers(&[
            "사용월",
            "호선명",
            "역ID",
            "지하철역",
            "04:00~05:00 승차",
            "시간외",
            "04:00~05:00 하차",
            "작업일자",
        ]))
        .unwrap();

        assert_eq!(
            schema.canonical_columns(),
            vec![column(4, Direction::Boarding), column(4, Direction::Alighting)]
        );
        assert_eq!(schema.columns[1].0, 6);
        assert_eq!(schema.dropped, vec!["시간외", "작업일자"]);
        assert_eq!(schema.identity.station, 3);
        assert_eq!(schema.identity.service_month, Some(0));
    }

    #[test]
    fn test_normalize_trims_headers() {
        let schema = normalize_headers(&headers(&[
            "\u{feff}사용월",
            " 호선명 ",
            "지하철역",
            "05시-06시 승차",
        ]))
        .unwrap();
        assert_eq!(schema.identity.service_month, Some(0));
        assert_eq!(schema.identity.line, 1);
        assert_eq!(schema.identity.station_id, None);
    }

    #[test]
    fn test_normalize_drops_duplicate_canonical_column() {
        let schema = normalize_headers(&headers(&[
            "호선명",
            "지하철역",
            "04시 승차",
            "04:00 승차",
        ]))
        .unwrap();
        assert_eq!(schema.columns.len(), 1);
        assert_eq!(schema.columns[0].0, 2);
        assert_eq!(schema.dropped, vec!["04:00 승차"]);
    }

    #[test]
    fn test_missing_identity_is_schema_error() {
        let err = normalize_headers(&headers(&["사용월", "호선명", "04시 승차"])).unwrap_err();
        match err {
            PipelineError::Schema(msg) => assert!(msg.contains(STATION_NAME)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_no_hourly_columns_is_schema_error() {
        let err = normalize_headers(&headers(&["호선명", "지하철역", "시간외", "작업일자"]))
            .unwrap_err();
        match err {
            PipelineError::Schema(msg) => assert!(msg.contains("no hourly")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("승차".parse::<Direction>().unwrap(), Direction::Boarding);
        assert_eq!("alighting".parse::<Direction>().unwrap(), Direction::Alighting);
        assert!("총합".parse::<Direction>().is_err());
    }
}
