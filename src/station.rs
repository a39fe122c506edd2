//! Station identity in either individual or combined mode.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Who a count belongs to.
///
/// `Individual` keeps the line, so a transfer station served by two lines is
/// two keys. `Combined` merges every line sharing a station name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StationKey {
    Individual { line: String, station: String },
    Combined { station: String },
}

impl StationKey {
    /// Builds the key for a fact's identity under the requested mode.
    pub fn for_mode(line: &str, station: &str, combine: bool) -> Self {
        if combine {
            StationKey::Combined {
                station: station.to_string(),
            }
        } else {
            StationKey::Individual {
                line: line.to_string(),
                station: station.to_string(),
            }
        }
    }

    pub fn station(&self) -> &str {
        match self {
            StationKey::Individual { station, .. } | StationKey::Combined { station } => station,
        }
    }

    pub fn line(&self) -> Option<&str> {
        match self {
            StationKey::Individual { line, .. } => Some(line),
            StationKey::Combined { .. } => None,
        }
    }

    pub fn is_combined(&self) -> bool {
        matches!(self, StationKey::Combined { .. })
    }
}

// Station name first, then line, so individual keys sort like their
// `station(line)` labels. A combined key sorts before any individual key of
// the same name.
impl Ord for StationKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.station()
            .cmp(other.station())
            .then_with(|| self.line().cmp(&other.line()))
    }
}

impl PartialOrd for StationKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for StationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationKey::Individual { line, station } => write!(f, "{station}({line})"),
            StationKey::Combined { station } => write!(f, "{station}"),
        }
    }
}

impl Serialize for StationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_labels() {
        let individual = StationKey::for_mode("2호선", "강남", false);
        let combined = StationKey::for_mode("2호선", "강남", true);
        assert_eq!(individual.to_string(), "강남(2호선)");
        assert_eq!(combined.to_string(), "강남");
        assert!(combined.is_combined());
        assert_eq!(individual.line(), Some("2호선"));
    }

    #[test]
    fn test_ordering_by_station_then_line() {
        let mut keys = vec![
            StationKey::for_mode("신분당선", "강남", false),
            StationKey::for_mode("1호선", "서울역", false),
            StationKey::for_mode("2호선", "강남", false),
        ];
        keys.sort();
        let labels: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        assert_eq!(labels, vec!["강남(2호선)", "강남(신분당선)", "서울역(1호선)"]);
    }

    #[test]
    fn test_individual_order_matches_label_order() {
        let mut keys = vec![
            StationKey::for_mode("2호선", "홍대입구", false),
            StationKey::for_mode("1호선", "서울역", false),
            StationKey::for_mode("4호선", "서울역", false),
            StationKey::for_mode("신분당선", "강남", false),
        ];
        let mut labels: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
        keys.sort();
        labels.sort();
        assert_eq!(keys.iter().map(|k| k.to_string()).collect::<Vec<_>>(), labels);
    }

    #[test]
    fn test_equality_is_mode_sensitive() {
        assert_ne!(
            StationKey::for_mode("2호선", "강남", true),
            StationKey::for_mode("2호선", "강남", false)
        );
        assert_eq!(
            StationKey::for_mode("2호선", "강남", true),
            StationKey::for_mode("신분당선", "강남", true)
        );
    }
}
