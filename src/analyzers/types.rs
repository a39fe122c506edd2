//! Parameter and result types shared by the analyzers.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::hours::Hour;
use crate::schema::Direction;
use crate::station::StationKey;

/// Which directions a query reads. `Both` sums boarding and alighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DirectionFilter {
    #[default]
    Both,
    Only(Direction),
}

impl DirectionFilter {
    pub fn accepts(self, direction: Direction) -> bool {
        match self {
            DirectionFilter::Both => true,
            DirectionFilter::Only(only) => only == direction,
        }
    }

    pub fn directions(self) -> Vec<Direction> {
        match self {
            DirectionFilter::Both => Direction::ALL.to_vec(),
            DirectionFilter::Only(only) => vec![only],
        }
    }
}

impl fmt::Display for DirectionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionFilter::Both => f.write_str("종합"),
            DirectionFilter::Only(direction) => write!(f, "{direction}"),
        }
    }
}

impl FromStr for DirectionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "종합" | "총합" | "both" | "total" => Ok(DirectionFilter::Both),
            other => other
                .parse::<Direction>()
                .map(DirectionFilter::Only)
                .map_err(|_| format!("unknown analysis type '{other}'")),
        }
    }
}

/// A key and its summed count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedStation {
    pub rank: usize,
    pub station: StationKey,
    pub count: u64,
}

/// Boarding and alighting totals for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectionalTotals {
    pub station: StationKey,
    pub boarding: u64,
    pub alighting: u64,
}

impl DirectionalTotals {
    pub fn total(&self) -> u64 {
        self.boarding.saturating_add(self.alighting)
    }
}

/// Top stations per direction inside an hour window.
#[derive(Debug, Clone, Serialize)]
pub struct CongestionReport {
    pub window: String,
    pub boarding: Vec<RankedStation>,
    pub alighting: Vec<RankedStation>,
}

/// A station whose hourly pattern resembles the reference station's.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarStation {
    pub rank: usize,
    pub station: StationKey,
    pub score: f64,
}

/// The busiest key for one hour and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Champion {
    pub hour: Hour,
    pub direction: Direction,
    pub station: StationKey,
    pub count: u64,
}

/// How much of a combined champion's count one line contributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineContribution {
    pub hour: Hour,
    pub direction: Direction,
    pub station: String,
    pub line: String,
    pub count: u64,
}

/// One hour of a two-station comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonRow {
    pub hour: Hour,
    pub station: StationKey,
    pub boarding: u64,
    pub alighting: u64,
}

/// A key's position in the cumulative leaderboard at one hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CumulativeRow {
    pub hour: Hour,
    pub rank: usize,
    pub station: StationKey,
    pub count: u64,
    pub cumulative: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_filter_parsing() {
        assert_eq!("종합".parse::<DirectionFilter>().unwrap(), DirectionFilter::Both);
        assert_eq!("총합".parse::<DirectionFilter>().unwrap(), DirectionFilter::Both);
        assert_eq!(
            "하차".parse::<DirectionFilter>().unwrap(),
            DirectionFilter::Only(Direction::Alighting)
        );
        assert!("sideways".parse::<DirectionFilter>().is_err());
    }

    #[test]
    fn test_direction_filter_accepts() {
        assert!(DirectionFilter::Both.accepts(Direction::Boarding));
        assert!(!DirectionFilter::Only(Direction::Boarding).accepts(Direction::Alighting));
        assert_eq!(DirectionFilter::Only(Direction::Alighting).directions().len(), 1);
    }
}
