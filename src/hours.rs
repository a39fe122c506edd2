//! Hour buckets and the service-day ordering.
//!
//! The service day starts at 04:00 and wraps past midnight to the 01:00
//! bucket. Every ordered computation walks [`HOUR_ORDER`], never the numeric
//! or lexicographic order of the labels.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{PipelineError, Result};

/// One hour-long bucket, `0..=23`. Displays as a two-digit label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hour(u8);

impl Hour {
    pub fn new(value: u8) -> Option<Self> {
        (value <= 23).then_some(Hour(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> String {
        format!("{:02}", self.0)
    }
}

impl fmt::Display for Hour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for Hour {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.len() > 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("'{s}' is not a 1-2 digit hour"));
        }
        let value: u8 = s.parse().map_err(|_| format!("'{s}' is not an hour"))?;
        Hour::new(value).ok_or_else(|| format!("hour {value} is outside 0..=23"))
    }
}

impl Serialize for Hour {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

/// Canonical service-day ordering: 04, 05, ..., 23, 00, 01.
pub const HOUR_ORDER: [Hour; 22] = [
    Hour(4),
    Hour(5),
    Hour(6),
    Hour(7),
    Hour(8),
    Hour(9),
    Hour(10),
    Hour(11),
    Hour(12),
    Hour(13),
    Hour(14),
    Hour(15),
    Hour(16),
    Hour(17),
    Hour(18),
    Hour(19),
    Hour(20),
    Hour(21),
    Hour(22),
    Hour(23),
    Hour(0),
    Hour(1),
];

/// Position of `hour` in [`HOUR_ORDER`], or `None` for the 02/03 buckets.
pub fn position(hour: Hour) -> Option<usize> {
    HOUR_ORDER.iter().position(|h| *h == hour)
}

/// Sort key that follows [`HOUR_ORDER`] and places off-order buckets after it.
pub fn sort_key(hour: Hour) -> usize {
    position(hour).unwrap_or(HOUR_ORDER.len() + hour.0 as usize)
}

/// A contiguous, possibly wrapping, range of [`HOUR_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HourWindow {
    start: usize,
    end: usize,
}

impl HourWindow {
    /// Both ends must be buckets of [`HOUR_ORDER`]. `start == end` selects a
    /// single hour; `start` after `end` wraps around the end of the order.
    pub fn new(start: Hour, end: Hour) -> Result<Self> {
        let start_pos = position(start).ok_or_else(|| {
            PipelineError::InvalidParameter(format!("window start {start} is not a service hour"))
        })?;
        let end_pos = position(end).ok_or_else(|| {
            PipelineError::InvalidParameter(format!("window end {end} is not a service hour"))
        })?;
        Ok(Self {
            start: start_pos,
            end: end_pos,
        })
    }

    /// The full service day, 04 through 01.
    pub fn full_day() -> Self {
        Self {
            start: 0,
            end: HOUR_ORDER.len() - 1,
        }
    }

    pub fn start(&self) -> Hour {
        HOUR_ORDER[self.start]
    }

    pub fn end(&self) -> Hour {
        HOUR_ORDER[self.end]
    }

    /// Hours in the window, walking the order circularly from start to end.
    pub fn hours(&self) -> Vec<Hour> {
        let len = HOUR_ORDER.len();
        let span = (self.end + len - self.start) % len + 1;
        (0..span)
            .map(|offset| HOUR_ORDER[(self.start + offset) % len])
            .collect()
    }

    pub fn contains(&self, hour: Hour) -> bool {
        let Some(pos) = position(hour) else {
            return false;
        };
        if self.start <= self.end {
            (self.start..=self.end).contains(&pos)
        } else {
            pos >= self.start || pos <= self.end
        }
    }
}

impl fmt::Display for HourWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start(), self.end())
    }
}
