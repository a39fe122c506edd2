use std::collections::{BTreeSet, HashMap};

use crate::analyzers::types::{CongestionReport, DirectionFilter, DirectionalTotals, RankedStation};
use crate::analyzers::utility::{ensure_top_n, rank};
use crate::error::Result;
use crate::facts::{Fact, FactTable};
use crate::hours::{self, Hour, HourWindow};
use crate::schema::Direction;
use crate::station::StationKey;

/// Extra dimensions to keep apart when summing, besides the station key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GroupBy {
    pub hour: bool,
    pub direction: bool,
}

/// Parameters of a single aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AggregateQuery {
    /// `None` reads every hour bucket present in the table.
    pub window: Option<HourWindow>,
    pub direction: DirectionFilter,
    pub combine: bool,
    /// Restrict to one line before grouping.
    pub line: Option<String>,
    pub group_by: GroupBy,
}

/// A summed count for a key and any requested extra dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRow {
    pub station: StationKey,
    pub hour: Option<Hour>,
    pub direction: Option<Direction>,
    pub count: u64,
}

impl AggregateQuery {
    fn matches(&self, fact: &Fact) -> bool {
        self.direction.accepts(fact.direction)
            && self.window.is_none_or(|w| w.contains(fact.hour))
            && self.line.as_deref().is_none_or(|line| fact.line_name == line)
    }
}

/// Sums fact counts by station key and the dimensions in `query.group_by`.
///
/// Rows come back by descending count; equal counts are ordered by key, then
/// by hour in service-day order, then by direction. No matching fact yields
/// an empty vector.
pub fn aggregate(table: &FactTable, query: &AggregateQuery) -> Vec<AggregateRow> {
    let mut sums: HashMap<(StationKey, Option<Hour>, Option<Direction>), u64> = HashMap::new();

    for fact in table.facts.iter().filter(|f| query.matches(f)) {
        let key = StationKey::for_mode(&fact.line_name, &fact.station_name, query.combine);
        let hour = query.group_by.hour.then_some(fact.hour);
        let direction = query.group_by.direction.then_some(fact.direction);
        let sum = sums.entry((key, hour, direction)).or_default();
        *sum = sum.saturating_add(fact.count);
    }

    let mut rows: Vec<AggregateRow> = sums
        .into_iter()
        .map(|((station, hour, direction), count)| AggregateRow {
            station,
            hour,
            direction,
            count,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.station.cmp(&b.station))
            .then_with(|| a.hour.map(hours::sort_key).cmp(&b.hour.map(hours::sort_key)))
            .then_with(|| a.direction.cmp(&b.direction))
    });
    rows
}

/// Boarding and alighting totals per key inside `window`, busiest first.
pub fn station_totals(
    table: &FactTable,
    window: Option<HourWindow>,
    combine: bool,
) -> Vec<DirectionalTotals> {
    let query = AggregateQuery {
        window,
        combine,
        group_by: GroupBy {
            hour: false,
            direction: true,
        },
        ..Default::default()
    };

    let mut totals: HashMap<StationKey, DirectionalTotals> = HashMap::new();
    for row in aggregate(table, &query) {
        let entry = totals
            .entry(row.station.clone())
            .or_insert_with(|| DirectionalTotals {
                station: row.station.clone(),
                boarding: 0,
                alighting: 0,
            });
        match row.direction {
            Some(Direction::Boarding) => {
                entry.boarding = entry.boarding.saturating_add(row.count);
            }
            Some(Direction::Alighting) => {
                entry.alighting = entry.alighting.saturating_add(row.count);
            }
            None => {}
        }
    }

    let mut totals: Vec<DirectionalTotals> = totals.into_values().collect();
    totals.sort_by(|a, b| b.total().cmp(&a.total()).then_with(|| a.station.cmp(&b.station)));
    totals
}

/// The `top_n` busiest keys per direction inside `window`.
pub fn congestion_ranking(
    table: &FactTable,
    window: HourWindow,
    combine: bool,
    top_n: usize,
) -> Result<CongestionReport> {
    ensure_top_n(top_n)?;

    let ranked = |direction: Direction| {
        let query = AggregateQuery {
            window: Some(window),
            direction: DirectionFilter::Only(direction),
            combine,
            ..Default::default()
        };
        rank(aggregate(table, &query).into_iter().take(top_n).map(|r| (r.station, r.count)))
    };

    Ok(CongestionReport {
        window: window.to_string(),
        boarding: ranked(Direction::Boarding),
        alighting: ranked(Direction::Alighting),
    })
}

/// Full-day boarding plus alighting totals, optionally for a single line.
pub fn traffic_ranking(
    table: &FactTable,
    combine: bool,
    line: Option<&str>,
    top_n: usize,
) -> Result<Vec<RankedStation>> {
    ensure_top_n(top_n)?;

    let query = AggregateQuery {
        combine,
        line: line.map(str::to_string),
        ..Default::default()
    };
    Ok(rank(
        aggregate(table, &query)
            .into_iter()
            .take(top_n)
            .map(|r| (r.station, r.count)),
    ))
}

/// Every key present in the table, sorted.
pub fn stations(table: &FactTable, combine: bool) -> Vec<StationKey> {
    table
        .rows
        .iter()
        .map(|r| StationKey::for_mode(&r.line_name, &r.station_name, combine))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
