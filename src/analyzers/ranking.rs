//! Hourly champions and the cumulative leaderboard over the service day.

use std::collections::{BTreeMap, HashMap};

use crate::analyzers::aggregate::{AggregateQuery, AggregateRow, GroupBy, aggregate};
use crate::analyzers::types::{Champion, CumulativeRow, DirectionFilter, LineContribution};
use crate::analyzers::utility::ensure_top_n;
use crate::error::Result;
use crate::facts::FactTable;
use crate::hours::{HOUR_ORDER, Hour};
use crate::schema::Direction;
use crate::station::StationKey;

/// Picks the busiest key per hour and direction from rows grouped by both.
///
/// Rows may come in any order. The highest count wins; equal counts go to
/// the smaller key. Hours outside the service-day order are ignored.
pub fn champions_from(rows: &[AggregateRow]) -> Vec<Champion> {
    let mut best: HashMap<(Hour, Direction), &AggregateRow> = HashMap::new();
    for row in rows {
        if let (Some(hour), Some(direction)) = (row.hour, row.direction) {
            best.entry((hour, direction))
                .and_modify(|current| {
                    if beats(row, current) {
                        *current = row;
                    }
                })
                .or_insert(row);
        }
    }

    HOUR_ORDER
        .iter()
        .flat_map(|hour| Direction::ALL.map(|direction| (*hour, direction)))
        .filter_map(|slot| {
            best.get(&slot).map(|row| Champion {
                hour: slot.0,
                direction: slot.1,
                station: row.station.clone(),
                count: row.count,
            })
        })
        .collect()
}

fn beats(candidate: &AggregateRow, current: &AggregateRow) -> bool {
    candidate.count > current.count
        || (candidate.count == current.count && candidate.station < current.station)
}

/// The champion of every hour in the service day, per direction.
pub fn champion_per_hour(table: &FactTable, combine: bool) -> Vec<Champion> {
    let query = AggregateQuery {
        combine,
        group_by: GroupBy {
            hour: true,
            direction: true,
        },
        ..Default::default()
    };
    champions_from(&aggregate(table, &query))
}

/// Splits each champion's count into the lines serving it.
pub fn line_breakdown(table: &FactTable, champions: &[Champion]) -> Vec<LineContribution> {
    let mut contributions = Vec::new();

    for champion in champions {
        let mut by_line: BTreeMap<&str, u64> = BTreeMap::new();
        for fact in table.facts.iter().filter(|f| {
            f.hour == champion.hour
                && f.direction == champion.direction
                && f.station_name == champion.station.station()
                && champion.station.line().is_none_or(|line| f.line_name == line)
        }) {
            let count = by_line.entry(fact.line_name.as_str()).or_default();
            *count = count.saturating_add(fact.count);
        }

        contributions.extend(by_line.into_iter().map(|(line, count)| LineContribution {
            hour: champion.hour,
            direction: champion.direction,
            station: champion.station.station().to_string(),
            line: line.to_string(),
            count,
        }));
    }

    contributions
}

/// Dense per-key hourly and running counts over the service day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeSeries {
    /// Service-day hours present in the table, in order.
    pub hours: Vec<Hour>,
    /// For each key, `(count, cumulative)` aligned with `hours`.
    pub series: BTreeMap<StationKey, Vec<(u64, u64)>>,
}

/// Running totals per key across the service-day order.
pub fn cumulative_series(
    table: &FactTable,
    combine: bool,
    filter: DirectionFilter,
) -> CumulativeSeries {
    let hours: Vec<Hour> = HOUR_ORDER
        .iter()
        .copied()
        .filter(|h| table.columns.iter().any(|c| c.hour == *h))
        .collect();
    let slot: HashMap<Hour, usize> = hours.iter().enumerate().map(|(i, h)| (*h, i)).collect();

    let mut counts: BTreeMap<StationKey, Vec<u64>> = table
        .rows
        .iter()
        .map(|r| {
            (
                StationKey::for_mode(&r.line_name, &r.station_name, combine),
                vec![0; hours.len()],
            )
        })
        .collect();

    for fact in table.facts.iter().filter(|f| filter.accepts(f.direction)) {
        let Some(&idx) = slot.get(&fact.hour) else {
            continue;
        };
        let key = StationKey::for_mode(&fact.line_name, &fact.station_name, combine);
        if let Some(per_hour) = counts.get_mut(&key) {
            per_hour[idx] = per_hour[idx].saturating_add(fact.count);
        }
    }

    let series = counts
        .into_iter()
        .map(|(key, per_hour)| {
            let running = per_hour
                .iter()
                .scan(0u64, |acc, &count| {
                    *acc = acc.saturating_add(count);
                    Some((count, *acc))
                })
                .collect();
            (key, running)
        })
        .collect();

    CumulativeSeries { hours, series }
}

/// For each hour in order, the `top_n` keys by cumulative count.
///
/// Only qualifying rows are returned; a key outside the top at some hour has
/// no row for it. Equal cumulative counts are ordered by key.
pub fn cumulative_top_n(series: &CumulativeSeries, top_n: usize) -> Result<Vec<CumulativeRow>> {
    ensure_top_n(top_n)?;
    let mut rows = Vec::new();

    for (idx, hour) in series.hours.iter().enumerate() {
        let mut standing: Vec<(&StationKey, (u64, u64))> = series
            .series
            .iter()
            .map(|(key, values)| (key, values[idx]))
            .collect();
        standing.sort_by(|a, b| b.1.1.cmp(&a.1.1).then_with(|| a.0.cmp(b.0)));

        rows.extend(standing.into_iter().take(top_n).enumerate().map(
            |(pos, (key, (count, cumulative)))| CumulativeRow {
                hour: *hour,
                rank: pos + 1,
                station: key.clone(),
                count,
                cumulative,
            },
        ));
    }

    Ok(rows)
}

/// Convenience wrapper: builds the dense series and keeps the top keys.
pub fn cumulative_race(
    table: &FactTable,
    combine: bool,
    filter: DirectionFilter,
    top_n: usize,
) -> Result<Vec<CumulativeRow>> {
    ensure_top_n(top_n)?;
    cumulative_top_n(&cumulative_series(table, combine, filter), top_n)
}
