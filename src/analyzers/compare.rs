use std::collections::HashMap;

use crate::analyzers::types::ComparisonRow;
use crate::error::{PipelineError, Result};
use crate::facts::FactTable;
use crate::hours::{HOUR_ORDER, Hour};
use crate::schema::Direction;
use crate::station::StationKey;

fn hourly_counts(table: &FactTable, key: &StationKey) -> Result<HashMap<(Hour, Direction), u64>> {
    let mut counts: HashMap<(Hour, Direction), u64> = HashMap::new();
    let mut seen = false;

    for fact in &table.facts {
        let fact_key = StationKey::for_mode(&fact.line_name, &fact.station_name, key.is_combined());
        if fact_key != *key {
            continue;
        }
        seen = true;
        let count = counts.entry((fact.hour, fact.direction)).or_default();
        *count = count.saturating_add(fact.count);
    }

    if !seen {
        return Err(PipelineError::UnknownStation(key.to_string()));
    }
    Ok(counts)
}

/// Boarding and alighting per service hour for two keys, side by side.
///
/// Each hour present in the table yields one row for `first` followed by one
/// row for `second`. The keys may use different identity modes.
pub fn compare_stations(
    table: &FactTable,
    first: &StationKey,
    second: &StationKey,
) -> Result<Vec<ComparisonRow>> {
    let first_counts = hourly_counts(table, first)?;
    let second_counts = hourly_counts(table, second)?;

    let mut rows = Vec::new();
    for hour in HOUR_ORDER
        .iter()
        .copied()
        .filter(|h| table.columns.iter().any(|c| c.hour == *h))
    {
        for (key, counts) in [(first, &first_counts), (second, &second_counts)] {
            let get = |direction| counts.get(&(hour, direction)).copied().unwrap_or(0);
            rows.push(ComparisonRow {
                hour,
                station: key.clone(),
                boarding: get(Direction::Boarding),
                alighting: get(Direction::Alighting),
            });
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::test_support::{hour, table};

    fn pair_table() -> FactTable {
        table(
            &["04시 승차", "04시 하차", "00시 승차", "00시 하차"],
            &[
                ("2호선", "강남", &[1, 2, 3, 4]),
                ("신분당선", "강남", &[10, 20, 30, 40]),
                ("2호선", "홍대입구", &[5, 6, 7, 8]),
            ],
        )
    }

    #[test]
    fn test_compare_individual_stations() {
        let rows = compare_stations(
            &pair_table(),
            &StationKey::for_mode("2호선", "강남", false),
            &StationKey::for_mode("2호선", "홍대입구", false),
        )
        .unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].hour, hour(4));
        assert_eq!((rows[0].boarding, rows[0].alighting), (1, 2));
        assert_eq!(rows[1].station.station(), "홍대입구");
        assert_eq!(rows[3].hour, hour(0));
        assert_eq!((rows[3].boarding, rows[3].alighting), (7, 8));
    }

    #[test]
    fn test_compare_combined_station() {
        let rows = compare_stations(
            &pair_table(),
            &StationKey::for_mode("", "강남", true),
            &StationKey::for_mode("", "홍대입구", true),
        )
        .unwrap();
        assert_eq!((rows[0].boarding, rows[0].alighting), (11, 22));
        assert_eq!((rows[2].boarding, rows[2].alighting), (33, 44));
    }

    #[test]
    fn test_compare_unknown_station() {
        let err = compare_stations(
            &pair_table(),
            &StationKey::for_mode("2호선", "강남", false),
            &StationKey::for_mode("9호선", "강남", false),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownStation(_)));
    }
}
