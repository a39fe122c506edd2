//! Hourly pattern profiles and nearest-neighbour search between stations.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::analyzers::types::{DirectionFilter, SimilarStation};
use crate::analyzers::utility::{cosine, ensure_top_n};
use crate::error::{PipelineError, Result};
use crate::facts::{FactTable, sum_counts};
use crate::hours;
use crate::schema::CanonicalColumn;
use crate::station::StationKey;

/// How raw counts become a profile in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Normalization {
    /// Each value divided by the station's own total.
    #[default]
    ShareOfTotal,
    /// Each value scaled between the station's own minimum and maximum.
    RowMinMax,
}

impl FromStr for Normalization {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "share" | "share-of-total" => Ok(Normalization::ShareOfTotal),
            "minmax" | "row-minmax" => Ok(Normalization::RowMinMax),
            other => Err(format!("unknown normalization '{other}'")),
        }
    }
}

/// A station's normalized counts, one value per dimension of its [`ProfileSet`].
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyProfile {
    pub values: Vec<f64>,
    pub total: u64,
}

/// Profiles for every key, all sharing the same dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSet {
    pub dimensions: Vec<CanonicalColumn>,
    pub profiles: BTreeMap<StationKey, HourlyProfile>,
}

impl ProfileSet {
    pub fn get(&self, key: &StationKey) -> Option<&HourlyProfile> {
        self.profiles.get(key)
    }

    /// Cosine similarity between two keys' profiles.
    pub fn similarity(&self, a: &StationKey, b: &StationKey) -> Option<f64> {
        Some(cosine(&self.get(a)?.values, &self.get(b)?.values))
    }
}

fn normalize(counts: &[u64], normalization: Normalization) -> Vec<f64> {
    match normalization {
        Normalization::ShareOfTotal => {
            let total = sum_counts(counts.iter().copied());
            if total == 0 {
                return vec![0.0; counts.len()];
            }
            counts.iter().map(|&c| c as f64 / total as f64).collect()
        }
        Normalization::RowMinMax => {
            let min = counts.iter().copied().min().unwrap_or(0);
            let max = counts.iter().copied().max().unwrap_or(0);
            if max == min {
                return vec![0.0; counts.len()];
            }
            let span = (max - min) as f64;
            counts.iter().map(|&c| (c - min) as f64 / span).collect()
        }
    }
}

/// Builds one profile per key from the directions `filter` admits.
///
/// Dimensions follow the service-day hour order, boarding before alighting.
pub fn build_profiles(
    table: &FactTable,
    combine: bool,
    filter: DirectionFilter,
    normalization: Normalization,
) -> ProfileSet {
    let mut dimensions: Vec<CanonicalColumn> = table
        .columns
        .iter()
        .copied()
        .filter(|c| filter.accepts(c.direction))
        .collect();
    dimensions.sort_by_key(|c| (hours::sort_key(c.hour), c.direction));

    let index: HashMap<CanonicalColumn, usize> =
        dimensions.iter().enumerate().map(|(i, c)| (*c, i)).collect();

    let mut counts: BTreeMap<StationKey, Vec<u64>> = BTreeMap::new();
    for fact in &table.facts {
        let column = CanonicalColumn {
            hour: fact.hour,
            direction: fact.direction,
        };
        let Some(&dim) = index.get(&column) else {
            continue;
        };
        let key = StationKey::for_mode(&fact.line_name, &fact.station_name, combine);
        let per_dim = counts
            .entry(key)
            .or_insert_with(|| vec![0; dimensions.len()]);
        per_dim[dim] = per_dim[dim].saturating_add(fact.count);
    }

    let profiles = counts
        .into_iter()
        .map(|(key, raw)| {
            let profile = HourlyProfile {
                values: normalize(&raw, normalization),
                total: sum_counts(raw.iter().copied()),
            };
            (key, profile)
        })
        .collect();

    ProfileSet {
        dimensions,
        profiles,
    }
}

/// The `top_n` keys most similar to `reference`, excluding `reference` itself.
///
/// Equal scores are ordered by key. Fewer candidates than `top_n` returns all
/// of them.
pub fn rank_similar(
    set: &ProfileSet,
    reference: &StationKey,
    top_n: usize,
) -> Result<Vec<SimilarStation>> {
    ensure_top_n(top_n)?;
    let target = set
        .get(reference)
        .ok_or_else(|| PipelineError::UnknownStation(reference.to_string()))?;

    let mut scored: Vec<(&StationKey, f64)> = set
        .profiles
        .iter()
        .filter(|(key, _)| *key != reference)
        .map(|(key, profile)| (key, cosine(&target.values, &profile.values)))
        .collect();

    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    Ok(scored
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(idx, (key, score))| SimilarStation {
            rank: idx + 1,
            station: key.clone(),
            score,
        })
        .collect())
}
