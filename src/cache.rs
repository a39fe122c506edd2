//! Session memoization of the fact table and derived results.
//!
//! Entries are keyed by the SHA-256 of the source bytes plus the query
//! parameters. Loading different bytes drops every derived entry. Cached
//! values are shared as `Arc`s and never mutated after construction.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::analyzers::aggregate::{AggregateQuery, AggregateRow, aggregate};
use crate::analyzers::ranking::{CumulativeSeries, cumulative_series};
use crate::analyzers::similarity::{Normalization, ProfileSet, build_profiles};
use crate::analyzers::types::DirectionFilter;
use crate::error::{PipelineError, Result};
use crate::facts::FactTable;
use crate::loader::{Source, content_hash, parse_hashed, read_source};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ProfileKey {
    combine: bool,
    filter: DirectionFilter,
    normalization: Normalization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CumulativeKey {
    combine: bool,
    filter: DirectionFilter,
}

#[derive(Debug, Default)]
pub struct AnalysisCache {
    table: Option<Arc<FactTable>>,
    aggregates: HashMap<AggregateQuery, Arc<Vec<AggregateRow>>>,
    profiles: HashMap<ProfileKey, Arc<ProfileSet>>,
    cumulative: HashMap<CumulativeKey, Arc<CumulativeSeries>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `source` and returns its fact table, rebuilding only when the
    /// bytes differ from what is currently cached.
    pub fn load(&mut self, source: &Source) -> Result<Arc<FactTable>> {
        let bytes = read_source(source)?;
        self.load_bytes(&bytes)
    }

    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<Arc<FactTable>> {
        let hash = content_hash(bytes);
        if let Some(table) = &self.table {
            if table.source_hash == hash {
                debug!(hash = %hash, "Fact table cache hit");
                return Ok(Arc::clone(table));
            }
        }

        let raw = parse_hashed(bytes, hash)?;
        let table = Arc::new(FactTable::from_raw(&raw)?);
        self.invalidate();
        info!(hash = %table.source_hash, facts = table.facts.len(), "Fact table cached");
        self.table = Some(Arc::clone(&table));
        Ok(table)
    }

    /// Forgets the fact table and everything derived from it.
    pub fn invalidate(&mut self) {
        self.table = None;
        self.aggregates.clear();
        self.profiles.clear();
        self.cumulative.clear();
    }

    pub fn table(&self) -> Result<Arc<FactTable>> {
        self.table.clone().ok_or(PipelineError::NotLoaded)
    }

    pub fn aggregate(&mut self, query: &AggregateQuery) -> Result<Arc<Vec<AggregateRow>>> {
        let table = self.table()?;
        Ok(Arc::clone(
            self.aggregates
                .entry(query.clone())
                .or_insert_with(|| Arc::new(aggregate(&table, query))),
        ))
    }

    pub fn profiles(
        &mut self,
        combine: bool,
        filter: DirectionFilter,
        normalization: Normalization,
    ) -> Result<Arc<ProfileSet>> {
        let table = self.table()?;
        let key = ProfileKey {
            combine,
            filter,
            normalization,
        };
        Ok(Arc::clone(self.profiles.entry(key).or_insert_with(|| {
            Arc::new(build_profiles(&table, combine, filter, normalization))
        })))
    }

    pub fn cumulative(
        &mut self,
        combine: bool,
        filter: DirectionFilter,
    ) -> Result<Arc<CumulativeSeries>> {
        let table = self.table()?;
        let key = CumulativeKey { combine, filter };
        Ok(Arc::clone(self.cumulative.entry(key).or_insert_with(|| {
            Arc::new(cumulative_series(&table, combine, filter))
        })))
    }
}
