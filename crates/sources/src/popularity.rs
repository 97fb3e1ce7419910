//! Popularity source - the Cold-Start Ranker
//!
//! Ranks items purely by average rating among those with enough ratings.
//! It serves brand-new users and backs every fallback path in the engine.
//!
//! ## Algorithm
//! 1. Walk the catalog in order
//! 2. Keep rated items with `num_ratings >= min_rating_count` that are not
//!    excluded; items without statistics never rank, whatever the threshold
//! 3. Stable sort by `avg_rating` descending
//! 4. Return the first N
//!
//! Deterministic for fixed data: no randomness, ties keep catalog order.

use crate::types::{Candidate, CandidateSource};
use data_loader::{Catalog, CatalogItem, RatingStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Popularity-ranked candidates over one catalog
pub struct PopularitySource<T: CatalogItem> {
    catalog: Arc<Catalog<T>>,

    /// Minimum rating count for an item to be ranked
    min_rating_count: u32,

    /// Label attached to produced candidates
    source: CandidateSource,
}

impl<T: CatalogItem> PopularitySource<T> {
    /// Create a new popularity source (default minimum: 50 ratings)
    pub fn new(catalog: Arc<Catalog<T>>) -> Self {
        Self {
            catalog,
            min_rating_count: 50,
            source: CandidateSource::ColdStart,
        }
    }

    /// Configure minimum rating count threshold
    pub fn with_min_rating_count(mut self, count: u32) -> Self {
        self.min_rating_count = count;
        self
    }

    /// Configure the source label (cold start or fallback)
    pub fn with_source(mut self, source: CandidateSource) -> Self {
        self.source = source;
        self
    }

    pub fn min_rating_count(&self) -> u32 {
        self.min_rating_count
    }

    /// Top-rated items, skipping `exclude`
    #[instrument(skip(self, store, exclude), fields(domain = %T::DOMAIN))]
    pub fn get_candidates(
        &self,
        store: &RatingStore<T::Id>,
        exclude: &HashSet<T::Id>,
        limit: usize,
    ) -> Vec<Candidate<T::Id>> {
        let mut candidates: Vec<Candidate<T::Id>> = self
            .catalog
            .items()
            .iter()
            .filter(|item| !exclude.contains(item.id()))
            .filter_map(|item| {
                let stats = store.get_stats(item.id())?;
                if stats.num_ratings < self.min_rating_count {
                    return None;
                }
                let mut candidate =
                    Candidate::new(item.id().clone(), self.source, stats.avg_rating);
                candidate.metadata.avg_rating = Some(stats.avg_rating);
                candidate.metadata.num_ratings = Some(stats.num_ratings);
                Some(candidate)
            })
            .collect();

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(limit);

        debug!(
            "Generated {} popularity candidates (min ratings {})",
            candidates.len(),
            self.min_rating_count
        );
        candidates
    }
}
