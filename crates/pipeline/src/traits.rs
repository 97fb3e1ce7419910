//! Core traits for the filtering pipeline.
//!
//! This module defines the Filter trait that allows composable,
//! extensible filters to be applied to candidate sets, and the context
//! every filter reads from.

use anyhow::Result;
use data_loader::{ItemKey, RatingStore};
use sources::Candidate;
use std::collections::HashSet;

/// What a filter may look at besides the candidates themselves.
///
/// Borrowed for one pipeline run: the caller holds the store's read lock
/// for as long as the context lives.
pub struct FilterContext<'a, K: ItemKey> {
    /// Items the user has already rated in this domain
    pub rated: &'a HashSet<K>,

    /// Items already proposed earlier in the same batch
    pub already_recommended: &'a HashSet<K>,

    /// Ratings and per-item statistics for this domain
    pub store: &'a RatingStore<K>,
}

impl<'a, K: ItemKey> FilterContext<'a, K> {
    pub fn new(
        rated: &'a HashSet<K>,
        already_recommended: &'a HashSet<K>,
        store: &'a RatingStore<K>,
    ) -> Self {
        Self {
            rated,
            already_recommended,
            store,
        }
    }
}

/// Core trait for filtering candidates.
///
/// All filters must implement this trait to be used in the FilterPipeline.
///
/// ## Design Note
/// - `Send + Sync` allows filters to be used in concurrent contexts
/// - Filters take ownership of the Vec<Candidate> and return a filtered Vec
/// - Generic over the item key so one filter serves both catalogs
pub trait Filter<K: ItemKey>: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    /// Apply this filter to a set of candidates.
    ///
    /// # Returns
    /// * `Ok(Vec<Candidate>)` - The filtered candidates
    /// * `Err` - If filtering fails
    fn apply(
        &self,
        candidates: Vec<Candidate<K>>,
        context: &FilterContext<'_, K>,
    ) -> Result<Vec<Candidate<K>>>;
}
