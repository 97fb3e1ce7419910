//! Content Matcher - score every catalog item against a profile vector
//!
//! ## Algorithm
//! 1. Cosine similarity between the profile and each item's category row
//! 2. Drop excluded items (already rated)
//! 3. Stable sort by similarity descending, so ties keep catalog order
//! 4. Return the first N
//!
//! Items with similarity 0 stay in the ranking. A zero profile therefore
//! yields the catalog in its own order.
//!
//! ## Learning Goals
//! - Rayon `par_iter` with an order-preserving `collect`
//! - Generic sources over the `CatalogItem` trait

use crate::profile::{ProfileVector, cosine_similarity};
use crate::types::{Candidate, CandidateSource, UserContext};
use data_loader::{Catalog, CatalogItem};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Content-based source over one catalog
pub struct ContentSource<T: CatalogItem> {
    catalog: Arc<Catalog<T>>,
}

impl<T: CatalogItem> ContentSource<T> {
    pub fn new(catalog: Arc<Catalog<T>>) -> Self {
        Self { catalog }
    }

    /// Rank items for a user, excluding everything they already rated
    #[instrument(skip(self, user_context), fields(user_id = user_context.user_id))]
    pub fn get_candidates(
        &self,
        user_context: &UserContext<T::Id>,
        limit: usize,
    ) -> Vec<Candidate<T::Id>> {
        debug!(
            "Generating content candidates for user {} (profile from {} items)",
            user_context.user_id,
            user_context.profile.liked_count()
        );
        self.score_profile(&user_context.profile, &user_context.rated_items, limit)
    }

    /// Rank items by cosine similarity to `profile`
    pub fn score_profile(
        &self,
        profile: &ProfileVector,
        exclude: &HashSet<T::Id>,
        limit: usize,
    ) -> Vec<Candidate<T::Id>> {
        let vocabulary = self.catalog.vocabulary();
        let weights = profile.values();

        let mut candidates: Vec<Candidate<T::Id>> = self
            .catalog
            .items()
            .par_iter()
            .enumerate()
            .filter(|(_, item)| !exclude.contains(item.id()))
            .map(|(pos, item)| {
                let row = self.catalog.feature_row(pos);
                let similarity = cosine_similarity(weights, row);
                let shared: Vec<String> = vocabulary
                    .iter()
                    .zip(row.iter().zip(weights))
                    .filter(|(_, (f, w))| **f > 0.0 && **w > 0.0)
                    .map(|(name, _)| name.clone())
                    .collect();
                Candidate::new(item.id().clone(), CandidateSource::Content, similarity)
                    .with_tags(shared)
            })
            .collect();

        // Stable: equal scores keep catalog order
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(limit);

        debug!("Generated {} content candidates", candidates.len());
        candidates
    }
}
