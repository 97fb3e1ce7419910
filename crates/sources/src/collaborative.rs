//! Sparse Collaborative Filter - matrix factorization over the rating table
//!
//! "Users whose ratings look like yours also rated these highly"
//!
//! ## Algorithm
//! 1. Keep ratings from active users (>= min_user_ratings events) on popular
//!    items (>= min_item_ratings events); both counts come from the full table
//! 2. Build a sparse user×item matrix, summing repeated (user, item) events
//! 3. Factor it at rank k with a randomized truncated SVD
//! 4. Score every item for the user's row, highest first
//! 5. Skip rated items and items missing from the catalog; return the first N
//!
//! The factorization is recomputed on every call. Only the matrix and its
//! index maps may be cached, and only as a unit tagged with the store version.
//!
//! ## Learning Goals
//! - Building a `sprs::TriMat` and converting it to CSR
//! - Dense integer index maps kept in lockstep with a matrix

use crate::error::Result;
use crate::svd::TruncatedSvd;
use crate::types::{Candidate, CandidateSource, UserContext};
use data_loader::{Catalog, CatalogItem, ItemKey, RatingStore, UserId};
use sprs::{CsMat, TriMat};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A filtered user×item matrix with its row/column index maps.
///
/// Rows follow ascending user id; columns follow the order items are first
/// met in that scan. Indices are dense and start at 0.
#[derive(Debug, Clone)]
pub struct InteractionMatrix<K: ItemKey> {
    matrix: CsMat<f64>,
    user_index: HashMap<UserId, usize>,
    item_index: HashMap<K, usize>,
    users: Vec<UserId>,
    items: Vec<K>,
    /// Store version the matrix was built from
    version: u64,
}

impl<K: ItemKey> InteractionMatrix<K> {
    /// Build from the store, keeping only active users and popular items
    #[instrument(skip(store))]
    pub fn build(store: &RatingStore<K>, min_user_ratings: usize, min_item_ratings: usize) -> Self {
        let active = |user_id: UserId, item_id: &K| {
            store.get_user_ratings(user_id).len() >= min_user_ratings
                && store.item_rating_count(item_id) >= min_item_ratings
        };

        let mut user_index = HashMap::new();
        let mut item_index = HashMap::new();
        let mut users = Vec::new();
        let mut items: Vec<K> = Vec::new();
        let mut triplets = Vec::new();

        for rating in store.iter_ratings() {
            if !active(rating.user_id, &rating.item_id) {
                continue;
            }
            let row = *user_index.entry(rating.user_id).or_insert_with(|| {
                users.push(rating.user_id);
                users.len() - 1
            });
            let col = *item_index.entry(rating.item_id.clone()).or_insert_with(|| {
                items.push(rating.item_id.clone());
                items.len() - 1
            });
            triplets.push((row, col, f64::from(rating.value)));
        }

        let mut tri = TriMat::with_capacity((users.len(), items.len()), triplets.len());
        for (row, col, value) in triplets {
            tri.add_triplet(row, col, value);
        }
        let matrix: CsMat<f64> = tri.to_csr();

        debug!(
            "Built {}x{} interaction matrix with {} entries",
            matrix.rows(),
            matrix.cols(),
            matrix.nnz()
        );

        Self {
            matrix,
            user_index,
            item_index,
            users,
            items,
            version: store.version(),
        }
    }

    pub fn matrix(&self) -> &CsMat<f64> {
        &self.matrix
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.matrix.rows(), self.matrix.cols())
    }

    pub fn row_of(&self, user_id: UserId) -> Option<usize> {
        self.user_index.get(&user_id).copied()
    }

    pub fn col_of(&self, item_id: &K) -> Option<usize> {
        self.item_index.get(item_id).copied()
    }

    pub fn user_at(&self, row: usize) -> Option<UserId> {
        self.users.get(row).copied()
    }

    pub fn item_at(&self, col: usize) -> Option<&K> {
        self.items.get(col)
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

/// Collaborative source over one catalog
pub struct CollaborativeSource<T: CatalogItem> {
    catalog: Arc<Catalog<T>>,
    svd: TruncatedSvd,
}

impl<T: CatalogItem> CollaborativeSource<T> {
    /// Create a source with the default rank-20 factorization
    pub fn new(catalog: Arc<Catalog<T>>) -> Self {
        Self {
            catalog,
            svd: TruncatedSvd::default(),
        }
    }

    /// Configure the factorization settings
    pub fn with_svd(mut self, svd: TruncatedSvd) -> Self {
        self.svd = svd;
        self
    }

    /// Score unseen items for a user.
    ///
    /// A user without a row in the matrix gets an empty list, not an error;
    /// the caller picks the fallback.
    #[instrument(skip(self, matrix, user_context), fields(user_id = user_context.user_id))]
    pub fn get_candidates(
        &self,
        matrix: &InteractionMatrix<T::Id>,
        user_context: &UserContext<T::Id>,
        limit: usize,
    ) -> Result<Vec<Candidate<T::Id>>> {
        let Some(row) = matrix.row_of(user_context.user_id) else {
            debug!("User {} not in interaction matrix", user_context.user_id);
            return Ok(Vec::new());
        };

        let factors = self.svd.factor(matrix.matrix())?;
        let scores = factors.score_row(row);

        let mut ranked: Vec<(usize, f64)> = scores.into_iter().enumerate().collect();
        // Stable: equal scores keep column order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let candidates: Vec<Candidate<T::Id>> = ranked
            .into_iter()
            .filter_map(|(col, score)| {
                let item_id = matrix.item_at(col)?;
                if user_context.rated_items.contains(item_id) || !self.catalog.contains(item_id) {
                    return None;
                }
                Some(Candidate::new(
                    item_id.clone(),
                    CandidateSource::Collaborative,
                    score as f32,
                ))
            })
            .take(limit)
            .collect();

        debug!(
            "Generated {} collaborative candidates at rank {}",
            candidates.len(),
            factors.rank()
        );
        Ok(candidates)
    }
}
