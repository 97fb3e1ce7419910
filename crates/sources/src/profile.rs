//! Content Profiler: turn a user's well-rated items into a category
//! preference vector.
//!
//! ## Algorithm
//! 1. Take the user's rating events at or above the like-threshold
//! 2. Join with the catalog (events for unknown items are skipped)
//! 3. Average the one-hot category rows of the joined items
//!
//! Every category row is binary, so every profile component lies in [0, 1].
//! No liked items means the zero vector.
//!
//! ## Learning Goals
//! - Pure functions over borrowed data
//! - Iterator adaptors (`zip`, `filter_map`) for vector arithmetic

use crate::types::UserContext;
use data_loader::{Catalog, CatalogItem, RatingStore, UserId};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// A user's category preferences over a catalog vocabulary
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileVector {
    values: Vec<f32>,
    /// Number of rating events averaged into the vector
    liked_count: usize,
}

impl ProfileVector {
    pub fn zeros(dims: usize) -> Self {
        Self {
            values: vec![0.0; dims],
            liked_count: 0,
        }
    }

    /// Wrap a precomputed vector; `liked_count` is left at 0
    pub fn from_values(values: Vec<f32>) -> Self {
        Self {
            values,
            liked_count: 0,
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn liked_count(&self) -> usize {
        self.liked_count
    }

    /// True if every component is zero
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }

    /// Non-zero categories, strongest first. Ties keep vocabulary order.
    pub fn top_categories<'a>(&self, vocabulary: &'a [String], n: usize) -> Vec<(&'a str, f32)> {
        let mut weighted: Vec<(&str, f32)> = vocabulary
            .iter()
            .zip(&self.values)
            .filter(|&(_, &weight)| weight > 0.0)
            .map(|(name, &weight)| (name.as_str(), weight))
            .collect();
        weighted.sort_by(|a, b| b.1.total_cmp(&a.1));
        weighted.truncate(n);
        weighted
    }
}

/// Cosine similarity of two equal-length vectors; 0.0 if either has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Build the mean category vector over the user's items rated >= `threshold`
pub fn build_user_profile<T: CatalogItem>(
    catalog: &Catalog<T>,
    store: &RatingStore<T::Id>,
    user_id: UserId,
    threshold: f32,
) -> ProfileVector {
    let dims = catalog.vocabulary().len();
    let mut sum = vec![0.0f32; dims];
    let mut liked = 0usize;

    let rows = store
        .get_user_ratings(user_id)
        .iter()
        .filter(|r| r.value >= threshold)
        .filter_map(|r| catalog.features_of(&r.item_id));

    for row in rows {
        for (acc, &v) in sum.iter_mut().zip(row) {
            *acc += v;
        }
        liked += 1;
    }

    if liked == 0 {
        return ProfileVector::zeros(dims);
    }

    let n = liked as f32;
    sum.iter_mut().for_each(|v| *v /= n);
    ProfileVector {
        values: sum,
        liked_count: liked,
    }
}

/// Build a UserContext for one domain.
///
/// A user with no events gets an empty context rather than an error; callers
/// use [`UserContext::has_history`] to route to cold start.
#[instrument(skip(catalog, store), fields(domain = %T::DOMAIN))]
pub fn build_user_context<T: CatalogItem>(
    catalog: &Catalog<T>,
    store: &RatingStore<T::Id>,
    user_id: UserId,
    threshold: f32,
) -> UserContext<T::Id> {
    let ratings = store.get_user_ratings(user_id);
    if ratings.is_empty() {
        return UserContext::empty(user_id, catalog.vocabulary().len());
    }

    let total: f32 = ratings.iter().map(|r| r.value).sum();
    let rated_items: HashSet<T::Id> = ratings.iter().map(|r| r.item_id.clone()).collect();
    let highly_rated = ratings
        .iter()
        .filter(|r| r.value >= threshold)
        .map(|r| r.item_id.clone())
        .collect();

    let profile = build_user_profile(catalog, store, user_id, threshold);
    debug!(
        "User {} rated {} items, {} averaged into profile",
        user_id,
        rated_items.len(),
        profile.liked_count()
    );

    UserContext {
        user_id,
        rated_items,
        highly_rated,
        avg_rating: total / ratings.len() as f32,
        profile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Movie, Rating};

    fn create_test_catalog() -> Catalog<Movie> {
        let movie = |id: u32, genres: &[&str]| Movie {
            id,
            title: format!("Movie {id}"),
            year: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        };
        Catalog::new(vec![
            movie(1, &["Action"]),
            movie(2, &["Comedy"]),
            movie(3, &["Action", "Comedy"]),
        ])
    }

    fn rating(user_id: UserId, item_id: u32, value: f32) -> Rating<u32> {
        Rating {
            user_id,
            item_id,
            value,
            timestamp: 0,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        let s = cosine_similarity(&[1.0, 0.0], &[1.0, 1.0]);
        assert!((s - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_profile_single_liked_movie() {
        let catalog = create_test_catalog();
        let store = RatingStore::from_ratings(vec![rating(1, 1, 5.0)]);

        let profile = build_user_profile(&catalog, &store, 1, 4.0);
        assert_eq!(profile.values(), &[1.0, 0.0]);
        assert_eq!(profile.liked_count(), 1);
    }

    #[test]
    fn test_profile_is_mean_of_rows() {
        let catalog = create_test_catalog();
        let store = RatingStore::from_ratings(vec![rating(1, 1, 4.0), rating(1, 3, 4.5)]);

        let profile = build_user_profile(&catalog, &store, 1, 4.0);
        assert_eq!(profile.values(), &[1.0, 0.5]);
        assert!(profile.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_profile_below_threshold_is_zero() {
        let catalog = create_test_catalog();
        let store = RatingStore::from_ratings(vec![rating(1, 1, 3.5), rating(1, 2, 2.0)]);

        let profile = build_user_profile(&catalog, &store, 1, 4.0);
        assert!(profile.is_zero());
        assert_eq!(profile.len(), 2);
    }

    #[test]
    fn test_profile_skips_unknown_items() {
        let catalog = create_test_catalog();
        let store = RatingStore::from_ratings(vec![rating(1, 99, 5.0), rating(1, 2, 5.0)]);

        let profile = build_user_profile(&catalog, &store, 1, 4.0);
        assert_eq!(profile.values(), &[0.0, 1.0]);
    }

    #[test]
    fn test_top_categories() {
        let vocabulary = vec!["Action".to_string(), "Comedy".to_string(), "Drama".to_string()];
        let profile = ProfileVector::from_values(vec![0.5, 0.0, 1.0]);

        let top = profile.top_categories(&vocabulary, 5);
        assert_eq!(top, vec![("Drama", 1.0), ("Action", 0.5)]);
    }

    #[test]
    fn test_build_user_context() {
        let catalog = create_test_catalog();
        let store = RatingStore::from_ratings(vec![rating(1, 1, 5.0), rating(1, 2, 3.0)]);

        let context = build_user_context(&catalog, &store, 1, 4.0);
        assert!(context.has_history());
        assert_eq!(context.rated_items.len(), 2);
        assert_eq!(context.highly_rated, vec![1]);
        assert!((context.avg_rating - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_user_with_no_ratings() {
        let catalog = create_test_catalog();
        let store = RatingStore::new();

        let context = build_user_context(&catalog, &store, 42, 4.0);
        assert!(!context.has_history());
        assert!(context.profile.is_zero());
        assert_eq!(context.profile.len(), 2);
    }
}
