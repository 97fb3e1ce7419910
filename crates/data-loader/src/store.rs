//! Rating Store: the per-domain table of (user, item, rating) events.
//!
//! Ratings are indexed twice, by user and by item, so both "what did this
//! user rate" and "who rated this item" are O(1) lookups. Item statistics
//! are derived from the item index and never edited by hand.
//!
//! Rust concepts you'll see here:
//! - Generic structs over a key trait (`RatingStore<K: ItemKey>`)
//! - Entry API for HashMap/BTreeMap
//! - Rayon `par_iter` over a HashMap for the bulk statistics pass

use crate::types::{ItemKey, ItemStats, Rating, UserId};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};

/// In-memory rating events for one domain.
///
/// Users are kept in a `BTreeMap` so iteration order is ascending user id;
/// the collaborative filter relies on that for a stable row order.
#[derive(Debug, Clone)]
pub struct RatingStore<K: ItemKey> {
    pub(crate) user_ratings: BTreeMap<UserId, Vec<Rating<K>>>,
    pub(crate) item_ratings: HashMap<K, Vec<Rating<K>>>,
    pub(crate) stats: HashMap<K, ItemStats>,
    total: usize,
    /// Bumped on every write made through [`RatingStore::record`]
    version: u64,
}

impl<K: ItemKey> Default for RatingStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ItemKey> RatingStore<K> {
    pub fn new() -> Self {
        Self {
            user_ratings: BTreeMap::new(),
            item_ratings: HashMap::new(),
            stats: HashMap::new(),
            total: 0,
            version: 0,
        }
    }

    /// Build a store from loaded events and compute statistics once.
    pub fn from_ratings(ratings: impl IntoIterator<Item = Rating<K>>) -> Self {
        let mut store = Self::new();
        for rating in ratings {
            store.insert_rating(rating);
        }
        store.compute_item_stats();
        store
    }

    /// Append a rating without touching statistics.
    ///
    /// This is the bulk-load path; call [`compute_item_stats`] afterwards.
    /// Repeated (user, item) pairs are kept as separate events.
    ///
    /// [`compute_item_stats`]: RatingStore::compute_item_stats
    pub fn insert_rating(&mut self, rating: Rating<K>) {
        self.item_ratings
            .entry(rating.item_id.clone())
            .or_default()
            .push(rating.clone());
        self.user_ratings
            .entry(rating.user_id)
            .or_default()
            .push(rating);
        self.total += 1;
    }

    /// Recompute statistics for every item in parallel
    pub fn compute_item_stats(&mut self) {
        self.stats = self
            .item_ratings
            .par_iter()
            .map(|(item_id, ratings)| (item_id.clone(), stats_for(ratings)))
            .collect();
    }

    /// Record a rating as an upsert keyed by (user, item).
    ///
    /// Any earlier events for the same pair are replaced, the item's
    /// statistics are refreshed from the store, and the version is bumped.
    /// Returns the value that was replaced, if any.
    ///
    /// The value is stored as given; range checks happen before this call.
    pub fn record(&mut self, rating: Rating<K>) -> Option<f32> {
        let user_id = rating.user_id;
        let item_id = rating.item_id.clone();

        let mut previous = None;
        if let Some(events) = self.user_ratings.get_mut(&user_id) {
            let before = events.len();
            if let Some(old) = events.iter().rev().find(|r| r.item_id == item_id) {
                previous = Some(old.value);
            }
            events.retain(|r| r.item_id != item_id);
            self.total -= before - events.len();
        }
        if let Some(events) = self.item_ratings.get_mut(&item_id) {
            events.retain(|r| r.user_id != user_id);
        }

        self.insert_rating(rating);

        if let Some(events) = self.item_ratings.get(&item_id) {
            self.stats.insert(item_id, stats_for(events));
        }
        self.version += 1;
        previous
    }

    /// All events for a user, in the order they were recorded
    pub fn get_user_ratings(&self, user_id: UserId) -> &[Rating<K>] {
        self.user_ratings
            .get(&user_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// All events for an item
    pub fn get_item_ratings(&self, item_id: &K) -> &[Rating<K>] {
        self.item_ratings
            .get(item_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn get_stats(&self, item_id: &K) -> Option<&ItemStats> {
        self.stats.get(item_id)
    }

    /// True if the user has at least one event in this domain
    pub fn has_history(&self, user_id: UserId) -> bool {
        self.user_ratings
            .get(&user_id)
            .is_some_and(|events| !events.is_empty())
    }

    /// Distinct item ids the user has rated
    pub fn rated_items(&self, user_id: UserId) -> HashSet<K> {
        self.get_user_ratings(user_id)
            .iter()
            .map(|r| r.item_id.clone())
            .collect()
    }

    /// Users with at least one event, ascending
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.user_ratings.keys().copied()
    }

    /// Number of events per item id
    pub fn item_rating_count(&self, item_id: &K) -> usize {
        self.get_item_ratings(item_id).len()
    }

    /// Largest user id seen, if any
    pub fn max_user_id(&self) -> Option<UserId> {
        self.user_ratings.keys().next_back().copied()
    }

    /// Iterate every event, grouped by ascending user id
    pub fn iter_ratings(&self) -> impl Iterator<Item = &Rating<K>> {
        self.user_ratings.values().flatten()
    }

    /// Get counts for debugging
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.user_ratings.len(), self.item_ratings.len(), self.total)
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Content version; changes whenever [`RatingStore::record`] writes
    pub fn version(&self) -> u64 {
        self.version
    }
}

fn stats_for<K>(ratings: &[Rating<K>]) -> ItemStats {
    let num_ratings = ratings.len() as u32;
    let avg_rating = if num_ratings > 0 {
        let total: f32 = ratings.iter().map(|r| r.value).sum();
        total / num_ratings as f32
    } else {
        0.0
    };
    ItemStats {
        avg_rating,
        num_ratings,
    }
}
