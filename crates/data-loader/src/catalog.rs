//! Catalog Store: an immutable, ordered table of items with one-hot
//! category vectors.
//!
//! Catalog order is the order items were loaded in. Rankers that tie on
//! score fall back to this order, so it is never reshuffled.

use crate::types::CatalogItem;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Items of one domain plus their category encodings
#[derive(Debug, Clone)]
pub struct Catalog<T: CatalogItem> {
    items: Vec<T>,
    positions: HashMap<T::Id, usize>,
    vocabulary: Vec<String>,
    /// One row per item, `vocabulary.len()` columns, every entry 0.0 or 1.0
    features: Vec<Vec<f32>>,
}

impl<T: CatalogItem> Catalog<T> {
    /// Build a catalog whose vocabulary is the sorted set of all category
    /// tokens found on the items.
    pub fn new(items: Vec<T>) -> Self {
        let vocabulary: BTreeSet<String> =
            items.iter().flat_map(|item| item.categories()).collect();
        Self::with_vocabulary(items, vocabulary.into_iter().collect())
    }

    /// Build a catalog over a fixed vocabulary. Category tokens outside the
    /// vocabulary are ignored.
    ///
    /// Items whose id was already seen are dropped; the first one wins.
    pub fn with_vocabulary(items: Vec<T>, vocabulary: Vec<String>) -> Self {
        let columns: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();

        let mut kept = Vec::with_capacity(items.len());
        let mut positions = HashMap::with_capacity(items.len());
        let mut features = Vec::with_capacity(items.len());
        let mut duplicates = 0usize;

        for item in items {
            if positions.contains_key(item.id()) {
                duplicates += 1;
                continue;
            }
            let mut row = vec![0.0f32; vocabulary.len()];
            for category in item.categories() {
                if let Some(&col) = columns.get(category.as_str()) {
                    row[col] = 1.0;
                }
            }
            positions.insert(item.id().clone(), kept.len());
            features.push(row);
            kept.push(item);
        }

        if duplicates > 0 {
            warn!(
                "Dropped {} duplicate {} ids while building catalog",
                duplicates,
                T::DOMAIN
            );
        }

        Self {
            items: kept,
            positions,
            vocabulary,
            features,
        }
    }

    /// Get an item by id
    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.positions.get(id).map(|&pos| &self.items[pos])
    }

    /// Position of an item in catalog order
    pub fn position(&self, id: &T::Id) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.positions.contains_key(id)
    }

    /// All items in catalog order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Category names, one per feature column
    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    /// Feature row for the item at a catalog position
    pub fn feature_row(&self, position: usize) -> &[f32] {
        &self.features[position]
    }

    /// Feature row for an item by id
    pub fn features_of(&self, id: &T::Id) -> Option<&[f32]> {
        self.position(id).map(|pos| self.features[pos].as_slice())
    }

    /// Iterate `(item, feature_row)` pairs in catalog order
    pub fn iter_with_features(&self) -> impl Iterator<Item = (&T, &[f32])> {
        self.items
            .iter()
            .zip(self.features.iter().map(|row| row.as_slice()))
    }

    /// Case-insensitive title search.
    ///
    /// Returns `(item, exact)` pairs in catalog order, where `exact` marks a
    /// whole-title match rather than a substring hit.
    pub fn search_title(&self, query: &str) -> Vec<(&T, bool)> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.items
            .iter()
            .filter_map(|item| {
                let title = item.title().to_lowercase();
                if title == needle {
                    Some((item, true))
                } else if title.contains(&needle) {
                    Some((item, false))
                } else {
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Book, Movie, book_genre_vocabulary};

    fn movie(id: u32, title: &str, genres: &[&str]) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            year: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn test_vocabulary_is_sorted_and_one_hot() {
        let catalog = Catalog::new(vec![
            movie(1, "A", &["Comedy"]),
            movie(2, "B", &["Action", "Comedy"]),
        ]);

        assert_eq!(catalog.vocabulary(), &["Action", "Comedy"]);
        assert_eq!(catalog.features_of(&1).unwrap(), &[0.0, 1.0]);
        assert_eq!(catalog.features_of(&2).unwrap(), &[1.0, 1.0]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let catalog = Catalog::new(vec![
            movie(1, "First", &["Drama"]),
            movie(1, "Second", &["Drama"]),
            movie(2, "Other", &["Drama"]),
        ]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(&1).unwrap().title, "First");
        assert_eq!(catalog.position(&2), Some(1));
    }

    #[test]
    fn test_fixed_vocabulary_for_books() {
        let book = Book {
            isbn: "123".to_string(),
            title: "Computer Love".to_string(),
            author: "A".to_string(),
            year: None,
            publisher: String::new(),
            image_url: None,
        };
        let catalog = Catalog::with_vocabulary(vec![book], book_genre_vocabulary());

        let row = catalog.features_of(&"123".to_string()).unwrap();
        assert_eq!(row.len(), 10);
        // Romance (love) and Technology (computer)
        assert_eq!(row.iter().filter(|&&v| v == 1.0).count(), 2);
        assert_eq!(row[2], 1.0);
        assert_eq!(row[9], 1.0);
    }

    #[test]
    fn test_search_title() {
        let catalog = Catalog::new(vec![
            movie(1, "Heat", &["Action"]),
            movie(2, "Heat Wave", &["Drama"]),
            movie(3, "Cold", &["Drama"]),
        ]);

        let hits = catalog.search_title("heat");
        assert_eq!(hits.len(), 2);
        assert!(hits[0].1);
        assert!(!hits[1].1);
        assert!(catalog.search_title("   ").is_empty());
    }
}
