//! DataSet building and validation.
//!
//! This module builds the [`DataSet`] from the four cleaned CSV files:
//! - Parse all files in parallel
//! - Build both catalogs (one-hot category vectors included)
//! - Build both rating stores and compute item statistics
//! - Validate rating ranges and count orphan ratings
//!
//! Rust concepts you'll see here:
//! - `rayon::join` for fork/join parallelism
//! - Generic helper functions over the `CatalogItem` trait

use crate::catalog::Catalog;
use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::store::RatingStore;
use crate::types::*;
use std::path::Path;
use tracing::{info, warn};

pub const MOVIES_FILE: &str = "movies_cleaned.csv";
pub const MOVIE_RATINGS_FILE: &str = "ratings_cleaned.csv";
pub const BOOKS_FILE: &str = "books_cleaned.csv";
pub const BOOK_RATINGS_FILE: &str = "book_ratings_cleaned.csv";

impl DataSet {
    /// Load both catalogs and both rating tables from a directory
    ///
    /// This is the main entry point for loading data.
    ///
    /// Steps:
    /// 1. Parse all four files in parallel
    /// 2. Build catalogs and rating stores
    /// 3. Compute item statistics (inside `RatingStore::from_ratings`)
    /// 4. Validate
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        info!("Loading movie and book data from {:?}", data_dir);

        let movies_path = data_dir.join(MOVIES_FILE);
        let movie_ratings_path = data_dir.join(MOVIE_RATINGS_FILE);
        let books_path = data_dir.join(BOOKS_FILE);
        let book_ratings_path = data_dir.join(BOOK_RATINGS_FILE);

        // Nested joins give four-way parallelism
        let ((movies, movie_ratings), (books, book_ratings)) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_movies(&movies_path),
                    || parser::parse_movie_ratings(&movie_ratings_path),
                )
            },
            || {
                rayon::join(
                    || parser::parse_books(&books_path),
                    || parser::parse_book_ratings(&book_ratings_path),
                )
            },
        );

        let dataset = Self::from_parts(movies?, movie_ratings?, books?, book_ratings?);
        dataset.validate()?;

        let (movie_users, _, movie_events) = dataset.movie_ratings.counts();
        let (book_users, _, book_events) = dataset.book_ratings.counts();
        info!(
            "Loaded {} movies ({} ratings from {} users), {} books ({} ratings from {} users)",
            dataset.movies.len(),
            movie_events,
            movie_users,
            dataset.books.len(),
            book_events,
            book_users
        );
        Ok(dataset)
    }

    /// Assemble a dataset from already-parsed rows.
    ///
    /// Historical events are kept exactly as loaded. Movies use the sorted
    /// set of their genre tokens as vocabulary; books use the fixed
    /// keyword-genre table.
    pub fn from_parts(
        movies: Vec<Movie>,
        movie_ratings: Vec<Rating<MovieId>>,
        books: Vec<Book>,
        book_ratings: Vec<Rating<Isbn>>,
    ) -> Self {
        let (movie_ratings, book_ratings) = rayon::join(
            || RatingStore::from_ratings(movie_ratings),
            || RatingStore::from_ratings(book_ratings),
        );
        Self {
            movies: Catalog::new(movies),
            movie_ratings,
            books: Catalog::with_vocabulary(books, book_genre_vocabulary()),
            book_ratings,
        }
    }

    /// Validate data integrity
    ///
    /// Fails only on non-finite rating values. Historical values outside the
    /// range accepted for new ratings (MovieLens has half-star 0.5 ratings)
    /// and ratings pointing at items missing from the catalog are kept and
    /// logged; every join with the catalog skips the orphans.
    pub fn validate(&self) -> Result<()> {
        check_ratings(&self.movies, &self.movie_ratings)?;
        check_ratings(&self.books, &self.book_ratings)?;
        Ok(())
    }
}

fn check_ratings<T: CatalogItem>(catalog: &Catalog<T>, store: &RatingStore<T::Id>) -> Result<()> {
    let (min, max) = T::DOMAIN.rating_range();
    let mut orphans = 0usize;
    let mut out_of_range = 0usize;

    for rating in store.iter_ratings() {
        if !rating.value.is_finite() {
            return Err(DataLoadError::InvalidValue {
                field: format!("{} rating", T::DOMAIN),
                value: rating.value.to_string(),
            });
        }
        if rating.value < min || rating.value > max {
            out_of_range += 1;
        }
        if !catalog.contains(&rating.item_id) {
            orphans += 1;
        }
    }

    if out_of_range > 0 {
        warn!(
            "{} historical {} ratings lie outside {}-{}",
            out_of_range,
            T::DOMAIN,
            min,
            max
        );
    }
    if orphans > 0 {
        warn!(
            "{} {} ratings reference items missing from the catalog",
            orphans,
            T::DOMAIN
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating<K>(user_id: UserId, item_id: K, value: f32) -> Rating<K> {
        Rating {
            user_id,
            item_id,
            value,
            timestamp: 0,
        }
    }

    fn movie(id: MovieId, genres: &[&str]) -> Movie {
        Movie {
            id,
            title: format!("Movie {id}"),
            year: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    #[test]
    fn test_from_parts_builds_catalogs_and_stats() {
        let dataset = DataSet::from_parts(
            vec![movie(1, &["Action"]), movie(2, &["Comedy"])],
            vec![rating(1, 1, 5.0), rating(2, 1, 3.0)],
            vec![],
            vec![rating(1, "x".to_string(), 8.0)],
        );

        assert_eq!(dataset.movies.vocabulary(), &["Action", "Comedy"]);
        assert_eq!(dataset.books.vocabulary().len(), 10);
        assert_eq!(dataset.movie_ratings.get_stats(&1).unwrap().num_ratings, 2);
        // Orphan book rating is kept
        assert_eq!(dataset.book_ratings.len(), 1);
        assert!(dataset.validate().is_ok());
    }

    #[test]
    fn test_from_parts_keeps_half_star_history() {
        let dataset = DataSet::from_parts(
            vec![movie(1, &["Action"])],
            vec![rating(1, 1, 0.5), rating(2, 1, 4.0)],
            vec![],
            vec![],
        );

        assert_eq!(dataset.movie_ratings.len(), 2);
        assert_eq!(dataset.movie_ratings.get_user_ratings(1)[0].value, 0.5);
        let stats = dataset.movie_ratings.get_stats(&1).unwrap();
        assert_eq!(stats.num_ratings, 2);
        assert!((stats.avg_rating - 2.25).abs() < 1e-6);
        assert!(dataset.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let dataset = DataSet::from_parts(
            vec![movie(1, &["Action"])],
            vec![rating(1, 1, f32::NAN)],
            vec![],
            vec![],
        );
        assert!(matches!(
            dataset.validate(),
            Err(DataLoadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_dataset() {
        // This test requires the cleaned CSV files in ../../data
        let data_dir = Path::new("../../data");

        let present = [MOVIES_FILE, MOVIE_RATINGS_FILE, BOOKS_FILE, BOOK_RATINGS_FILE]
            .iter()
            .all(|file| data_dir.join(file).exists());

        if present {
            let dataset = DataSet::load_from_dir(data_dir).unwrap();
            assert!(!dataset.movies.is_empty());
            assert!(!dataset.movie_ratings.is_empty());
        }
    }
}
