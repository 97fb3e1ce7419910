//! # Recommendation Engine
//!
//! The facade the request-handling layer talks to. It coordinates:
//! 1. Rating history lookups and validated rating writes
//! 2. Movie recommendations (content path, or cold start without history)
//! 3. Books for each recommended movie (cross-domain match with fallback)
//! 4. Collaborative book recommendations over the interaction matrix
//! 5. Explanation facts, and optional prose from a pluggable provider
//!
//! ## Concurrency
//! Catalogs are immutable and shared through `Arc`. Each domain's rating
//! store sits behind an `RwLock`; a request holds the read lock for its
//! whole duration, so it sees one consistent snapshot, and `record_rating`
//! takes the write lock for the upsert and stats refresh. The book
//! interaction matrix is cached behind a `Mutex` together with its index
//! maps and rebuilt whenever the store's version moves. The SVD itself is
//! recomputed on every collaborative call.
//!
//! ## Learning Goals
//!
//! This component teaches you:
//! - Interior mutability with `RwLock` / `Mutex` behind a cloneable handle
//! - Using spawn_blocking for CPU-bound work from async callers
//! - Error mapping across crate boundaries with `From` impls
//! - Instrumentation and timing

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use data_loader::{
    Book, Catalog, CatalogItem, DataSet, Domain, Isbn, ItemRef, ItemStats, Movie, MovieId,
    Rating, RatingStore, UserId,
};
use pipeline::{CategoryWeight, CrossDomainMatcher, ExplanationBuilder, ExplanationFacts};
use sources::{
    Candidate, CandidateSource, CollaborativeSource, ContentSource, InteractionMatrix,
    PopularitySource, build_user_context, build_user_profile,
};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::explain::{COLD_START_EXPLANATION, ExplanationProvider};

// =============================================================================
// Result types
// =============================================================================

/// A ranked item with the evidence behind its rank
#[derive(Debug, Clone)]
pub struct Recommendation<T: CatalogItem> {
    pub item: T,
    pub score: f32,
    pub source: CandidateSource,
    /// Category tags shared with the profile or the source movie
    pub matched_tags: Vec<String>,
    pub avg_rating: Option<f32>,
    pub num_ratings: Option<u32>,
}

impl<T: CatalogItem> Recommendation<T> {
    pub fn id(&self) -> &T::Id {
        self.item.id()
    }
}

/// One movie with the books picked for it
#[derive(Debug, Clone)]
pub struct MovieBookPair {
    pub movie: Recommendation<Movie>,
    pub books: Vec<Recommendation<Book>>,
    pub facts: ExplanationFacts,
    /// `None` when no provider is configured or the provider failed
    pub explanation: Option<String>,
}

/// One rating event from a user's history
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub item: ItemRef,
    pub value: f32,
    pub timestamp: i64,
}

/// A user's content profile over the movie genre vocabulary
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub user_id: UserId,
    /// One weight per vocabulary entry, each in [0, 1]
    pub values: Vec<f32>,
    /// Number of liked movies the profile was built from
    pub liked_count: usize,
    /// Non-zero weights, strongest first
    pub top_categories: Vec<CategoryWeight>,
}

/// A title search hit
#[derive(Debug, Clone)]
pub struct SearchResult<T: CatalogItem> {
    pub item: T,
    /// The whole title matched, not just a substring
    pub exact: bool,
    pub stats: Option<ItemStats>,
}

// =============================================================================
// Engine
// =============================================================================

/// Main engine that coordinates all recommendation paths.
///
/// Cheap to clone: every clone shares the same catalogs and stores.
#[derive(Clone)]
pub struct RecommendationEngine {
    movies: Arc<Catalog<Movie>>,
    books: Arc<Catalog<Book>>,
    movie_ratings: Arc<RwLock<RatingStore<MovieId>>>,
    book_ratings: Arc<RwLock<RatingStore<Isbn>>>,
    matrix_cache: Arc<Mutex<Option<Arc<InteractionMatrix<Isbn>>>>>,
    movie_content: Arc<ContentSource<Movie>>,
    movie_cold_start: Arc<PopularitySource<Movie>>,
    book_cold_start: Arc<PopularitySource<Book>>,
    book_matcher: Arc<CrossDomainMatcher<Book>>,
    book_collaborative: Arc<CollaborativeSource<Book>>,
    explainer: ExplanationBuilder,
    provider: Option<Arc<dyn ExplanationProvider>>,
    config: EngineConfig,
}

impl RecommendationEngine {
    /// Create an engine over a loaded dataset
    pub fn new(data: DataSet, config: EngineConfig) -> Self {
        let movies = Arc::new(data.movies);
        let books = Arc::new(data.books);

        let movie_cold_start = PopularitySource::new(movies.clone())
            .with_min_rating_count(config.movie_min_ratings);
        let book_cold_start = PopularitySource::new(books.clone())
            .with_min_rating_count(config.book_min_ratings);
        let book_matcher =
            CrossDomainMatcher::new(books.clone()).with_min_ratings(config.book_min_ratings);
        let book_collaborative = CollaborativeSource::new(books.clone()).with_svd(config.svd());

        Self {
            movie_content: Arc::new(ContentSource::new(movies.clone())),
            movie_cold_start: Arc::new(movie_cold_start),
            book_cold_start: Arc::new(book_cold_start),
            book_matcher: Arc::new(book_matcher),
            book_collaborative: Arc::new(book_collaborative),
            explainer: ExplanationBuilder::new(movies.clone(), books.clone()),
            movie_ratings: Arc::new(RwLock::new(data.movie_ratings)),
            book_ratings: Arc::new(RwLock::new(data.book_ratings)),
            matrix_cache: Arc::new(Mutex::new(None)),
            provider: None,
            movies,
            books,
            config,
        }
    }

    /// Load the four cleaned CSV files from `data_dir` and build an engine
    pub fn load(data_dir: &Path, config: EngineConfig) -> Result<Self> {
        let data = DataSet::load_from_dir(data_dir)?;
        Ok(Self::new(data, config))
    }

    /// Attach a provider that turns explanation facts into text
    pub fn with_explanation_provider(
        mut self,
        provider: impl ExplanationProvider + 'static,
    ) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn movies(&self) -> &Arc<Catalog<Movie>> {
        &self.movies
    }

    pub fn books(&self) -> &Arc<Catalog<Book>> {
        &self.books
    }

    // -------------------------------------------------------------------------
    // Lock helpers
    // -------------------------------------------------------------------------

    fn read_movie_ratings(&self) -> Result<RwLockReadGuard<'_, RatingStore<MovieId>>> {
        self.movie_ratings
            .read()
            .map_err(|e| EngineError::Poisoned(e.to_string()))
    }

    fn read_book_ratings(&self) -> Result<RwLockReadGuard<'_, RatingStore<Isbn>>> {
        self.book_ratings
            .read()
            .map_err(|e| EngineError::Poisoned(e.to_string()))
    }

    fn write_movie_ratings(&self) -> Result<RwLockWriteGuard<'_, RatingStore<MovieId>>> {
        self.movie_ratings
            .write()
            .map_err(|e| EngineError::Poisoned(e.to_string()))
    }

    fn write_book_ratings(&self) -> Result<RwLockWriteGuard<'_, RatingStore<Isbn>>> {
        self.book_ratings
            .write()
            .map_err(|e| EngineError::Poisoned(e.to_string()))
    }

    // -------------------------------------------------------------------------
    // History and writes
    // -------------------------------------------------------------------------

    /// A user's ratings in one domain, in the order they were recorded
    pub fn history(&self, user_id: UserId, domain: Domain) -> Result<Vec<HistoryEntry>> {
        let entries = match domain {
            Domain::Movies => self
                .read_movie_ratings()?
                .get_user_ratings(user_id)
                .iter()
                .map(|r| HistoryEntry {
                    item: ItemRef::Movie(r.item_id),
                    value: r.value,
                    timestamp: r.timestamp,
                })
                .collect(),
            Domain::Books => self
                .read_book_ratings()?
                .get_user_ratings(user_id)
                .iter()
                .map(|r| HistoryEntry {
                    item: ItemRef::Book(r.item_id.clone()),
                    value: r.value,
                    timestamp: r.timestamp,
                })
                .collect(),
        };
        Ok(entries)
    }

    /// Validate and store a rating.
    ///
    /// A rating for a (user, item) pair replaces any earlier one; the
    /// replaced value is returned. Invalid input leaves the store untouched.
    #[instrument(skip(self))]
    pub fn record_rating(&self, user_id: UserId, item: ItemRef, value: f32) -> Result<Option<f32>> {
        let value = item.domain().validate_rating(value)?;
        let timestamp = Utc::now().timestamp();

        let previous = match item {
            ItemRef::Movie(movie_id) => {
                if !self.movies.contains(&movie_id) {
                    return Err(EngineError::UnknownItem(ItemRef::Movie(movie_id)));
                }
                self.write_movie_ratings()?.record(Rating {
                    user_id,
                    item_id: movie_id,
                    value,
                    timestamp,
                })
            }
            ItemRef::Book(isbn) => {
                if !self.books.contains(&isbn) {
                    return Err(EngineError::UnknownItem(ItemRef::Book(isbn)));
                }
                self.write_book_ratings()?.record(Rating {
                    user_id,
                    item_id: isbn,
                    value,
                    timestamp,
                })
            }
        };

        info!("Recorded rating {} for user {} (replaced: {:?})", value, user_id, previous);
        Ok(previous)
    }

    /// Parse free-text rating input, then record it
    pub fn record_rating_str(
        &self,
        user_id: UserId,
        item: ItemRef,
        raw: &str,
    ) -> Result<Option<f32>> {
        let value = item.domain().parse_rating(raw)?;
        self.record_rating(user_id, item, value)
    }

    /// Identifier for a brand-new user: one past the largest known id
    pub fn next_user_id(&self) -> Result<UserId> {
        let movie_max = self.read_movie_ratings()?.max_user_id();
        let book_max = self.read_book_ratings()?.max_user_id();
        Ok(movie_max
            .max(book_max)
            .map_or(1, |max| max.saturating_add(1)))
    }

    // -------------------------------------------------------------------------
    // Movies
    // -------------------------------------------------------------------------

    /// Top movies for a user.
    ///
    /// Users with no movie history get exactly the cold-start ranking;
    /// everyone else gets the content path.
    #[instrument(skip(self))]
    pub fn recommend(&self, user_id: UserId, n: usize) -> Result<Vec<Recommendation<Movie>>> {
        let start = Instant::now();
        let store = self.read_movie_ratings()?;
        let context =
            build_user_context(&self.movies, &store, user_id, self.config.movie_like_threshold);

        let candidates = if context.has_history() {
            self.movie_content.get_candidates(&context, n)
        } else {
            debug!("User {} has no movie history, using cold start", user_id);
            self.movie_cold_start
                .get_candidates(&store, &context.rated_items, n)
        };

        let recommendations = resolve(&self.movies, &store, candidates);
        info!(
            "Recommended {} movies for user {} in {:.2?}",
            recommendations.len(),
            user_id,
            start.elapsed()
        );
        Ok(recommendations)
    }

    /// Highest-rated movies with enough ratings
    pub fn cold_start_movies(&self, n: usize) -> Result<Vec<Recommendation<Movie>>> {
        let store = self.read_movie_ratings()?;
        let candidates = self.movie_cold_start.get_candidates(&store, &HashSet::new(), n);
        Ok(resolve(&self.movies, &store, candidates))
    }

    /// The user's content profile and strongest genres
    pub fn user_profile(&self, user_id: UserId) -> Result<UserProfile> {
        let store = self.read_movie_ratings()?;
        let profile =
            build_user_profile(&self.movies, &store, user_id, self.config.movie_like_threshold);
        let vocabulary = self.movies.vocabulary();

        Ok(UserProfile {
            user_id,
            top_categories: profile
                .top_categories(vocabulary, vocabulary.len())
                .into_iter()
                .map(|(name, weight)| CategoryWeight {
                    name: name.to_string(),
                    weight,
                })
                .collect(),
            liked_count: profile.liked_count(),
            values: profile.values().to_vec(),
        })
    }

    pub fn search_movies(&self, query: &str, limit: usize) -> Result<Vec<SearchResult<Movie>>> {
        let store = self.read_movie_ratings()?;
        Ok(search(&self.movies, &store, query, limit))
    }

    // -------------------------------------------------------------------------
    // Books
    // -------------------------------------------------------------------------

    /// Highest-rated books with enough ratings
    pub fn cold_start_books(&self, n: usize) -> Result<Vec<Recommendation<Book>>> {
        let store = self.read_book_ratings()?;
        let candidates = self.book_cold_start.get_candidates(&store, &HashSet::new(), n);
        Ok(resolve(&self.books, &store, candidates))
    }

    pub fn search_books(&self, query: &str, limit: usize) -> Result<Vec<SearchResult<Book>>> {
        let store = self.read_book_ratings()?;
        Ok(search(&self.books, &store, query, limit))
    }

    /// Books matching a set of category tags, skipping `exclude`
    pub fn cross_domain_match(
        &self,
        tags: &[String],
        exclude: &HashSet<Isbn>,
        n: usize,
    ) -> Result<Vec<Recommendation<Book>>> {
        let store = self.read_book_ratings()?;
        let candidates = self
            .book_matcher
            .find_matches(tags, &store, &HashSet::new(), exclude, n)
            .map_err(pipeline_error)?;
        Ok(resolve(&self.books, &store, candidates))
    }

    /// Collaborative book recommendations.
    ///
    /// A user outside the interaction matrix falls back to the book
    /// cold-start ranking (minus what they rated). A matrix too small for
    /// the configured rank is reported as `InsufficientData`.
    #[instrument(skip(self))]
    pub fn recommend_books_collaborative(
        &self,
        user_id: UserId,
        n: usize,
    ) -> Result<Vec<Recommendation<Book>>> {
        let start = Instant::now();
        let store = self.read_book_ratings()?;
        let matrix = self.interaction_matrix(&store)?;

        if matrix.row_of(user_id).is_none() {
            info!("User {} not in interaction matrix, falling back to cold start", user_id);
            let rated = store.rated_items(user_id);
            let candidates = self.book_cold_start.get_candidates(&store, &rated, n);
            return Ok(resolve(&self.books, &store, candidates));
        }

        let context =
            build_user_context(&self.books, &store, user_id, self.config.book_like_threshold);
        let candidates = self.book_collaborative.get_candidates(&matrix, &context, n)?;

        let recommendations = resolve(&self.books, &store, candidates);
        info!(
            "Recommended {} books collaboratively for user {} in {:.2?}",
            recommendations.len(),
            user_id,
            start.elapsed()
        );
        Ok(recommendations)
    }

    /// The cached interaction matrix, rebuilt if the store has moved on.
    ///
    /// The caller holds the store's read lock, so the version cannot change
    /// underneath the rebuild.
    fn interaction_matrix(
        &self,
        store: &RatingStore<Isbn>,
    ) -> Result<Arc<InteractionMatrix<Isbn>>> {
        let mut cache = self
            .matrix_cache
            .lock()
            .map_err(|e| EngineError::Poisoned(e.to_string()))?;

        if let Some(matrix) = cache.as_ref() {
            if matrix.version() == store.version() {
                return Ok(matrix.clone());
            }
        }

        let matrix = Arc::new(InteractionMatrix::build(
            store,
            self.config.cf_min_user_ratings,
            self.config.cf_min_item_ratings,
        ));
        debug!(
            "Rebuilt interaction matrix {:?} at store version {}",
            matrix.shape(),
            matrix.version()
        );
        *cache = Some(matrix.clone());
        Ok(matrix)
    }

    // -------------------------------------------------------------------------
    // Movies with books
    // -------------------------------------------------------------------------

    /// Movies for a user, each with books to go with it.
    ///
    /// ## Algorithm
    /// 1. Pick movies: cold start without history, content path otherwise
    /// 2. For each movie, in rank order, pick `books_per_movie` books:
    ///    top-rated books for cold start, cross-domain matches otherwise.
    ///    Books the user rated or an earlier movie received are skipped.
    /// 3. Build explanation facts for every pair
    /// 4. Release the stores, then ask the provider (if any) for text
    #[instrument(skip(self))]
    pub fn recommend_with_books(&self, user_id: UserId, n: usize) -> Result<Vec<MovieBookPair>> {
        let start = Instant::now();
        let per_movie = self.config.books_per_movie;

        let (resolved, facts, cold_start) = {
            let movie_store = self.read_movie_ratings()?;
            let book_store = self.read_book_ratings()?;

            let context = build_user_context(
                &self.movies,
                &movie_store,
                user_id,
                self.config.movie_like_threshold,
            );
            let cold_start = !context.has_history();
            let rated_books = book_store.rated_items(user_id);
            let mut already_recommended: HashSet<Isbn> = HashSet::new();

            let movies = if cold_start {
                self.movie_cold_start
                    .get_candidates(&movie_store, &context.rated_items, n)
            } else {
                self.movie_content.get_candidates(&context, n)
            };

            let mut pairs: Vec<(Candidate<MovieId>, Vec<Candidate<Isbn>>)> =
                Vec::with_capacity(movies.len());
            for movie in movies {
                let Some(record) = self.movies.get(&movie.item_id) else {
                    continue;
                };
                let books = if cold_start {
                    let exclude: HashSet<Isbn> =
                        rated_books.union(&already_recommended).cloned().collect();
                    self.book_cold_start
                        .get_candidates(&book_store, &exclude, per_movie)
                } else {
                    self.book_matcher
                        .find_matches(
                            &record.genres,
                            &book_store,
                            &rated_books,
                            &already_recommended,
                            per_movie,
                        )
                        .map_err(pipeline_error)?
                };
                already_recommended.extend(books.iter().map(|c| c.item_id.clone()));
                pairs.push((movie, books));
            }

            let vocabulary = self.movies.vocabulary();
            let preferences = context.profile.top_categories(vocabulary, vocabulary.len());
            let facts = self
                .explainer
                .build_batch(user_id, &preferences, &pairs, cold_start);

            let resolved: Vec<(Recommendation<Movie>, Vec<Recommendation<Book>>)> = pairs
                .into_iter()
                .filter_map(|(movie, books)| {
                    let movie = resolve(&self.movies, &movie_store, vec![movie]).pop()?;
                    Some((movie, resolve(&self.books, &book_store, books)))
                })
                .collect();

            (resolved, facts, cold_start)
        };

        let result: Vec<MovieBookPair> = resolved
            .into_iter()
            .zip(facts)
            .map(|((movie, books), facts)| {
                let explanation = if cold_start {
                    Some(COLD_START_EXPLANATION.to_string())
                } else {
                    self.explain(&facts)
                };
                MovieBookPair {
                    movie,
                    books,
                    facts,
                    explanation,
                }
            })
            .collect();

        info!(
            "Built {} movie/book pairs for user {} (cold start: {}) in {:.2?}",
            result.len(),
            user_id,
            cold_start,
            start.elapsed()
        );
        Ok(result)
    }

    fn explain(&self, facts: &ExplanationFacts) -> Option<String> {
        let provider = self.provider.as_ref()?;
        match provider.explain(facts) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("Explanation provider failed for movie {}: {:#}", facts.movie.id, e);
                None
            }
        }
    }

    // -------------------------------------------------------------------------
    // Async entry point
    // -------------------------------------------------------------------------

    /// Movies and collaborative books for a user, computed in parallel.
    ///
    /// If the matrix cannot be factored the books come from the cold-start
    /// ranking instead.
    pub async fn recommend_all(
        &self,
        user_id: UserId,
        n: usize,
    ) -> anyhow::Result<(Vec<Recommendation<Movie>>, Vec<Recommendation<Book>>)> {
        let (movie_result, book_result) = tokio::join!(
            tokio::task::spawn_blocking({
                let engine = self.clone();
                move || engine.recommend(user_id, n)
            }),
            tokio::task::spawn_blocking({
                let engine = self.clone();
                move || engine.recommend_books_collaborative(user_id, n)
            })
        );

        let movies = movie_result.context("Movie task panicked")??;
        let books = match book_result.context("Book task panicked")? {
            Ok(books) => books,
            Err(EngineError::InsufficientData { rows, cols, rank }) => {
                warn!(
                    "Collaborative filter unavailable ({}x{} at rank {}), using cold start",
                    rows, cols, rank
                );
                self.book_fallback(user_id, n)?
            }
            Err(e) => return Err(e.into()),
        };
        Ok((movies, books))
    }

    fn book_fallback(&self, user_id: UserId, n: usize) -> Result<Vec<Recommendation<Book>>> {
        let store = self.read_book_ratings()?;
        let rated = store.rated_items(user_id);
        let candidates = self.book_cold_start.get_candidates(&store, &rated, n);
        Ok(resolve(&self.books, &store, candidates))
    }
}

fn pipeline_error(err: anyhow::Error) -> EngineError {
    EngineError::Pipeline(format!("{err:#}"))
}

/// Attach catalog records and stats to candidates, dropping unknown ids
fn resolve<T: CatalogItem>(
    catalog: &Catalog<T>,
    store: &RatingStore<T::Id>,
    candidates: Vec<Candidate<T::Id>>,
) -> Vec<Recommendation<T>> {
    candidates
        .into_iter()
        .filter_map(|candidate| {
            let item = catalog.get(&candidate.item_id)?.clone();
            let stats = store.get_stats(&candidate.item_id);
            Some(Recommendation {
                item,
                score: candidate.score,
                source: candidate.source,
                matched_tags: candidate.metadata.matched_tags,
                avg_rating: candidate.metadata.avg_rating.or(stats.map(|s| s.avg_rating)),
                num_ratings: candidate.metadata.num_ratings.or(stats.map(|s| s.num_ratings)),
            })
        })
        .collect()
}

/// Title search: exact matches first, then by average rating
fn search<T: CatalogItem>(
    catalog: &Catalog<T>,
    store: &RatingStore<T::Id>,
    query: &str,
    limit: usize,
) -> Vec<SearchResult<T>> {
    let mut hits: Vec<SearchResult<T>> = catalog
        .search_title(query)
        .into_iter()
        .map(|(item, exact)| SearchResult {
            stats: store.get_stats(item.id()).copied(),
            item: item.clone(),
            exact,
        })
        .collect();

    let avg = |hit: &SearchResult<T>| hit.stats.map_or(0.0, |s| s.avg_rating);
    hits.sort_by(|a, b| b.exact.cmp(&a.exact).then_with(|| avg(b).total_cmp(&avg(a))));
    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: MovieId, title: &str, genres: &[&str]) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            year: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn book(isbn: &str, title: &str) -> Book {
        Book {
            isbn: isbn.to_string(),
            title: title.to_string(),
            author: "Author".to_string(),
            year: None,
            publisher: String::new(),
            image_url: None,
        }
    }

    fn movie_rating(user_id: UserId, item_id: MovieId, value: f32) -> Rating<MovieId> {
        Rating {
            user_id,
            item_id,
            value,
            timestamp: 0,
        }
    }

    fn book_rating(user_id: UserId, isbn: &str, value: f32) -> Rating<Isbn> {
        Rating {
            user_id,
            item_id: isbn.to_string(),
            value,
            timestamp: 0,
        }
    }

    /// Three movies over [Action, Comedy], no ratings yet
    fn build_three_movie_engine() -> RecommendationEngine {
        let data = DataSet::from_parts(
            vec![
                movie(1, "Heat (1995)", &["Action"]),
                movie(2, "Clueless (1995)", &["Comedy"]),
                movie(3, "Rush Hour (1998)", &["Action", "Comedy"]),
            ],
            Vec::new(),
            vec![book("b1", "Action Stories")],
            Vec::new(),
        );
        RecommendationEngine::new(data, EngineConfig::default().with_movie_min_ratings(0))
    }

    /// Movies with popularity data and a small book catalog
    fn build_test_engine() -> RecommendationEngine {
        let movies = vec![
            movie(1, "Die Hard (1988)", &["Action", "Thriller"]),
            movie(2, "Airplane! (1980)", &["Comedy"]),
            movie(3, "Rush Hour (1998)", &["Action", "Comedy"]),
            movie(4, "Knives Out (2019)", &["Mystery", "Comedy"]),
            movie(5, "Speed (1994)", &["Action"]),
        ];
        let books = vec![
            book("b1", "Action Heroes"),
            book("b2", "The Comedy Club"),
            book("b3", "Action and Comedy"),
            book("b4", "Quiet Gardens"),
            book("b5", "Tea for Two"),
        ];

        let mut movie_ratings = vec![movie_rating(1, 1, 5.0), movie_rating(1, 2, 2.0)];
        // Users 10-12 rate every movie; with user 1 the averages are
        // 1: 4.25, 2: 2.75, 3: 4.5, 4: 2.0, 5: 3.5
        for user_id in 10..13 {
            for (id, value) in [(1, 4.0), (2, 3.0), (3, 4.5), (4, 2.0), (5, 3.5)] {
                movie_ratings.push(movie_rating(user_id, id, value));
            }
        }

        let mut book_ratings = vec![book_rating(1, "b1", 10.0)];
        for user_id in 100..103 {
            for (isbn, value) in [("b1", 9.0), ("b2", 7.0), ("b3", 8.0), ("b4", 6.0), ("b5", 5.0)] {
                book_ratings.push(book_rating(user_id, isbn, value));
            }
        }

        let data = DataSet::from_parts(movies, movie_ratings, books, book_ratings);
        let config = EngineConfig::default()
            .with_movie_min_ratings(3)
            .with_book_min_ratings(3)
            .with_books_per_movie(2);
        RecommendationEngine::new(data, config)
    }

    /// Users 1-4 love b1-b3, users 5-8 love b4-b6, user 9 rated b1 and b2
    fn build_collaborative_engine(rank: usize) -> RecommendationEngine {
        let books: Vec<Book> = (1..=6)
            .map(|i| book(&format!("b{i}"), &format!("Book {i}")))
            .collect();
        let mut ratings = Vec::new();
        for user_id in 1..=4 {
            for i in 1..=3 {
                ratings.push(book_rating(user_id, &format!("b{i}"), 9.0));
            }
        }
        for user_id in 5..=8 {
            for i in 4..=6 {
                ratings.push(book_rating(user_id, &format!("b{i}"), 9.0));
            }
        }
        ratings.push(book_rating(9, "b1", 9.0));
        ratings.push(book_rating(9, "b2", 9.0));

        let data = DataSet::from_parts(Vec::new(), Vec::new(), books, ratings);
        let config = EngineConfig::default()
            .with_cf_thresholds(1, 1)
            .with_latent_rank(rank)
            .with_book_min_ratings(1);
        RecommendationEngine::new(data, config)
    }

    fn movie_ids(recs: &[Recommendation<Movie>]) -> Vec<MovieId> {
        recs.iter().map(|r| r.item.id).collect()
    }

    fn book_ids(recs: &[Recommendation<Book>]) -> Vec<&str> {
        recs.iter().map(|r| r.item.isbn.as_str()).collect()
    }

    // ============================================================================
    // Movies
    // ============================================================================

    #[test]
    fn test_three_movie_scenario() {
        let engine = build_three_movie_engine();
        engine.record_rating(1, ItemRef::Movie(1), 5.0).unwrap();

        let profile = engine.user_profile(1).unwrap();
        assert_eq!(profile.values, vec![1.0, 0.0]);
        assert_eq!(profile.liked_count, 1);
        assert_eq!(profile.top_categories[0].name, "Action");

        let recs = engine.recommend(1, 2).unwrap();
        assert_eq!(movie_ids(&recs), vec![3, 2]);
        assert!(recs.iter().all(|r| r.source == CandidateSource::Content));
        assert!(recs[0].score > recs[1].score);
    }

    #[test]
    fn test_new_user_gets_cold_start() {
        let engine = build_test_engine();

        let recs = engine.recommend(999, 3).unwrap();
        let cold = engine.cold_start_movies(3).unwrap();

        assert_eq!(movie_ids(&recs), movie_ids(&cold));
        assert_eq!(movie_ids(&recs), vec![3, 1, 5]);
        assert!(recs.iter().all(|r| r.source == CandidateSource::ColdStart));
        assert_eq!(recs[0].avg_rating, Some(4.5));
    }

    #[test]
    fn test_profile_below_threshold_is_zero() {
        let engine = build_three_movie_engine();
        engine.record_rating(7, ItemRef::Movie(2), 3.0).unwrap();

        let profile = engine.user_profile(7).unwrap();
        assert_eq!(profile.values, vec![0.0, 0.0]);
        assert!(profile.top_categories.is_empty());

        // History exists, so the content path runs and yields catalog order
        let recs = engine.recommend(7, 5).unwrap();
        assert_eq!(movie_ids(&recs), vec![1, 3]);
    }

    #[test]
    fn test_half_star_history_is_never_recommended_back() {
        let data = DataSet::from_parts(
            vec![
                movie(1, "Heat (1995)", &["Action"]),
                movie(2, "Speed (1994)", &["Action"]),
                movie(3, "Clueless (1995)", &["Comedy"]),
            ],
            vec![
                movie_rating(1, 1, 0.5),
                movie_rating(1, 2, 5.0),
                movie_rating(2, 3, 0.5),
            ],
            Vec::new(),
            Vec::new(),
        );
        let engine =
            RecommendationEngine::new(data, EngineConfig::default().with_movie_min_ratings(0));

        let history = engine.history(1, Domain::Movies).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].item, ItemRef::Movie(1));
        assert_eq!(history[0].value, 0.5);

        let recs = engine.recommend(1, 10).unwrap();
        assert_eq!(movie_ids(&recs), vec![3]);

        // A user whose only rating is half a star still has history
        let recs = engine.recommend(2, 10).unwrap();
        assert_eq!(movie_ids(&recs), vec![1, 2]);
        assert!(recs.iter().all(|r| r.source == CandidateSource::Content));
    }

    // ============================================================================
    // Ratings
    // ============================================================================

    #[test]
    fn test_record_then_history_round_trip() {
        let engine = build_test_engine();

        assert_eq!(engine.record_rating(50, ItemRef::Movie(4), 3.5).unwrap(), None);
        engine.record_rating(50, ItemRef::Book("b2".to_string()), 7.0).unwrap();

        let movies = engine.history(50, Domain::Movies).unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].item, ItemRef::Movie(4));
        assert_eq!(movies[0].value, 3.5);

        let books = engine.history(50, Domain::Books).unwrap();
        assert_eq!(books[0].item, ItemRef::Book("b2".to_string()));
        assert_eq!(books[0].value, 7.0);
    }

    #[test]
    fn test_rerating_is_an_upsert() {
        let engine = build_test_engine();

        engine.record_rating(1, ItemRef::Movie(3), 2.0).unwrap();
        let previous = engine.record_rating(1, ItemRef::Movie(3), 4.0).unwrap();
        assert_eq!(previous, Some(2.0));

        let history = engine.history(1, Domain::Movies).unwrap();
        let for_movie: Vec<&HistoryEntry> =
            history.iter().filter(|h| h.item == ItemRef::Movie(3)).collect();
        assert_eq!(for_movie.len(), 1);
        assert_eq!(for_movie[0].value, 4.0);
    }

    #[test]
    fn test_invalid_ratings_rejected() {
        let engine = build_test_engine();
        let before = engine.history(1, Domain::Movies).unwrap();

        assert!(matches!(
            engine.record_rating(1, ItemRef::Movie(3), 6.0),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            engine.record_rating(1, ItemRef::Movie(3), 0.5),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            engine.record_rating_str(1, ItemRef::Movie(3), "great"),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            engine.record_rating(1, ItemRef::Book("b2".to_string()), 7.5),
            Err(EngineError::Validation(_))
        ));
        assert!(matches!(
            engine.record_rating(1, ItemRef::Movie(404), 4.0),
            Err(EngineError::UnknownItem(ItemRef::Movie(404)))
        ));

        assert_eq!(engine.history(1, Domain::Movies).unwrap(), before);
    }

    #[test]
    fn test_record_rating_str() {
        let engine = build_test_engine();
        engine.record_rating_str(60, ItemRef::Book("b4".to_string()), " 9 ").unwrap();
        assert_eq!(engine.history(60, Domain::Books).unwrap()[0].value, 9.0);
    }

    #[test]
    fn test_next_user_id() {
        let engine = build_test_engine();
        assert_eq!(engine.next_user_id().unwrap(), 103);

        let empty = RecommendationEngine::new(
            DataSet::from_parts(Vec::new(), Vec::new(), Vec::new(), Vec::new()),
            EngineConfig::default(),
        );
        assert_eq!(empty.next_user_id().unwrap(), 1);
    }

    // ============================================================================
    // Movies with books
    // ============================================================================

    #[test]
    fn test_pairs_never_repeat_books() {
        let engine = build_test_engine();
        let pairs = engine.recommend_with_books(1, 3).unwrap();

        assert_eq!(pairs.len(), 3);
        let mut seen = HashSet::new();
        for pair in &pairs {
            assert!(!pair.facts.cold_start);
            assert_eq!(pair.facts.movie.id, pair.movie.item.id);
            assert!(pair.explanation.is_none());
            for book in &pair.books {
                assert_ne!(book.item.isbn, "b1", "b1 was rated by the user");
                assert!(seen.insert(book.item.isbn.clone()), "book repeated in batch");
            }
        }
        // Profile is Action + Thriller: Speed, then Rush Hour, then Knives Out
        let ids: Vec<MovieId> = pairs.iter().map(|p| p.movie.item.id).collect();
        assert_eq!(ids, vec![5, 3, 4]);
        assert_eq!(book_ids(&pairs[0].books), vec!["b3"]);
        assert_eq!(book_ids(&pairs[1].books), vec!["b2"]);
        // Nothing fresh mentions Mystery or Comedy, so popularity fills in
        assert_eq!(book_ids(&pairs[2].books), vec!["b4", "b5"]);
        assert_eq!(pairs[2].books[0].source, CandidateSource::PopularityFallback);
    }

    #[test]
    fn test_cold_start_pairs() {
        let engine = build_test_engine();
        let pairs = engine.recommend_with_books(500, 2).unwrap();

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].movie.item.id, 3);
        assert_eq!(book_ids(&pairs[0].books), vec!["b1", "b3"]);
        assert_eq!(book_ids(&pairs[1].books), vec!["b2", "b4"]);
        assert!(pairs.iter().all(|p| p.facts.cold_start));
        assert_eq!(pairs[0].explanation.as_deref(), Some(COLD_START_EXPLANATION));
    }

    #[test]
    fn test_provider_failure_keeps_recommendations() {
        let engine = build_test_engine().with_explanation_provider(
            |_: &ExplanationFacts| -> anyhow::Result<String> { anyhow::bail!("service down") },
        );
        let pairs = engine.recommend_with_books(1, 2).unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs.iter().all(|p| p.explanation.is_none()));
    }

    #[test]
    fn test_provider_text_attached() {
        let engine = build_test_engine().with_explanation_provider(
            |facts: &ExplanationFacts| -> anyhow::Result<String> {
                Ok(format!("Because you like {}", facts.preferences[0].name))
            },
        );
        let pairs = engine.recommend_with_books(1, 1).unwrap();
        assert_eq!(pairs[0].explanation.as_deref(), Some("Because you like Action"));
    }

    #[test]
    fn test_cross_domain_match_falls_back() {
        let engine = build_test_engine();
        let exclude: HashSet<Isbn> = ["b3".to_string()].into_iter().collect();

        let recs = engine
            .cross_domain_match(&["Mystery".to_string()], &exclude, 2)
            .unwrap();
        assert_eq!(book_ids(&recs), vec!["b1", "b2"]);
        assert!(recs.iter().all(|r| r.source == CandidateSource::PopularityFallback));
    }

    // ============================================================================
    // Collaborative
    // ============================================================================

    #[test]
    fn test_collaborative_skips_rated() {
        let engine = build_collaborative_engine(2);
        let recs = engine.recommend_books_collaborative(9, 3).unwrap();

        assert!(!recs.is_empty());
        assert_eq!(recs[0].item.isbn, "b3");
        assert!(recs.iter().all(|r| r.item.isbn != "b1" && r.item.isbn != "b2"));
        assert!(recs.iter().all(|r| r.source == CandidateSource::Collaborative));
    }

    #[test]
    fn test_unknown_user_falls_back_to_cold_start() {
        let engine = build_collaborative_engine(2);
        let recs = engine.recommend_books_collaborative(77, 2).unwrap();
        let cold = engine.cold_start_books(2).unwrap();

        assert_eq!(book_ids(&recs), book_ids(&cold));
        assert!(recs.iter().all(|r| r.source == CandidateSource::ColdStart));
    }

    #[test]
    fn test_new_rating_invalidates_matrix() {
        let engine = build_collaborative_engine(2);

        let before = engine.recommend_books_collaborative(77, 2).unwrap();
        assert!(before.iter().all(|r| r.source == CandidateSource::ColdStart));

        engine.record_rating(77, ItemRef::Book("b4".to_string()), 9.0).unwrap();
        let after = engine.recommend_books_collaborative(77, 2).unwrap();
        assert!(after.iter().all(|r| r.source == CandidateSource::Collaborative));
        assert!(after.iter().all(|r| r.item.isbn != "b4"));
    }

    #[test]
    fn test_rank_too_large_is_insufficient_data() {
        let engine = build_collaborative_engine(50);
        let result = engine.recommend_books_collaborative(9, 3);
        assert!(matches!(result, Err(EngineError::InsufficientData { rank: 50, .. })));
    }

    #[tokio::test]
    async fn test_recommend_all_falls_back_on_insufficient_data() {
        let engine = build_collaborative_engine(50);
        let (movies, books) = engine.recommend_all(9, 2).await.unwrap();

        assert!(movies.is_empty());
        assert!(books.iter().all(|r| r.source == CandidateSource::ColdStart));
        assert!(books.iter().all(|r| r.item.isbn != "b1" && r.item.isbn != "b2"));
    }

    // ============================================================================
    // Search
    // ============================================================================

    #[test]
    fn test_search_exact_first_then_by_rating() {
        let engine = build_test_engine();

        let hits = engine.search_books("action", 10).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.item.isbn.as_str()).collect();
        // b1 averages 9.25, b3 averages 8.0
        assert_eq!(ids, vec!["b1", "b3"]);

        let hits = engine.search_movies("speed (1994)", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].exact);
    }
}
