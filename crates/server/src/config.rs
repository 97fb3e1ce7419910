//! Engine configuration.
//!
//! Every knob has a default matching the behavior of the deployed app, so
//! `EngineConfig::default()` is a complete configuration. Values can be
//! overridden from the environment with the `REEL_READS_` prefix, e.g.
//! `REEL_READS_LATENT_RANK=10`, or set in code with the `with_*` builders.

use serde::Deserialize;
use sources::TruncatedSvd;

/// Environment variable prefix for [`EngineConfig::from_env`]
pub const ENV_PREFIX: &str = "REEL_READS_";

/// Tunables for the recommendation engine
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Movies rated at or above this build the content profile
    #[serde(default = "default_movie_like_threshold")]
    pub movie_like_threshold: f32,

    /// Books rated at or above this count as liked (10-point scale)
    #[serde(default = "default_book_like_threshold")]
    pub book_like_threshold: f32,

    /// Minimum ratings for a movie to appear in cold-start rankings
    #[serde(default = "default_movie_min_ratings")]
    pub movie_min_ratings: u32,

    /// Minimum ratings for a book in cold-start and cross-domain results
    #[serde(default = "default_book_min_ratings")]
    pub book_min_ratings: u32,

    /// Books attached to each recommended movie
    #[serde(default = "default_books_per_movie")]
    pub books_per_movie: usize,

    /// Users need this many book ratings to enter the interaction matrix
    #[serde(default = "default_cf_min_user_ratings")]
    pub cf_min_user_ratings: usize,

    /// Books need this many ratings to enter the interaction matrix
    #[serde(default = "default_cf_min_item_ratings")]
    pub cf_min_item_ratings: usize,

    /// Latent rank k of the truncated SVD
    #[serde(default = "default_latent_rank")]
    pub latent_rank: usize,

    #[serde(default = "default_svd_oversamples")]
    pub svd_oversamples: usize,

    #[serde(default = "default_svd_power_iterations")]
    pub svd_power_iterations: usize,

    #[serde(default = "default_svd_seed")]
    pub svd_seed: u64,
}

fn default_movie_like_threshold() -> f32 {
    4.0
}

fn default_book_like_threshold() -> f32 {
    8.0
}

fn default_movie_min_ratings() -> u32 {
    1000
}

fn default_book_min_ratings() -> u32 {
    50
}

fn default_books_per_movie() -> usize {
    3
}

fn default_cf_min_user_ratings() -> usize {
    10
}

fn default_cf_min_item_ratings() -> usize {
    10
}

fn default_latent_rank() -> usize {
    20
}

fn default_svd_oversamples() -> usize {
    10
}

fn default_svd_power_iterations() -> usize {
    5
}

fn default_svd_seed() -> u64 {
    42
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            movie_like_threshold: default_movie_like_threshold(),
            book_like_threshold: default_book_like_threshold(),
            movie_min_ratings: default_movie_min_ratings(),
            book_min_ratings: default_book_min_ratings(),
            books_per_movie: default_books_per_movie(),
            cf_min_user_ratings: default_cf_min_user_ratings(),
            cf_min_item_ratings: default_cf_min_item_ratings(),
            latent_rank: default_latent_rank(),
            svd_oversamples: default_svd_oversamples(),
            svd_power_iterations: default_svd_power_iterations(),
            svd_seed: default_svd_seed(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from `REEL_READS_*` environment variables,
    /// reading a `.env` file first if one exists
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn with_movie_like_threshold(mut self, threshold: f32) -> Self {
        self.movie_like_threshold = threshold;
        self
    }

    pub fn with_book_like_threshold(mut self, threshold: f32) -> Self {
        self.book_like_threshold = threshold;
        self
    }

    pub fn with_movie_min_ratings(mut self, count: u32) -> Self {
        self.movie_min_ratings = count;
        self
    }

    pub fn with_book_min_ratings(mut self, count: u32) -> Self {
        self.book_min_ratings = count;
        self
    }

    pub fn with_books_per_movie(mut self, count: usize) -> Self {
        self.books_per_movie = count;
        self
    }

    /// Activity thresholds for entering the interaction matrix
    pub fn with_cf_thresholds(mut self, min_user_ratings: usize, min_item_ratings: usize) -> Self {
        self.cf_min_user_ratings = min_user_ratings;
        self.cf_min_item_ratings = min_item_ratings;
        self
    }

    pub fn with_latent_rank(mut self, rank: usize) -> Self {
        self.latent_rank = rank;
        self
    }

    pub fn with_svd_seed(mut self, seed: u64) -> Self {
        self.svd_seed = seed;
        self
    }

    /// Factorization settings derived from this config
    pub fn svd(&self) -> TruncatedSvd {
        TruncatedSvd::new(self.latent_rank)
            .with_oversamples(self.svd_oversamples)
            .with_power_iterations(self.svd_power_iterations)
            .with_seed(self.svd_seed)
    }
}
