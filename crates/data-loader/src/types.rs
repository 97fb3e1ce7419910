//! Core domain types shared by both catalogs.
//!
//! Two catalogs live side by side: movies (MovieLens, integer ids, ratings on
//! a 1.0-5.0 scale) and books (Book-Crossing, ISBN ids, integer ratings 1-10).
//! Most of the engine is written once over the [`CatalogItem`] trait and
//! instantiated for each.
//!
//! Rust concepts demonstrated here:
//! - Type aliases for domain clarity (UserId, MovieId, Isbn)
//! - Traits with associated types and associated constants
//! - A blanket impl to give a trait alias to a bundle of bounds

use crate::catalog::Catalog;
use crate::error::{DataLoadError, Result};
use crate::store::RatingStore;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::hash::Hash;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user. The same id space is used in both domains.
pub type UserId = u32;

/// MovieLens movie identifier
pub type MovieId = u32;

/// Book-Crossing identifier
pub type Isbn = String;

/// Bounds every item identifier must satisfy to be used as a map key,
/// sorted, logged and shared across threads.
///
/// Rust concept: the blanket impl below makes this a "trait alias", so
/// `u32` and `String` qualify automatically.
pub trait ItemKey:
    Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

impl<T> ItemKey for T where
    T: Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static
{
}

// =============================================================================
// Domains
// =============================================================================

/// The two rating domains the engine serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Movies,
    Books,
}

impl Domain {
    /// Inclusive range of valid rating values
    pub fn rating_range(self) -> (f32, f32) {
        match self {
            Domain::Movies => (1.0, 5.0),
            Domain::Books => (1.0, 10.0),
        }
    }

    /// Check a rating value against this domain's scale.
    ///
    /// Movies accept any finite value in [1.0, 5.0]; books accept whole
    /// numbers in [1, 10].
    pub fn validate_rating(self, value: f32) -> Result<f32> {
        if !value.is_finite() {
            return Err(DataLoadError::ValidationError(format!(
                "{self} rating must be a finite number, got {value}"
            )));
        }
        let (min, max) = self.rating_range();
        if value < min || value > max {
            return Err(DataLoadError::ValidationError(format!(
                "{self} rating must be between {min} and {max}, got {value}"
            )));
        }
        if self == Domain::Books && value.fract() != 0.0 {
            return Err(DataLoadError::ValidationError(format!(
                "book rating must be a whole number, got {value}"
            )));
        }
        Ok(value)
    }

    /// Parse free-text rating input, then validate it.
    pub fn parse_rating(self, raw: &str) -> Result<f32> {
        let value: f32 = raw.trim().parse().map_err(|_| {
            DataLoadError::ValidationError(format!("'{}' is not a valid {self} rating", raw.trim()))
        })?;
        self.validate_rating(value)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Movies => write!(f, "movie"),
            Domain::Books => write!(f, "book"),
        }
    }
}

/// A typed reference to an item in either catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemRef {
    Movie(MovieId),
    Book(Isbn),
}

impl ItemRef {
    pub fn domain(&self) -> Domain {
        match self {
            ItemRef::Movie(_) => Domain::Movies,
            ItemRef::Book(_) => Domain::Books,
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Movie(id) => write!(f, "movie {id}"),
            ItemRef::Book(isbn) => write!(f, "book {isbn}"),
        }
    }
}

// =============================================================================
// Catalog items
// =============================================================================

/// Anything that can live in a [`Catalog`].
pub trait CatalogItem: Clone + fmt::Debug + Send + Sync + 'static {
    type Id: ItemKey;

    /// Which rating scale applies to this item type
    const DOMAIN: Domain;

    fn id(&self) -> &Self::Id;

    fn title(&self) -> &str;

    /// Free text that cross-domain category tags are matched against
    fn category_text(&self) -> Cow<'_, str>;

    /// Category tokens used for the one-hot feature vector
    fn categories(&self) -> Vec<String>;
}

/// Represents a movie in the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Year extracted from title (e.g., "Toy Story (1995)")
    pub year: Option<u16>,
    /// Genre tokens, in the order they appear in the source file
    pub genres: Vec<String>,
}

impl CatalogItem for Movie {
    type Id = MovieId;
    const DOMAIN: Domain = Domain::Movies;

    fn id(&self) -> &MovieId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn category_text(&self) -> Cow<'_, str> {
        Cow::Owned(self.genres.join("|"))
    }

    fn categories(&self) -> Vec<String> {
        self.genres.clone()
    }
}

/// Represents a book in the dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub isbn: Isbn,
    pub title: String,
    pub author: String,
    pub year: Option<u16>,
    pub publisher: String,
    pub image_url: Option<String>,
}

/// Keyword table used to give books a genre vector. Books carry no genre
/// field, so genres are inferred from words in the title.
pub const BOOK_GENRE_KEYWORDS: &[(&str, &[&str])] = &[
    ("Fiction", &["fiction", "novel", "story", "tale"]),
    ("Mystery", &["mystery", "detective", "crime", "thriller"]),
    ("Romance", &["romance", "love", "romantic"]),
    ("Science Fiction", &["science fiction", "sci-fi", "space", "future"]),
    ("Fantasy", &["fantasy", "magic", "wizard", "dragon"]),
    ("Biography", &["biography", "autobiography", "memoir"]),
    ("History", &["history", "historical", "war", "battle"]),
    ("Self-Help", &["self-help", "motivation", "success", "personal"]),
    ("Business", &["business", "management", "economics", "finance"]),
    ("Technology", &["technology", "computer", "programming", "software"]),
];

/// Genre names from [`BOOK_GENRE_KEYWORDS`], in table order
pub fn book_genre_vocabulary() -> Vec<String> {
    BOOK_GENRE_KEYWORDS
        .iter()
        .map(|(genre, _)| genre.to_string())
        .collect()
}

impl CatalogItem for Book {
    type Id = Isbn;
    const DOMAIN: Domain = Domain::Books;

    fn id(&self) -> &Isbn {
        &self.isbn
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn category_text(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.title)
    }

    fn categories(&self) -> Vec<String> {
        let title = self.title.to_lowercase();
        BOOK_GENRE_KEYWORDS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| title.contains(kw)))
            .map(|(genre, _)| genre.to_string())
            .collect()
    }
}

// =============================================================================
// Ratings and statistics
// =============================================================================

/// A single rating event from a user for an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating<K> {
    pub user_id: UserId,
    pub item_id: K,
    /// 1.0-5.0 for movies, whole numbers 1-10 for books
    pub value: f32,
    /// Unix timestamp when the rating was made
    pub timestamp: i64,
}

/// Popularity statistics for an item, derived from its ratings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemStats {
    pub avg_rating: f32,
    pub num_ratings: u32,
}

// =============================================================================
// DataSet - everything the engine loads at startup
// =============================================================================

/// Both catalogs and both rating tables.
///
/// Loading lives in `index.rs`; the engine takes ownership of the parts.
#[derive(Debug)]
pub struct DataSet {
    pub movies: Catalog<Movie>,
    pub movie_ratings: RatingStore<MovieId>,
    pub books: Catalog<Book>,
    pub book_ratings: RatingStore<Isbn>,
}
