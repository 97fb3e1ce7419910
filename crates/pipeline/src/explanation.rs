//! Structured facts behind a movie + books recommendation.
//!
//! The engine never writes prose. It hands these facts to whatever
//! explanation generator the caller plugs in, either as JSON or as a
//! ready-made prompt.

use data_loader::{Book, Catalog, Isbn, Movie, MovieId, UserId};
use rayon::prelude::*;
use serde::Serialize;
use sources::Candidate;
use std::sync::Arc;

/// One entry of the user's genre preferences
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryWeight {
    pub name: String,
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieFacts {
    pub id: MovieId,
    pub title: String,
    pub year: Option<u16>,
    pub genres: Vec<String>,
    pub score: f32,
    pub source: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookFacts {
    pub isbn: Isbn,
    pub title: String,
    pub author: String,
    pub year: Option<u16>,
    pub avg_rating: Option<f32>,
    pub num_ratings: Option<u32>,
    pub matched_tags: Vec<String>,
    pub source: &'static str,
}

/// Everything an explanation generator needs for one pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplanationFacts {
    pub user_id: UserId,
    pub cold_start: bool,
    /// Non-zero profile components, strongest first
    pub preferences: Vec<CategoryWeight>,
    pub movie: MovieFacts,
    pub books: Vec<BookFacts>,
}

impl ExplanationFacts {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Prompt text for an LLM-backed generator
    pub fn to_prompt(&self) -> String {
        let preferences = self
            .preferences
            .iter()
            .map(|p| format!("{}: {:.2}", p.name, p.weight))
            .collect::<Vec<_>>()
            .join(", ");
        let books = self
            .books
            .iter()
            .map(|b| format!("\"{}\" by {}", b.title, b.author))
            .collect::<Vec<_>>()
            .join("; ");

        format!(
            "You are a helpful recommender system. Provide a brief, friendly, and \
             well-structured explanation in Markdown (2-3 bullet points max) for why this \
             movie and these books are recommended together. Use bullet points for each reason.\n\
             User's genre preferences: {{{preferences}}}. \
             Movie: {} (Genres: {}). \
             Books: [{books}]. \
             Focus on genre, themes, and what the user might enjoy.",
            self.movie.title,
            self.movie.genres.join(", "),
        )
    }
}

/// Assembles [`ExplanationFacts`] from candidates and the two catalogs.
///
/// ## Performance Note
/// Batches are built in parallel with Rayon; order is preserved.
#[derive(Clone)]
pub struct ExplanationBuilder {
    movies: Arc<Catalog<Movie>>,
    books: Arc<Catalog<Book>>,
}

impl ExplanationBuilder {
    pub fn new(movies: Arc<Catalog<Movie>>, books: Arc<Catalog<Book>>) -> Self {
        Self { movies, books }
    }

    /// Facts for a whole batch of (movie, books) pairs, in input order.
    ///
    /// Pairs whose movie is missing from the catalog are skipped.
    pub fn build_batch(
        &self,
        user_id: UserId,
        preferences: &[(&str, f32)],
        pairs: &[(Candidate<MovieId>, Vec<Candidate<Isbn>>)],
        cold_start: bool,
    ) -> Vec<ExplanationFacts> {
        pairs
            .par_iter()
            .filter_map(|(movie, books)| self.build(user_id, preferences, movie, books, cold_start))
            .collect()
    }

    /// Facts for one pair; `None` if the movie is not in the catalog.
    /// Books missing from the catalog are left out.
    pub fn build(
        &self,
        user_id: UserId,
        preferences: &[(&str, f32)],
        movie: &Candidate<MovieId>,
        books: &[Candidate<Isbn>],
        cold_start: bool,
    ) -> Option<ExplanationFacts> {
        let record = self.movies.get(&movie.item_id)?;

        let books = books
            .iter()
            .filter_map(|candidate| {
                let book = self.books.get(&candidate.item_id)?;
                Some(BookFacts {
                    isbn: book.isbn.clone(),
                    title: book.title.clone(),
                    author: book.author.clone(),
                    year: book.year,
                    avg_rating: candidate.metadata.avg_rating,
                    num_ratings: candidate.metadata.num_ratings,
                    matched_tags: candidate.metadata.matched_tags.clone(),
                    source: candidate.source.as_str(),
                })
            })
            .collect();

        Some(ExplanationFacts {
            user_id,
            cold_start,
            preferences: preferences
                .iter()
                .map(|(name, weight)| CategoryWeight {
                    name: name.to_string(),
                    weight: *weight,
                })
                .collect(),
            movie: MovieFacts {
                id: record.id,
                title: record.title.clone(),
                year: record.year,
                genres: record.genres.clone(),
                score: movie.score,
                source: movie.source.as_str(),
            },
            books,
        })
    }
}
