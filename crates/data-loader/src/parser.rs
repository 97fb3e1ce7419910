//! Parsers for the cleaned CSV files.
//!
//! The files are written by a pandas-based preparation step, which leaves a
//! few quirks behind:
//! - movies_cleaned.csv: `movieId,title,genres,...` with pipe-separated genres
//! - ratings_cleaned.csv: `userId,movieId,rating,timestamp`, where the
//!   timestamp may be unix seconds or a `YYYY-MM-DD HH:MM:SS` datetime
//! - books_cleaned.csv: `ISBN,Book-Title,Book-Author,Year-Of-Publication,...`
//! - book_ratings_cleaned.csv: `User-ID,ISBN,Book-Rating`, where numeric
//!   columns may be written as floats ("276725.0")
//!
//! Every parser is generic over `Read` so tests can feed byte slices; the
//! `parse_*` functions are thin wrappers that open a path.
//!
//! Rust concepts you'll see here:
//! - `serde::Deserialize` records with renamed columns
//! - Generic functions over `std::io::Read`
//! - Mapping foreign errors into the crate error with `map_err`

use crate::error::{DataLoadError, Result};
use crate::types::{Book, Isbn, Movie, MovieId, Rating};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct MovieRecord {
    #[serde(rename = "movieId")]
    movie_id: String,
    title: String,
    #[serde(default)]
    genres: String,
}

#[derive(Debug, Deserialize)]
struct MovieRatingRecord {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "movieId")]
    movie_id: String,
    rating: f32,
    #[serde(default)]
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct BookRecord {
    #[serde(rename = "ISBN")]
    isbn: String,
    #[serde(rename = "Book-Title")]
    title: String,
    #[serde(rename = "Book-Author", default)]
    author: String,
    #[serde(rename = "Year-Of-Publication", default)]
    year: String,
    #[serde(rename = "Publisher", default)]
    publisher: String,
    #[serde(rename = "Image-URL-M", default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BookRatingRecord {
    #[serde(rename = "User-ID")]
    user_id: String,
    #[serde(rename = "ISBN")]
    isbn: String,
    #[serde(rename = "Book-Rating")]
    rating: f32,
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|_| DataLoadError::FileNotFound {
        path: path.display().to_string(),
    })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Parse movies_cleaned.csv
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    read_movies(open(path)?, "movies_cleaned.csv")
}

/// Parse movie rows from any reader.
///
/// The title often includes the year in parentheses: "Toy Story (1995)".
/// Genres are pipe-separated: "Adventure|Animation|Children".
pub fn read_movies<R: Read>(reader: R, file: &str) -> Result<Vec<Movie>> {
    let mut movies = Vec::new();
    for (idx, record) in csv_reader(reader).deserialize::<MovieRecord>().enumerate() {
        let line_no = idx + 2;
        let record = record.map_err(|e| DataLoadError::from_csv(file, e))?;

        let movie = Movie {
            id: parse_id(&record.movie_id).ok_or_else(|| DataLoadError::ParseError {
                file: file.to_string(),
                line: line_no,
                reason: format!("Invalid movieId: {}", record.movie_id),
            })?,
            year: extract_year_from_title(&record.title),
            genres: parse_genres(&record.genres),
            title: record.title,
        };
        movies.push(movie);
    }
    Ok(movies)
}

/// Parse ratings_cleaned.csv
pub fn parse_movie_ratings(path: &Path) -> Result<Vec<Rating<MovieId>>> {
    read_movie_ratings(open(path)?, "ratings_cleaned.csv")
}

pub fn read_movie_ratings<R: Read>(reader: R, file: &str) -> Result<Vec<Rating<MovieId>>> {
    let mut ratings = Vec::new();
    for (idx, record) in csv_reader(reader)
        .deserialize::<MovieRatingRecord>()
        .enumerate()
    {
        let line_no = idx + 2;
        let record = record.map_err(|e| DataLoadError::from_csv(file, e))?;
        let parse_error = |reason: String| DataLoadError::ParseError {
            file: file.to_string(),
            line: line_no,
            reason,
        };

        let rating = Rating {
            user_id: parse_id(&record.user_id)
                .ok_or_else(|| parse_error(format!("Invalid userId: {}", record.user_id)))?,
            item_id: parse_id(&record.movie_id)
                .ok_or_else(|| parse_error(format!("Invalid movieId: {}", record.movie_id)))?,
            value: record.rating,
            timestamp: parse_timestamp(&record.timestamp)
                .ok_or_else(|| parse_error(format!("Invalid timestamp: {}", record.timestamp)))?,
        };
        ratings.push(rating);
    }
    Ok(ratings)
}

/// Parse books_cleaned.csv
pub fn parse_books(path: &Path) -> Result<Vec<Book>> {
    read_books(open(path)?, "books_cleaned.csv")
}

pub fn read_books<R: Read>(reader: R, file: &str) -> Result<Vec<Book>> {
    let mut books = Vec::new();
    for record in csv_reader(reader).deserialize::<BookRecord>() {
        let record = record.map_err(|e| DataLoadError::from_csv(file, e))?;
        if record.isbn.is_empty() {
            continue;
        }
        books.push(Book {
            year: parse_id(&record.year)
                .filter(|&y| y > 0)
                .and_then(|y| u16::try_from(y).ok()),
            isbn: record.isbn,
            title: record.title,
            author: record.author,
            publisher: record.publisher,
            image_url: record.image_url.filter(|url| !url.is_empty()),
        });
    }
    Ok(books)
}

/// Parse book_ratings_cleaned.csv
pub fn parse_book_ratings(path: &Path) -> Result<Vec<Rating<Isbn>>> {
    read_book_ratings(open(path)?, "book_ratings_cleaned.csv")
}

/// Book ratings carry no timestamp; every event gets 0.
pub fn read_book_ratings<R: Read>(reader: R, file: &str) -> Result<Vec<Rating<Isbn>>> {
    let mut ratings = Vec::new();
    for (idx, record) in csv_reader(reader)
        .deserialize::<BookRatingRecord>()
        .enumerate()
    {
        let line_no = idx + 2;
        let record = record.map_err(|e| DataLoadError::from_csv(file, e))?;
        let user_id = parse_id(&record.user_id).ok_or_else(|| DataLoadError::ParseError {
            file: file.to_string(),
            line: line_no,
            reason: format!("Invalid User-ID: {}", record.user_id),
        })?;
        ratings.push(Rating {
            user_id,
            item_id: record.isbn,
            value: record.rating,
            timestamp: 0,
        });
    }
    Ok(ratings)
}

/// Parse a non-negative integer id, accepting float spellings like "42.0"
fn parse_id(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<u32>() {
        return Some(id);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.fract() == 0.0 && value >= 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

/// Parse either unix seconds or a datetime string into unix seconds.
///
/// An empty field maps to 0.
fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0);
    }
    if let Ok(secs) = raw.parse::<i64>() {
        return Some(secs);
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.and_utc().timestamp())
}

/// Extract year from movie title
///
/// Example: "Toy Story (1995)" -> Some(1995)
///          "Movie Title" -> None
fn extract_year_from_title(title: &str) -> Option<u16> {
    let start = title.rfind('(')?;
    let end = title.rfind(')')?;
    if start < end {
        title[start + 1..end].trim().parse::<u16>().ok()
    } else {
        None
    }
}

/// Split pipe-separated genres, dropping empty tokens
fn parse_genres(s: &str) -> Vec<String> {
    s.split('|')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}
