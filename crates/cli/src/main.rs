use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{Domain, Isbn, ItemRef, MovieId, UserId};
use rand::Rng;
use server::{EngineConfig, MovieBookPair, PromptEcho, Recommendation, RecommendationEngine};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Reel Reads - movie and book recommendations
#[derive(Parser)]
#[command(name = "reel-reads")]
#[command(about = "Movie recommendations with matching books", long_about = None)]
struct Cli {
    /// Directory holding the four cleaned CSV files
    #[arg(short, long, default_value = "data", env = "REEL_READS_DATA_DIR")]
    data_dir: PathBuf,

    /// Override the latent rank of the collaborative filter
    #[arg(long)]
    rank: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get movie recommendations, each with matching books
    Recommend {
        #[arg(long)]
        user_id: UserId,

        #[arg(long, default_value = "5")]
        limit: usize,

        /// Show the explanation prompt built for each pair
        #[arg(long)]
        explain: bool,
    },

    /// Show a user's profile and rating history
    User {
        #[arg(long)]
        user_id: UserId,
    },

    /// Rate a movie or a book, then show the refreshed recommendations
    Rate {
        #[arg(long)]
        user_id: UserId,

        /// Movie to rate (1.0-5.0)
        #[arg(long, conflicts_with = "isbn", required_unless_present = "isbn")]
        movie: Option<MovieId>,

        /// Book to rate (whole number 1-10)
        #[arg(long)]
        isbn: Option<Isbn>,

        /// Rating value
        #[arg(long)]
        value: String,
    },

    /// Collaborative book recommendations
    Books {
        #[arg(long)]
        user_id: UserId,

        #[arg(long, default_value = "10")]
        limit: usize,
    },

    /// Find books for a set of genre tags
    Match {
        /// Genre tags, e.g. --tag Mystery --tag Crime
        #[arg(long = "tag", required = true)]
        tags: Vec<String>,

        #[arg(long, default_value = "3")]
        limit: usize,
    },

    /// Search titles (case-insensitive substring match)
    Search {
        #[arg(long)]
        title: String,

        /// Search books instead of movies
        #[arg(long)]
        books: bool,
    },

    /// Print the id a brand-new user would get
    NewUser,

    /// Run benchmark to test performance
    Benchmark {
        /// Number of requests to make
        #[arg(long, default_value = "100")]
        requests: usize,

        /// Number of concurrent requests
        #[arg(long, default_value = "10")]
        concurrent: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = EngineConfig::from_env()?;
    if let Some(rank) = cli.rank {
        config = config.with_latent_rank(rank);
    }
    debug!("Engine config: {:?}", config);

    // Load datasets (this may take a moment)
    println!("Loading datasets from {}...", cli.data_dir.display());
    let start = Instant::now();
    let data_dir = cli.data_dir.clone();
    let engine = tokio::task::spawn_blocking(move || RecommendationEngine::load(&data_dir, config))
        .await
        .context("Loader task panicked")?
        .context("Failed to load datasets")?;
    println!("{} Loaded datasets in {:?}", "✓".green(), start.elapsed());

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Recommend {
            user_id,
            limit,
            explain,
        } => handle_recommend(engine, user_id, limit, explain).await?,
        Commands::User { user_id } => handle_user(&engine, user_id)?,
        Commands::Rate {
            user_id,
            movie,
            isbn,
            value,
        } => handle_rate(&engine, user_id, movie, isbn, &value)?,
        Commands::Books { user_id, limit } => handle_books(&engine, user_id, limit)?,
        Commands::Match { tags, limit } => handle_match(&engine, &tags, limit)?,
        Commands::Search { title, books } => handle_search(&engine, &title, books)?,
        Commands::NewUser => {
            println!("New user id: {}", engine.next_user_id()?.to_string().bold());
        }
        Commands::Benchmark {
            requests,
            concurrent,
        } => handle_benchmark(engine, requests, concurrent).await?,
    }

    Ok(())
}

/// Handle the 'recommend' command
async fn handle_recommend(
    engine: RecommendationEngine,
    user_id: UserId,
    limit: usize,
    explain: bool,
) -> Result<()> {
    let engine = if explain {
        engine.with_explanation_provider(PromptEcho)
    } else {
        engine
    };

    let pairs = tokio::task::spawn_blocking(move || engine.recommend_with_books(user_id, limit))
        .await
        .context("Recommendation task panicked")??;

    if pairs.first().is_some_and(|p| p.facts.cold_start) {
        println!(
            "{}",
            "You are a new user! Here are some highly rated movies and books to get you started."
                .yellow()
        );
    }
    print_pairs(&pairs);
    Ok(())
}

/// Handle the 'user' command
fn handle_user(engine: &RecommendationEngine, user_id: UserId) -> Result<()> {
    let profile = engine.user_profile(user_id)?;
    let movie_history = engine.history(user_id, Domain::Movies)?;
    let book_history = engine.history(user_id, Domain::Books)?;

    println!("{}", format!("User ID: {}", user_id).bold().blue());
    println!("{}Movie ratings: {}", "• ".cyan(), movie_history.len());
    println!("{}Book ratings: {}", "• ".cyan(), book_history.len());
    println!("{}Liked movies in profile: {}", "• ".cyan(), profile.liked_count);

    println!("Genre preferences:");
    for category in profile.top_categories.iter().take(5) {
        println!("  - {}: {:.2}", category.name, category.weight);
    }

    println!("Recent movie ratings:");
    for entry in movie_history.iter().rev().take(10) {
        if let ItemRef::Movie(id) = &entry.item {
            let title = engine.movies().get(id).map_or("<unknown>", |m| m.title.as_str());
            println!("  - {} (Rating: {})", title, entry.value);
        }
    }

    println!("Recent book ratings:");
    for entry in book_history.iter().rev().take(10) {
        if let ItemRef::Book(isbn) = &entry.item {
            let title = engine.books().get(isbn).map_or("<unknown>", |b| b.title.as_str());
            println!("  - {} (Rating: {})", title, entry.value);
        }
    }
    Ok(())
}

/// Handle the 'rate' command
fn handle_rate(
    engine: &RecommendationEngine,
    user_id: UserId,
    movie: Option<MovieId>,
    isbn: Option<Isbn>,
    value: &str,
) -> Result<()> {
    let item = match (movie, isbn) {
        (Some(id), None) => ItemRef::Movie(id),
        (None, Some(isbn)) => ItemRef::Book(isbn),
        _ => bail!("Pass exactly one of --movie or --isbn"),
    };

    let previous = engine.record_rating_str(user_id, item.clone(), value)?;
    match previous {
        Some(old) => println!("{} Updated {} (was {})", "✓".green(), item, old),
        None => println!("{} Rated {}", "✓".green(), item),
    }

    let pairs = engine.recommend_with_books(user_id, 5)?;
    print_pairs(&pairs);
    Ok(())
}

/// Handle the 'books' command
fn handle_books(engine: &RecommendationEngine, user_id: UserId, limit: usize) -> Result<()> {
    let books = match engine.recommend_books_collaborative(user_id, limit) {
        Ok(books) => books,
        Err(server::EngineError::InsufficientData { rows, cols, rank }) => {
            warn!("Cannot factor {}x{} matrix at rank {}", rows, cols, rank);
            println!(
                "{}",
                "Not enough rating data for collaborative picks, showing top-rated books".yellow()
            );
            engine.cold_start_books(limit)?
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", "Book Recommendations:".bold().blue());
    print_books(&books, "");
    Ok(())
}

/// Handle the 'match' command
fn handle_match(engine: &RecommendationEngine, tags: &[String], limit: usize) -> Result<()> {
    let books = engine.cross_domain_match(tags, &HashSet::new(), limit)?;
    println!("{}", format!("Books for {}:", tags.join(", ")).bold().blue());
    print_books(&books, "");
    Ok(())
}

/// Handle the 'search' command
fn handle_search(engine: &RecommendationEngine, title: &str, books: bool) -> Result<()> {
    println!("{}", format!("Search results for '{}':", title).bold().blue());

    let stats_line = |stats: Option<data_loader::ItemStats>| {
        stats.map_or("unrated".to_string(), |s| {
            format!("avg {:.2} ({} ratings)", s.avg_rating, s.num_ratings)
        })
    };

    if books {
        for hit in engine.search_books(title, 20)? {
            println!(
                "{}: {} by {} {}",
                hit.item.isbn,
                hit.item.title,
                hit.item.author,
                stats_line(hit.stats)
            );
        }
    } else {
        for hit in engine.search_movies(title, 20)? {
            println!(
                "{}: {} [{}] {}",
                hit.item.id,
                hit.item.title,
                hit.item.genres.join(", "),
                stats_line(hit.stats)
            );
        }
    }
    Ok(())
}

/// Handle the 'benchmark' command
async fn handle_benchmark(
    engine: RecommendationEngine,
    requests: usize,
    concurrent: usize,
) -> Result<()> {
    if requests == 0 {
        bail!("--requests must be at least 1");
    }

    // Random user ids over the known id range, so some are cold starts
    let max_user = engine.next_user_id()?.max(2) - 1;
    let user_ids: Vec<UserId> = {
        let mut rng = rand::rng();
        (0..requests).map(|_| rng.random_range(1..=max_user)).collect()
    };

    let permits = Arc::new(Semaphore::new(concurrent.max(1)));
    let started = Instant::now();
    let mut handles = vec![];
    for user in user_ids {
        let engine = engine.clone();
        let permits = permits.clone();
        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let start = Instant::now();
            tokio::task::spawn_blocking(move || engine.recommend_with_books(user, 5)).await??;
            Ok::<_, anyhow::Error>(start.elapsed())
        });
        handles.push(handle);
    }

    // Wait for all tasks to complete and collect timings
    let mut timings: Vec<Duration> = vec![];
    for handle in handles {
        timings.push(handle.await??);
    }
    let wall_time = started.elapsed();

    let total: Duration = timings.iter().sum();
    let avg_latency = total / timings.len() as u32;
    timings.sort();
    let percentile = |p: f32| timings[((timings.len() as f32 * p) as usize).min(timings.len() - 1)];

    println!("{}", "Benchmark results:".bold().blue());
    println!("Wall time: {:?}", wall_time);
    println!("Average latency: {:?}", avg_latency);
    println!("P50 latency: {:?}", percentile(0.50));
    println!("P95 latency: {:?}", percentile(0.95));
    println!("P99 latency: {:?}", percentile(0.99));
    println!(
        "Throughput: {:.2} requests/second",
        requests as f32 / wall_time.as_secs_f32()
    );

    Ok(())
}

/// Helper function to format and print movie + book pairs
fn print_pairs(pairs: &[MovieBookPair]) {
    println!("{}", "Movie Recommendations:".bold().blue());
    for (i, pair) in pairs.iter().enumerate() {
        let movie = &pair.movie;
        println!(
            "{}. {} [{}] - Score: {:.2} ({})",
            (i + 1).to_string().green(),
            movie.item.title,
            movie.item.genres.join(", "),
            movie.score,
            movie.source
        );
        print_books(&pair.books, "   ");
        if let Some(text) = &pair.explanation {
            for line in text.lines() {
                println!("   {}", line.dimmed());
            }
        }
    }
}

fn print_books(books: &[Recommendation<data_loader::Book>], indent: &str) {
    for book in books {
        let tags = if book.matched_tags.is_empty() {
            String::new()
        } else {
            format!(" matched {}", book.matched_tags.join("/"))
        };
        println!(
            "{}{} {} by {} - avg {:.2} ({} ratings) [{}{}]",
            indent,
            "📖".cyan(),
            book.item.title,
            book.item.author,
            book.avg_rating.unwrap_or(0.0),
            book.num_ratings.unwrap_or(0),
            book.source,
            tags
        );
    }
}
