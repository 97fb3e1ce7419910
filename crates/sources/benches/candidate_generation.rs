//! Benchmarks for candidate generation
//!
//! Run with: cargo bench --package sources
//!
//! Uses a synthetic catalog so no dataset is needed.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use data_loader::{Catalog, Movie, MovieId, Rating, RatingStore};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sources::{
    CollaborativeSource, ContentSource, InteractionMatrix, PopularitySource, TruncatedSvd,
    build_user_context,
};
use std::collections::HashSet;
use std::sync::Arc;

const GENRES: &[&str] = &[
    "Action", "Adventure", "Animation", "Children", "Comedy", "Crime", "Documentary", "Drama",
    "Fantasy", "Horror", "Musical", "Mystery", "Romance", "Sci-Fi", "Thriller", "War",
];

fn synthetic_data(
    movies: u32,
    users: u32,
    per_user: usize,
) -> (Arc<Catalog<Movie>>, RatingStore<MovieId>) {
    let mut rng = StdRng::seed_from_u64(7);

    let catalog: Vec<Movie> = (1..=movies)
        .map(|id| {
            let count = rng.random_range(1..=3);
            Movie {
                id,
                title: format!("Movie {id}"),
                year: None,
                genres: (0..count)
                    .map(|_| GENRES[rng.random_range(0..GENRES.len())].to_string())
                    .collect(),
            }
        })
        .collect();

    let ratings: Vec<Rating<MovieId>> = (1..=users)
        .flat_map(|user_id| {
            (0..per_user)
                .map(|_| Rating {
                    user_id,
                    item_id: rng.random_range(1..=movies),
                    value: rng.random_range(1..=10) as f32 / 2.0,
                    timestamp: 0,
                })
                .collect::<Vec<_>>()
        })
        .collect();

    (Arc::new(Catalog::new(catalog)), RatingStore::from_ratings(ratings))
}

fn bench_content_candidates(c: &mut Criterion) {
    let (catalog, store) = synthetic_data(10_000, 500, 50);
    let source = ContentSource::new(catalog.clone());
    let context = build_user_context(&catalog, &store, 1, 4.0);

    c.bench_function("content_get_candidates", |b| {
        b.iter(|| {
            let candidates = source.get_candidates(black_box(&context), black_box(5));
            black_box(candidates)
        })
    });
}

fn bench_popularity_candidates(c: &mut Criterion) {
    let (catalog, store) = synthetic_data(10_000, 500, 50);
    let source = PopularitySource::new(catalog).with_min_rating_count(3);
    let exclude = HashSet::new();

    c.bench_function("popularity_get_candidates", |b| {
        b.iter(|| {
            let candidates =
                source.get_candidates(black_box(&store), black_box(&exclude), 5);
            black_box(candidates)
        })
    });
}

fn bench_collaborative_candidates(c: &mut Criterion) {
    let (catalog, store) = synthetic_data(2_000, 1_000, 40);
    let matrix = InteractionMatrix::build(&store, 10, 10);
    let source = CollaborativeSource::new(catalog.clone()).with_svd(TruncatedSvd::new(20));
    let user_id = matrix.user_at(0).unwrap_or(1);
    let context = build_user_context(&catalog, &store, user_id, 4.0);

    c.bench_function("collaborative_get_candidates", |b| {
        b.iter(|| {
            let candidates = source.get_candidates(black_box(&matrix), black_box(&context), 10);
            black_box(candidates)
        })
    });
}

fn bench_build_user_context(c: &mut Criterion) {
    let (catalog, store) = synthetic_data(10_000, 500, 50);

    c.bench_function("build_user_context", |b| {
        b.iter(|| {
            let context = build_user_context(&catalog, &store, black_box(1), 4.0);
            black_box(context)
        })
    });
}

criterion_group!(
    benches,
    bench_content_candidates,
    bench_popularity_candidates,
    bench_collaborative_candidates,
    bench_build_user_context
);
criterion_main!(benches);
