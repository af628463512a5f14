//! Benchmarks for live view maintenance.
//!
//! Run with: cargo bench -p rdb-database

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rdb_core::schema::Schema;
use rdb_core::{DataType, Value};
use rdb_database::{Database, Query, SortOrder};
use rdb_storage::{ColumnInput, Table};

fn create_tables() -> (Database, Table, Table) {
    let db = Database::new();
    let users = db
        .create_table(
            "Users",
            Schema::builder()
                .add_column("name", DataType::String)
                .unwrap()
                .add_column("score", DataType::Int64)
                .unwrap()
                .build(),
        )
        .unwrap();
    let posts = db
        .create_table(
            "Posts",
            Schema::builder()
                .add_column("title", DataType::String)
                .unwrap()
                .add_ref("author", "Users")
                .unwrap()
                .build(),
        )
        .unwrap();
    (db, users, posts)
}

fn populate_users(users: &Table, count: u64) {
    for i in 0..count {
        users
            .insert(
                format!("u{}", i),
                [
                    ("name", Value::String(format!("User {}", i))),
                    ("score", Value::Int64(((i * 7919) % 1000) as i64)),
                ],
            )
            .unwrap();
    }
}

/// Benchmark: inserting rows under a sorted view vs. no view.
fn view_insert_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("view_insert");

    for count in [100u64, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("no_view", count), count, |b, &count| {
            b.iter_batched(
                create_tables,
                |(db, users, _)| {
                    populate_users(&users, count);
                    black_box(db)
                },
                criterion::BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("sorted_view", count), count, |b, &count| {
            b.iter_batched(
                || {
                    let (db, users, posts) = create_tables();
                    let view = db
                        .view("Users")
                        .unwrap()
                        .sort_by("score", SortOrder::Asc)
                        .build()
                        .unwrap();
                    (db, users, posts, view)
                },
                |(db, users, _, view)| {
                    populate_users(&users, count);
                    black_box((db, view))
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark: updating the sort key of rows in a sorted view.
fn view_sort_update_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("view_sort_update");

    for count in [100u64, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("updates", count), count, |b, &count| {
            b.iter_batched(
                || {
                    let (db, users, _) = create_tables();
                    populate_users(&users, count);
                    let view = db
                        .view("Users")
                        .unwrap()
                        .sort_by("score", SortOrder::Desc)
                        .build()
                        .unwrap();
                    (db, users, view)
                },
                |(db, users, view)| {
                    for (i, row) in users.rows().iter().enumerate().take(100) {
                        row.set("score", Value::Int64((i as i64 * 31) % 1000)).unwrap();
                    }
                    black_box((db, view))
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark: maintaining a reverse join while posts are inserted.
fn reverse_join_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse_join");

    for count in [10u64, 100].iter() {
        group.bench_with_input(BenchmarkId::new("post_inserts", count), count, |b, &count| {
            b.iter_batched(
                || {
                    let (db, users, posts) = create_tables();
                    populate_users(&users, count);
                    let view = db
                        .view("Users")
                        .unwrap()
                        .select("name")
                        .select(Query::reverse("author", "Posts", ["title"]))
                        .build()
                        .unwrap();
                    (db, users, posts, view)
                },
                |(db, users, posts, view)| {
                    for (i, author) in users.rows().iter().enumerate() {
                        posts
                            .insert(
                                format!("p{}", i),
                                [
                                    ("title", ColumnInput::from(format!("Post {}", i))),
                                    ("author", ColumnInput::from(author)),
                                ],
                            )
                            .unwrap();
                    }
                    black_box((db, view))
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    view_insert_benchmark,
    view_sort_update_benchmark,
    reverse_join_benchmark
);
criterion_main!(benches);
