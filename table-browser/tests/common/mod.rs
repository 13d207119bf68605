//! Shared fixtures: a directory with a seeded `shop.db` and an empty `void.db`

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::Path;
use tempfile::TempDir;

pub const USER_COUNT: i64 = 45;

pub async fn seeded_directory() -> TempDir {
    let directory = tempfile::tempdir().unwrap();
    seed_shop(directory.path()).await;
    create_empty(directory.path()).await;
    directory
}

async fn open(path: &Path) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    SqlitePool::connect_with(options).await.unwrap()
}

async fn seed_shop(directory: &Path) {
    let pool = open(&directory.join("shop.db")).await;

    sqlx::query(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER NOT NULL, city TEXT)",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("CREATE TABLE audit_log (id INTEGER PRIMARY KEY, message TEXT)")
        .execute(&pool)
        .await
        .unwrap();

    let names = ["Alice", "Bob", "Carla", "Dalia", "Eve", "Frank", "Gwen", "Hal", "Ivy"];
    let cities = ["Berlin", "Lisbon", "Oslo"];
    for id in 1..=USER_COUNT {
        let index = (id - 1) as usize;
        sqlx::query("INSERT INTO users (id, name, age, city) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(format!("{} {}", names[index % names.len()], id))
            .bind(18 + id)
            .bind(cities[index % cities.len()])
            .execute(&pool)
            .await
            .unwrap();
    }

    pool.close().await;
}

async fn create_empty(directory: &Path) {
    let pool = open(&directory.join("void.db")).await;
    sqlx::query("CREATE TABLE empty_things (id INTEGER PRIMARY KEY)")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;
}
