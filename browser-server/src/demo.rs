//! Sample database for trying the browser without a real backend

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::info;

/// Name the demo database is listed under
pub const DEMO_DATABASE: &str = "demo";

const USER_COUNT: usize = 200;
const PRODUCT_COUNT: usize = 200;
const ORDER_COUNT: usize = 2000;

/// Create `<directory>/demo.db` with sample tables, unless it already exists
///
/// Returns the path of the database file.
pub async fn ensure_demo_database(directory: &Path) -> Result<PathBuf, sqlx::Error> {
    tokio::fs::create_dir_all(directory).await?;

    let path = directory.join(format!("{DEMO_DATABASE}.db"));
    if tokio::fs::try_exists(&path).await? {
        return Ok(path);
    }

    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;

    let result = async {
        create_tables(&pool).await?;
        seed(&pool).await
    }
    .await;
    pool.close().await;

    if let Err(error) = result {
        // Leave no half-filled file behind, it would never be reseeded
        let _ = tokio::fs::remove_file(&path).await;
        return Err(error);
    }

    info!(path = %path.display(), "Created demo database");
    Ok(path)
}

async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            is_active BOOLEAN DEFAULT true
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            price REAL NOT NULL,
            stock INTEGER DEFAULT 0,
            category TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER REFERENCES users(id),
            product_id INTEGER REFERENCES products(id),
            quantity INTEGER NOT NULL,
            total REAL NOT NULL,
            status TEXT DEFAULT 'pending',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Stays empty so the no-data path can be tried
    sqlx::query(
        r#"
        CREATE TABLE audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let first_names = [
        "Alice", "Bob", "Charlie", "Diana", "Evan", "Fiona", "George", "Hannah",
        "Isaac", "Julia", "Kevin", "Laura", "Michael", "Nancy", "Oscar", "Patricia",
    ];
    let last_names = [
        "Johnson", "Smith", "Brown", "Prince", "Davis", "Wilson", "Taylor", "Anderson",
        "Thomas", "Jackson", "White", "Harris", "Martin", "Garcia", "Lee", "Walker", "Hall",
    ];

    let mut transaction = pool.begin().await?;

    for index in 0..USER_COUNT {
        let first = first_names[index % first_names.len()];
        let last = last_names[index % last_names.len()];
        let email = format!("{}.{}{}@example.com", first.to_lowercase(), last.to_lowercase(), index);
        sqlx::query("INSERT INTO users (name, email, is_active) VALUES (?, ?, ?)")
            .bind(format!("{first} {last}"))
            .bind(email)
            .bind(index % 5 != 0)
            .execute(&mut *transaction)
            .await?;
    }

    let categories = ["Electronics", "Furniture", "Stationery", "Clothing", "Sports", "Books", "Kitchen"];
    let prefixes = ["Premium", "Basic", "Pro", "Elite", "Standard", "Budget", "Deluxe"];
    let product_types = [
        "Laptop", "Mouse", "Keyboard", "Monitor", "Chair", "Desk", "Notebook", "Pen",
        "Headphones", "Webcam", "Speaker", "Tablet", "Lamp", "Shelf", "Printer", "Router",
    ];

    for index in 0..PRODUCT_COUNT {
        let price = 5.99 + (index as f64 * 12.5) + ((index % 7) as f64 * 3.33);
        let stock = ((index * 7 + 5) % 500) as i64;
        sqlx::query("INSERT INTO products (name, price, stock, category) VALUES (?, ?, ?, ?)")
            .bind(format!(
                "{} {} {}",
                prefixes[index % prefixes.len()],
                product_types[index % product_types.len()],
                index + 1
            ))
            .bind(price)
            .bind(stock)
            .bind(categories[index % categories.len()])
            .execute(&mut *transaction)
            .await?;
    }

    let statuses = ["pending", "processing", "shipped", "completed", "cancelled"];

    for index in 0..ORDER_COUNT {
        let user_id = (index % USER_COUNT + 1) as i64;
        let product_id = ((index * 3) % PRODUCT_COUNT + 1) as i64;
        let quantity = (index % 10 + 1) as i64;
        let total = quantity as f64 * (5.99 + product_id as f64 * 12.5);
        sqlx::query(
            "INSERT INTO orders (user_id, product_id, quantity, total, status) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .bind(total)
        .bind(statuses[index % statuses.len()])
        .execute(&mut *transaction)
        .await?;
    }

    transaction.commit().await?;

    info!(
        users = USER_COUNT,
        products = PRODUCT_COUNT,
        orders = ORDER_COUNT,
        "Seeded demo data"
    );
    Ok(())
}
