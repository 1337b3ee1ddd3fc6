//! Discover an in-memory SQLite schema and walk a repository end to end.
//!
//! Run with: `cargo run -p sonda-repo --example quickstart`

use serde_json::json;
use sqlx::sqlite::SqlitePoolOptions;

use sonda_repo::{DatabaseConnection, Engine, EngineConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // One connection: every pooled connection to :memory: is its own db.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    for statement in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT UNIQUE, name TEXT NOT NULL)",
        "CREATE TABLE posts (
            id INTEGER PRIMARY KEY,
            user_id INTEGER REFERENCES users(id),
            title TEXT NOT NULL
        )",
    ] {
        sqlx::query(statement).execute(&pool).await?;
    }

    let engine = Engine::from_connection(
        &DatabaseConnection::Sqlite(pool),
        EngineConfig::default(),
    );
    engine.initialize().await?;

    let schema = engine.schema()?;
    println!("discovered tables: {:?}", schema.table_names());
    for rel in &schema.relationships {
        println!(
            "  {}.{} -> {}.{} ({:?})",
            rel.from_table, rel.name, rel.to_table, rel.to_column, rel.kind
        );
    }

    let users = engine.get_repository("users")?;
    let ada = users
        .create(serde_json::from_value(
            json!({"email": "ada@lovelace.dev", "name": "Ada"}),
        )?)
        .await?;
    println!("created user: {}", serde_json::to_string(&ada)?);

    let posts = engine.get_repository("posts")?;
    posts
        .create(serde_json::from_value(
            json!({"user_id": ada["id"], "title": "Notes on the analytical engine"}),
        )?)
        .await?;

    let mut all_posts = posts.find_all().await?;
    posts.load_relationships(&mut all_posts, &["user"]).await?;
    for post in &all_posts {
        println!(
            "post {} by {}",
            post["title"],
            post["user"]["name"]
        );
    }

    let report = engine.get_performance_metrics();
    println!(
        "observed {} queries, max {}ms",
        report.total_queries, report.max_duration_ms
    );
    Ok(())
}
