//! End-to-end engine lifecycle against an in-memory SQLite database.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use sonda_core::Error;
use sonda_repo::{DatabaseConnection, Engine, EngineConfig};

const FIXTURE: &[&str] = &[
    "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT UNIQUE, name TEXT NOT NULL)",
    "CREATE TABLE posts (
        id INTEGER PRIMARY KEY,
        user_id INTEGER REFERENCES users(id),
        title TEXT NOT NULL
    )",
    "INSERT INTO users (id, email, name) VALUES (1, 'ada@lovelace.dev', 'Ada')",
    "INSERT INTO users (id, email, name) VALUES (2, 'grace@hopper.dev', 'Grace')",
    "INSERT INTO posts (id, user_id, title) VALUES (10, 1, 'Notes on the engine')",
    "INSERT INTO posts (id, user_id, title) VALUES (11, 1, 'Diagrams')",
    "INSERT INTO posts (id, user_id, title) VALUES (12, NULL, 'Orphaned draft')",
];

async fn fixture_engine() -> Result<(Engine, SqlitePool)> {
    // One connection: every pooled connection to :memory: is its own db.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .context("connecting to in-memory sqlite")?;
    for statement in FIXTURE {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .with_context(|| format!("fixture: {statement}"))?;
    }
    let engine = Engine::from_connection(
        &DatabaseConnection::Sqlite(pool.clone()),
        EngineConfig::default(),
    );
    Ok((engine, pool))
}

#[tokio::test]
async fn repository_access_requires_initialization() -> Result<()> {
    let (engine, _pool) = fixture_engine().await?;

    match engine.get_repository("users") {
        Err(Error::NotInitialized) => {}
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected NotInitialized"),
    }

    engine.initialize().await?;
    engine.get_repository("users")?;

    // Second initialize warns and keeps the existing snapshot.
    engine.initialize().await?;

    engine.close();
    match engine.get_repository("users") {
        Err(Error::NotInitialized) => {}
        Err(other) => panic!("unexpected error after close: {other}"),
        Ok(_) => panic!("expected NotInitialized after close"),
    }

    Ok(())
}

#[tokio::test]
async fn unknown_table_lists_available_names() -> Result<()> {
    let (engine, _pool) = fixture_engine().await?;
    engine.initialize().await?;

    match engine.get_repository("user") {
        Err(Error::TableNotFound { name, available }) => {
            assert_eq!(name, "user");
            assert_eq!(available, vec!["posts".to_string(), "users".to_string()]);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected TableNotFound"),
    }
    Ok(())
}

#[tokio::test]
async fn crud_round_trip() -> Result<()> {
    let (engine, _pool) = fixture_engine().await?;
    engine.initialize().await?;
    let users = engine.get_repository("users")?;

    assert_eq!(users.count().await?, 2);
    assert!(users.exists(&json!(1)).await?);
    assert!(!users.exists(&json!(42)).await?);

    let created = users
        .create(serde_json::from_value(
            json!({"email": "edsger@dijkstra.dev", "name": "Edsger"}),
        )?)
        .await?;
    let new_id = created["id"].clone();
    assert!(new_id.is_i64(), "auto-assigned key is read back");
    assert_eq!(created["name"], "Edsger");
    assert_eq!(users.count().await?, 3);

    let updated = users
        .update(serde_json::from_value(
            json!({"id": new_id, "name": "E. W. Dijkstra", "email": "edsger@dijkstra.dev"}),
        )?)
        .await?;
    assert_eq!(updated["name"], "E. W. Dijkstra");

    assert!(users.delete(&new_id).await?);
    assert!(!users.delete(&new_id).await?, "second delete is a no-op");
    assert_eq!(users.count().await?, 2);

    Ok(())
}

#[tokio::test]
async fn update_on_missing_row_raises_row_not_found() -> Result<()> {
    let (engine, _pool) = fixture_engine().await?;
    engine.initialize().await?;
    let users = engine.get_repository("users")?;

    let missing = users
        .update(serde_json::from_value(
            json!({"id": 404, "name": "Nobody"}),
        )?)
        .await;
    match missing {
        Err(Error::RowNotFound { table, .. }) => assert_eq!(table, "users"),
        other => panic!("expected RowNotFound, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn create_validates_input_columns() -> Result<()> {
    let (engine, _pool) = fixture_engine().await?;
    engine.initialize().await?;
    let users = engine.get_repository("users")?;

    let unknown = users
        .create(serde_json::from_value(
            json!({"name": "Ada", "nickname": "ada"}),
        )?)
        .await;
    match unknown {
        Err(Error::ColumnNotFound {
            name, available, ..
        }) => {
            assert_eq!(name, "nickname");
            assert!(available.contains(&"email".to_string()));
        }
        other => panic!("expected ColumnNotFound, got {other:?}"),
    }

    let missing_required = users
        .create(serde_json::from_value(json!({"email": "x@y.dev"}))?)
        .await;
    match missing_required {
        Err(Error::Validation(message)) => assert!(message.contains("name")),
        other => panic!("expected Validation, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn finders_use_the_capability_set() -> Result<()> {
    let (engine, _pool) = fixture_engine().await?;
    engine.initialize().await?;
    let users = engine.get_repository("users")?;

    let ada = users
        .find_first_by("email", &json!("ada@lovelace.dev"))
        .await?
        .context("ada exists")?;
    assert_eq!(ada["name"], "Ada");

    let posts = engine.get_repository("posts")?;
    let by_author = posts.find_many_by("user_id", &json!(1)).await?;
    assert_eq!(by_author.len(), 2);

    match users.find_first_by("id", &json!(1)).await {
        Err(Error::ColumnNotFound { available, .. }) => {
            assert_eq!(
                available,
                vec!["email".to_string(), "name".to_string()],
                "key columns are served by find_by_id, not the finders"
            );
        }
        other => panic!("expected ColumnNotFound, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn relations_load_end_to_end() -> Result<()> {
    let (engine, _pool) = fixture_engine().await?;
    engine.initialize().await?;
    let posts = engine.get_repository("posts")?;

    let with_user = posts
        .find_with_relations(&json!(10), &["user"])
        .await?
        .context("post 10 exists")?;
    assert_eq!(with_user["user"]["name"], "Ada");

    let orphan = posts
        .find_with_relations(&json!(12), &["user"])
        .await?
        .context("post 12 exists")?;
    assert_eq!(orphan["user"], Value::Null);

    let users = engine.get_repository("users")?;
    let grace = users
        .find_with_relations(&json!(2), &["posts"])
        .await?
        .context("user 2 exists")?;
    assert_eq!(grace["posts"], json!([]));

    let mut all_posts = posts.find_all().await?;
    posts.load_relationships(&mut all_posts, &["user"]).await?;
    for post in &all_posts {
        let single = posts
            .find_with_relations(&post["id"], &["user"])
            .await?
            .context("post exists")?;
        assert_eq!(post["user"], single["user"]);
    }
    Ok(())
}

#[tokio::test]
async fn refresh_replaces_schema_and_clears_repositories() -> Result<()> {
    let (engine, pool) = fixture_engine().await?;
    engine.initialize().await?;

    let before = engine.get_repository("users")?;
    assert!(before.table().column("bio").is_none());

    sqlx::query("ALTER TABLE users ADD COLUMN bio TEXT")
        .execute(&pool)
        .await?;
    engine.refresh_schema().await?;

    let after = engine.get_repository("users")?;
    assert!(
        after.table().column("bio").is_some(),
        "refreshed repository sees the new column"
    );
    assert!(
        before.table().column("bio").is_none(),
        "already handed out repositories keep the old snapshot"
    );
    Ok(())
}

#[tokio::test]
async fn performance_metrics_aggregate_observed_queries() -> Result<()> {
    let (engine, _pool) = fixture_engine().await?;
    engine.initialize().await?;
    let users = engine.get_repository("users")?;

    users.find_all().await?;
    users.find_first_by("email", &json!("ada@lovelace.dev")).await?;

    let report = engine.get_performance_metrics();
    assert!(report.total_queries >= 2);
    assert!(report.by_operation.contains_key("select"));
    Ok(())
}

#[tokio::test]
async fn rowid_table_round_trip() -> Result<()> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    sqlx::query("CREATE TABLE audit_log (message TEXT NOT NULL)")
        .execute(&pool)
        .await?;
    let engine = Engine::from_connection(
        &DatabaseConnection::Sqlite(pool),
        EngineConfig::default(),
    );
    engine.initialize().await?;

    let log = engine.get_repository("audit_log")?;
    let created = log
        .create(serde_json::from_value(json!({"message": "started"}))?)
        .await?;
    assert_eq!(created["message"], "started");

    assert_eq!(log.count().await?, 1);
    assert!(log.exists(&json!(1)).await?, "first rowid is 1");
    assert!(log.delete(&json!(1)).await?);
    assert_eq!(log.count().await?, 0);
    Ok(())
}
