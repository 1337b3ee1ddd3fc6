use async_trait::async_trait;
use sqlx::PgPool;

use sonda_core::{ColumnInfo, Error, ForeignKeyInfo, IndexInfo, Result, TableRef, ViewInfo};

use crate::introspector::Introspector;

mod mapper;
mod queries;

/// Partial introspector for PostgreSQL databases.
///
/// Covers tables, columns, primary keys, foreign keys, indexes and views
/// across non-system schemas. Known limitations against the SQLite
/// reference: facet queries match by table name only (same-named tables in
/// two schemas are merged), multi-column foreign keys are decomposed into
/// column pairs, and expression index members are not reported.
#[derive(Debug, Clone)]
pub struct PostgresIntrospector {
    pool: PgPool,
}

impl PostgresIntrospector {
    /// Create a new introspector using a pre-configured pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Introspector for PostgresIntrospector {
    fn dialect(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("select 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::connection("liveness probe", err))?;
        Ok(())
    }

    async fn database_name(&self) -> Result<Option<String>> {
        queries::fetch_database_name(&self.pool).await.map(Some)
    }

    async fn list_tables(&self) -> Result<Vec<TableRef>> {
        let raw = queries::list_tables(&self.pool).await?;
        Ok(raw
            .into_iter()
            .map(|(schema, name)| TableRef {
                name,
                schema: Some(schema),
            })
            .collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let primary_key = queries::primary_key_columns(&self.pool, table).await?;
        let raw = queries::list_columns(&self.pool, table).await?;
        Ok(mapper::map_columns(raw, &primary_key))
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        queries::primary_key_columns(&self.pool, table).await
    }

    async fn list_indexes(&self, table: &str) -> Result<Vec<IndexInfo>> {
        let raw = queries::list_index_columns(&self.pool, table).await?;
        Ok(mapper::group_indexes(raw))
    }

    async fn list_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let raw = queries::list_foreign_keys(&self.pool, table).await?;
        Ok(mapper::map_foreign_keys(raw))
    }

    async fn list_views(&self) -> Result<Vec<ViewInfo>> {
        let names = queries::list_views(&self.pool).await?;
        let mut views = Vec::with_capacity(names.len());
        for name in names {
            let primary_key = Vec::new();
            let raw = queries::list_columns(&self.pool, &name).await?;
            views.push(ViewInfo {
                columns: mapper::map_columns(raw, &primary_key),
                name,
            });
        }
        Ok(views)
    }
}
