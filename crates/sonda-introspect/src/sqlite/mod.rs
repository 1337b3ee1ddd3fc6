use async_trait::async_trait;
use sqlx::SqlitePool;

use sonda_core::{
    ColumnInfo, Error, ForeignKeyInfo, IndexInfo, Result, TableRef, ViewInfo, ROWID_COLUMN,
};

use crate::introspector::Introspector;

mod mapper;
mod queries;

/// Reference introspector for SQLite databases.
///
/// Built on `sqlite_master` and the pragma table-valued functions; this is
/// the complete dialect implementation the others are measured against.
#[derive(Debug, Clone)]
pub struct SqliteIntrospector {
    pool: SqlitePool,
}

impl SqliteIntrospector {
    /// Create a new introspector using a pre-configured pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve the referenced column of a foreign key whose target column
    /// is implicit (`REFERENCES users` without a column list): SQLite
    /// points such constraints at the target's primary key, or at the
    /// rowid when none is declared.
    async fn resolve_referenced_column(&self, referenced_table: &str) -> Result<String> {
        let raw = queries::table_info(&self.pool, referenced_table).await?;
        let pk = mapper::primary_key_columns(&raw);
        match pk.as_slice() {
            [only] => Ok(only.clone()),
            [] => Ok(ROWID_COLUMN.to_string()),
            _ => Err(Error::Unsupported(format!(
                "foreign key into {referenced_table} omits target columns but the table has a composite primary key"
            ))),
        }
    }
}

#[async_trait]
impl Introspector for SqliteIntrospector {
    fn dialect(&self) -> &'static str {
        "sqlite"
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("select 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::connection("liveness probe", err))?;
        Ok(())
    }

    async fn database_name(&self) -> Result<Option<String>> {
        queries::database_file(&self.pool).await
    }

    async fn list_tables(&self) -> Result<Vec<TableRef>> {
        let names = queries::list_table_names(&self.pool).await?;
        Ok(names
            .into_iter()
            .map(|name| TableRef { name, schema: None })
            .collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let ddl = queries::table_ddl(&self.pool, table).await?;
        let raw = queries::table_info(&self.pool, table).await?;
        Ok(mapper::map_columns(raw, ddl.as_deref()))
    }

    async fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        let raw = queries::table_info(&self.pool, table).await?;
        Ok(mapper::primary_key_columns(&raw))
    }

    async fn list_indexes(&self, table: &str) -> Result<Vec<IndexInfo>> {
        let raw = queries::index_list(&self.pool, table).await?;
        let mut indexes = Vec::with_capacity(raw.len());
        for index in raw {
            let columns = queries::index_columns(&self.pool, &index.name).await?;
            indexes.push(mapper::make_index(index.name, columns, index.is_unique));
        }
        Ok(indexes)
    }

    async fn list_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>> {
        let raw = queries::foreign_key_list(&self.pool, table).await?;
        let mut foreign_keys = Vec::with_capacity(raw.len());
        for fk in raw {
            let referenced_column = match &fk.referenced_column {
                Some(column) => column.clone(),
                None => self.resolve_referenced_column(&fk.referenced_table).await?,
            };
            foreign_keys.push(mapper::map_foreign_key(table, &fk, referenced_column));
        }
        Ok(foreign_keys)
    }

    async fn list_views(&self) -> Result<Vec<ViewInfo>> {
        let names = queries::list_view_names(&self.pool).await?;
        let mut views = Vec::with_capacity(names.len());
        for name in names {
            let raw = queries::table_info(&self.pool, &name).await?;
            let columns = mapper::map_columns(raw, None);
            views.push(ViewInfo { name, columns });
        }
        Ok(views)
    }

    async fn uses_rowid(&self, table: &str) -> Result<bool> {
        let ddl = queries::table_ddl(&self.pool, table).await?;
        let raw = queries::table_info(&self.pool, table).await?;
        Ok(mapper::table_uses_rowid(&raw, ddl.as_deref()))
    }
}
