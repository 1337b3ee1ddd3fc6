use async_trait::async_trait;

use sonda_core::{ColumnInfo, ForeignKeyInfo, IndexInfo, Result, TableRef, ViewInfo};

/// Trait implemented by dialect adapters that can introspect live databases.
///
/// Each facet call is independently fallible; the discovery services decide
/// how failures degrade. Implementations must not cache between calls; the
/// coordinator owns snapshot semantics.
#[async_trait]
pub trait Introspector: Send + Sync {
    /// Returns the dialect identifier (e.g. `sqlite`).
    fn dialect(&self) -> &'static str;

    /// Cheap liveness probe against the connection.
    async fn ping(&self) -> Result<()>;

    /// Database name when the dialect can report one.
    async fn database_name(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// List application tables (system catalogs excluded).
    async fn list_tables(&self) -> Result<Vec<TableRef>>;

    /// List the columns of one table in ordinal order.
    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Primary key column names in key order (not ordinal order).
    async fn primary_key(&self, table: &str) -> Result<Vec<String>>;

    /// List the indexes of one table.
    async fn list_indexes(&self, table: &str) -> Result<Vec<IndexInfo>>;

    /// List the foreign keys of one table, decomposed to column pairs.
    async fn list_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKeyInfo>>;

    /// List views when the dialect supports them.
    async fn list_views(&self) -> Result<Vec<ViewInfo>>;

    /// Whether the dialect's implicit row identifier backs this table
    /// because no primary key was declared.
    async fn uses_rowid(&self, _table: &str) -> Result<bool> {
        Ok(false)
    }
}
