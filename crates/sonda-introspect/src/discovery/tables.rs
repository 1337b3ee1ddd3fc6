use std::sync::Arc;

use futures::future::join_all;

use sonda_core::{Result, TableInfo, TableRef};

use crate::introspector::Introspector;
use crate::options::DiscoveryOptions;

/// Discovers tables and their metadata facets.
///
/// The table listing itself is fatal on failure; per-table facet failures
/// (columns, indexes, foreign keys) degrade to empty results with a warning
/// so one bad table never aborts discovery of its siblings.
pub struct TableDiscovery {
    introspector: Arc<dyn Introspector>,
}

impl TableDiscovery {
    pub fn new(introspector: Arc<dyn Introspector>) -> Self {
        Self { introspector }
    }

    pub async fn discover(&self, options: &DiscoveryOptions) -> Result<Vec<TableInfo>> {
        let refs: Vec<TableRef> = self
            .introspector
            .list_tables()
            .await?
            .into_iter()
            .filter(|table| {
                if options.is_excluded(&table.name) {
                    tracing::debug!(event = "table_excluded", table = %table.name);
                    false
                } else {
                    true
                }
            })
            .collect();

        let futures = refs.into_iter().map(|table| self.discover_table(table));
        let mut tables = join_all(futures).await;
        tables.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(tables)
    }

    async fn discover_table(&self, table: TableRef) -> TableInfo {
        let name = table.name.clone();
        let (columns, primary_key, indexes, foreign_keys) = futures::join!(
            self.introspector.list_columns(&name),
            self.introspector.primary_key(&name),
            self.introspector.list_indexes(&name),
            self.introspector.list_foreign_keys(&name),
        );

        let columns = columns.unwrap_or_else(|err| {
            tracing::warn!(event = "facet_degraded", table = %name, facet = "columns", error = %err);
            Vec::new()
        });
        let indexes = indexes.unwrap_or_else(|err| {
            tracing::warn!(event = "facet_degraded", table = %name, facet = "indexes", error = %err);
            Vec::new()
        });
        let foreign_keys = foreign_keys.unwrap_or_else(|err| {
            tracing::warn!(event = "facet_degraded", table = %name, facet = "foreign_keys", error = %err);
            Vec::new()
        });
        // The key-order facet degrades to ordinal order from the column flags.
        let primary_key = primary_key.unwrap_or_else(|err| {
            tracing::warn!(event = "facet_degraded", table = %name, facet = "primary_key", error = %err);
            columns
                .iter()
                .filter(|column| column.is_primary_key)
                .map(|column| column.name.clone())
                .collect()
        });

        let uses_rowid = if primary_key.is_empty() && !columns.is_empty() {
            self.introspector.uses_rowid(&name).await.unwrap_or_else(|err| {
                tracing::warn!(event = "facet_degraded", table = %name, facet = "rowid", error = %err);
                false
            })
        } else {
            false
        };

        TableInfo {
            name,
            schema: table.schema,
            columns,
            primary_key,
            indexes,
            foreign_keys,
            uses_rowid,
        }
    }
}
