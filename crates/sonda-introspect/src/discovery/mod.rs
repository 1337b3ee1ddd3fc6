use std::sync::Arc;

use sonda_core::{validate_schema, Result, SchemaInfo, SCHEMA_VERSION};

use crate::introspector::Introspector;
use crate::options::DiscoveryOptions;

mod relationships;
mod tables;
mod views;

pub use relationships::RelationshipDiscovery;
pub use tables::TableDiscovery;
pub use views::ViewDiscovery;

/// Coordinates the discovery services into one atomic `SchemaInfo`.
///
/// Services are constructor-injected rather than global singletons so tests
/// can substitute fakes at the `Introspector` seam. Partial results are
/// never published: the snapshot is assembled, pruned and validated before
/// it is returned.
pub struct SchemaDiscovery {
    introspector: Arc<dyn Introspector>,
    tables: TableDiscovery,
    views: ViewDiscovery,
    options: DiscoveryOptions,
}

impl SchemaDiscovery {
    pub fn new(introspector: Arc<dyn Introspector>, options: DiscoveryOptions) -> Self {
        Self {
            tables: TableDiscovery::new(Arc::clone(&introspector)),
            views: ViewDiscovery::new(Arc::clone(&introspector)),
            introspector,
            options,
        }
    }

    pub fn dialect(&self) -> &'static str {
        self.introspector.dialect()
    }

    /// Cheap liveness probe, used by the engine before first discovery.
    pub async fn ping(&self) -> Result<()> {
        self.introspector.ping().await
    }

    /// Run discovery and build a validated schema snapshot.
    pub async fn discover(&self) -> Result<SchemaInfo> {
        let database = match self.introspector.database_name().await {
            Ok(database) => database,
            Err(err) => {
                tracing::warn!(event = "facet_degraded", facet = "database_name", error = %err);
                None
            }
        };

        let mut tables = self.tables.discover(&self.options).await?;
        prune_dangling_foreign_keys(&mut tables);
        let relationships = RelationshipDiscovery::infer(&tables);
        let views = self.views.discover(&self.options).await;

        let schema = SchemaInfo {
            schema_version: SCHEMA_VERSION.to_string(),
            dialect: self.introspector.dialect().to_string(),
            database,
            tables,
            relationships,
            views,
        };

        validate_schema(&schema)?;

        tracing::info!(
            event = "discovery_finished",
            dialect = %schema.dialect,
            tables = schema.tables.len(),
            relationships = schema.relationships.len(),
            views = schema.views.len(),
        );

        Ok(schema)
    }
}

/// Drop foreign keys whose target table was excluded from discovery; the
/// snapshot must stay internally consistent.
fn prune_dangling_foreign_keys(tables: &mut [sonda_core::TableInfo]) {
    let names: std::collections::BTreeSet<String> =
        tables.iter().map(|table| table.name.clone()).collect();

    for table in tables.iter_mut() {
        table.foreign_keys.retain(|fk| {
            let keep = names.contains(&fk.referenced_table);
            if !keep {
                tracing::warn!(
                    event = "foreign_key_pruned",
                    table = %table.name,
                    column = %fk.column,
                    referenced_table = %fk.referenced_table,
                );
            }
            keep
        });
    }
}
