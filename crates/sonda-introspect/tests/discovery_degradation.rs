use std::sync::Arc;

use async_trait::async_trait;

use sonda_core::{ColumnInfo, Error, ForeignKeyInfo, IndexInfo, Result, TableRef, ViewInfo};
use sonda_introspect::{DiscoveryOptions, Introspector, SchemaDiscovery};

/// Introspector that answers for two tables but fails every index query
/// for one of them.
struct FlakyIntrospector;

fn column(name: &str, pk: bool) -> ColumnInfo {
    ColumnInfo {
        ordinal_position: 1,
        name: name.to_string(),
        native_type: "INTEGER".to_string(),
        is_nullable: !pk,
        default: None,
        is_primary_key: pk,
        is_auto_increment: pk,
        max_length: None,
        numeric_precision: None,
        numeric_scale: None,
    }
}

#[async_trait]
impl Introspector for FlakyIntrospector {
    fn dialect(&self) -> &'static str {
        "fake"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<TableRef>> {
        Ok(vec![
            TableRef {
                name: "healthy".to_string(),
                schema: None,
            },
            TableRef {
                name: "broken".to_string(),
                schema: None,
            },
        ])
    }

    async fn list_columns(&self, _table: &str) -> Result<Vec<ColumnInfo>> {
        Ok(vec![column("id", true), column("value", false)])
    }

    async fn primary_key(&self, _table: &str) -> Result<Vec<String>> {
        Ok(vec!["id".to_string()])
    }

    async fn list_indexes(&self, table: &str) -> Result<Vec<IndexInfo>> {
        if table == "broken" {
            return Err(Error::connection(
                "index scan failed",
                std::io::Error::new(std::io::ErrorKind::Other, "boom"),
            ));
        }
        Ok(vec![IndexInfo {
            name: "healthy_value_idx".to_string(),
            columns: vec!["value".to_string()],
            is_unique: false,
        }])
    }

    async fn list_foreign_keys(&self, _table: &str) -> Result<Vec<ForeignKeyInfo>> {
        Ok(Vec::new())
    }

    async fn list_views(&self) -> Result<Vec<ViewInfo>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn one_failing_facet_degrades_without_aborting_discovery() {
    let discovery = SchemaDiscovery::new(Arc::new(FlakyIntrospector), DiscoveryOptions::default());
    let schema = discovery.discover().await.expect("discovery must survive");

    assert_eq!(schema.tables.len(), 2);

    let broken = schema.table("broken").expect("degraded table present");
    assert_eq!(broken.columns.len(), 2, "other facets intact");
    assert!(broken.indexes.is_empty(), "failed facet degraded to empty");

    let healthy = schema.table("healthy").expect("sibling table present");
    assert_eq!(healthy.indexes.len(), 1, "sibling facet unaffected");
}
