use std::sync::Arc;

use sqlx::{PgPool, SqlitePool};

use crate::discovery::SchemaDiscovery;
use crate::introspector::Introspector;
use crate::options::DiscoveryOptions;
use crate::postgres::PostgresIntrospector;
use crate::sqlite::SqliteIntrospector;

/// A live connection to one of the supported dialects.
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl DatabaseConnection {
    pub fn dialect(&self) -> &'static str {
        match self {
            DatabaseConnection::Sqlite(_) => "sqlite",
            DatabaseConnection::Postgres(_) => "postgres",
        }
    }
}

/// Select the dialect introspector for a connection.
pub fn introspector_for(connection: &DatabaseConnection) -> Arc<dyn Introspector> {
    match connection {
        DatabaseConnection::Sqlite(pool) => Arc::new(SqliteIntrospector::new(pool.clone())),
        DatabaseConnection::Postgres(pool) => Arc::new(PostgresIntrospector::new(pool.clone())),
    }
}

/// Build the discovery coordinator for a connection.
pub fn discovery_for(connection: &DatabaseConnection, options: DiscoveryOptions) -> SchemaDiscovery {
    SchemaDiscovery::new(introspector_for(connection), options)
}
