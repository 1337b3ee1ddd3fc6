//! Database introspection and schema discovery.
//!
//! Each dialect implements the [`Introspector`] facet contract; the
//! discovery services compose those facets into a validated
//! [`SchemaInfo`](sonda_core::SchemaInfo) snapshot.

pub mod connection;
pub mod discovery;
pub mod introspector;
pub mod options;
pub mod postgres;
pub mod sqlite;

pub use connection::{discovery_for, introspector_for, DatabaseConnection};
pub use discovery::{RelationshipDiscovery, SchemaDiscovery, TableDiscovery, ViewDiscovery};
pub use introspector::Introspector;
pub use options::DiscoveryOptions;
pub use postgres::PostgresIntrospector;
pub use sqlite::SqliteIntrospector;

pub use sonda_core::SchemaInfo;
