//! Core contracts and helpers for Sonda.
//!
//! This crate defines the canonical schema snapshot types, the relationship
//! model, the shared error taxonomy, the native-to-Rust type mapper, and the
//! relationship name generator used across the introspection and repository
//! crates.

pub mod error;
pub mod naming;
pub mod relationships;
pub mod schema;
pub mod types;
pub mod validation;

pub use error::{Error, Result};
pub use naming::{inverse_relation_name, relation_name_from_column};
pub use relationships::{RelationshipInfo, RelationshipKind};
pub use schema::{
    ColumnInfo, FkAction, ForeignKeyInfo, IndexInfo, SchemaInfo, TableInfo, TableRef, ViewInfo,
};
pub use types::{map_column_type, mapped_rust_type};
pub use validation::validate_schema;

/// Current schema contract version for serialized `SchemaInfo` snapshots.
pub const SCHEMA_VERSION: &str = "0.1";

/// Name of the implicit row-identifier column used when a table declares no
/// primary key.
pub const ROWID_COLUMN: &str = "rowid";
