use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::relationships::RelationshipInfo;
use crate::ROWID_COLUMN;

/// Top-level schema snapshot for a database.
///
/// Produced atomically by discovery, cached by the engine, and replaced
/// wholesale on refresh. Never mutated incrementally.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SchemaInfo {
    /// Contract version for this snapshot format.
    pub schema_version: String,
    /// Database dialect identifier (e.g. `sqlite`).
    pub dialect: String,
    /// Database name when the dialect can report one.
    pub database: Option<String>,
    /// Tables captured from the database, sorted by name.
    pub tables: Vec<TableInfo>,
    /// Relationships inferred from foreign keys, in inverse pairs.
    pub relationships: Vec<RelationshipInfo>,
    /// Views captured from the database when enabled.
    pub views: Vec<ViewInfo>,
}

impl SchemaInfo {
    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Names of all discovered tables, in snapshot order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.name.clone()).collect()
    }

    /// Relationships whose owning side is the given table.
    pub fn relationships_from(&self, table: &str) -> Vec<&RelationshipInfo> {
        self.relationships
            .iter()
            .filter(|rel| rel.from_table == table)
            .collect()
    }
}

/// Lightweight table reference returned by `Introspector::list_tables`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableRef {
    pub name: String,
    /// Namespace/schema qualifier when the dialect has one.
    pub schema: Option<String>,
}

/// Table metadata assembled from the introspection facets.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableInfo {
    pub name: String,
    /// Namespace/schema qualifier when the dialect has one.
    pub schema: Option<String>,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnInfo>,
    /// Declared primary key columns in key order; empty when none declared.
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    /// True when the dialect's implicit row identifier is the effective key
    /// because no primary key was declared.
    pub uses_rowid: bool,
}

impl TableInfo {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Column names in ordinal order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| column.name.clone())
            .collect()
    }

    /// Effective key columns: the declared primary key, or the implicit
    /// row identifier when none was declared.
    pub fn effective_key(&self) -> Vec<String> {
        if !self.primary_key.is_empty() {
            self.primary_key.clone()
        } else if self.uses_rowid {
            vec![ROWID_COLUMN.to_string()]
        } else {
            Vec::new()
        }
    }

    /// Whether inserts can omit the key and let the database assign it.
    pub fn has_auto_increment(&self) -> bool {
        self.columns.iter().any(|column| column.is_auto_increment)
            || (self.primary_key.is_empty() && self.uses_rowid)
    }

    /// Whether the named column is covered by a unique index or is the
    /// sole primary key column.
    pub fn is_column_unique(&self, name: &str) -> bool {
        if self.primary_key.len() == 1 && self.primary_key[0] == name {
            return true;
        }
        if self.uses_rowid && name == ROWID_COLUMN {
            return true;
        }
        self.indexes
            .iter()
            .any(|index| index.is_unique && index.columns.len() == 1 && index.columns[0] == name)
    }

    /// Whether the named column appears in any index or in the primary key.
    pub fn is_column_indexed(&self, name: &str) -> bool {
        self.primary_key.iter().any(|column| column == name)
            || self
                .indexes
                .iter()
                .any(|index| index.columns.iter().any(|column| column == name))
    }
}

/// Column metadata. Immutable once discovered; regenerated wholesale on
/// schema refresh.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ColumnInfo {
    pub ordinal_position: i32,
    pub name: String,
    /// Raw native type string as reported by the dialect (e.g. `VARCHAR(255)`).
    pub native_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    pub max_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
}

/// Index metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct IndexInfo {
    pub name: String,
    /// Indexed columns in index order.
    pub columns: Vec<String>,
    pub is_unique: bool,
}

/// Referential action semantics for foreign keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FkAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
    Unknown,
}

impl FkAction {
    /// Parse the action string reported by dialect metadata catalogs.
    pub fn from_sql(action: &str) -> Self {
        match action.to_ascii_uppercase().as_str() {
            "NO ACTION" => FkAction::NoAction,
            "RESTRICT" => FkAction::Restrict,
            "CASCADE" => FkAction::Cascade,
            "SET NULL" => FkAction::SetNull,
            "SET DEFAULT" => FkAction::SetDefault,
            _ => FkAction::Unknown,
        }
    }
}

/// Single-column foreign key descriptor.
///
/// Multi-column constraints are decomposed into one descriptor per column
/// pair by the dialect introspectors.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKeyInfo {
    pub name: String,
    /// Source column on the owning table.
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_delete: FkAction,
    pub on_update: FkAction,
}

/// View metadata.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ViewInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, native: &str) -> ColumnInfo {
        ColumnInfo {
            ordinal_position: 1,
            name: name.to_string(),
            native_type: native.to_string(),
            is_nullable: true,
            default: None,
            is_primary_key: false,
            is_auto_increment: false,
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
        }
    }

    fn table(name: &str) -> TableInfo {
        TableInfo {
            name: name.to_string(),
            schema: None,
            columns: vec![column("id", "INTEGER"), column("email", "TEXT")],
            primary_key: vec!["id".to_string()],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            uses_rowid: false,
        }
    }

    #[test]
    fn effective_key_prefers_declared_primary_key() {
        let info = table("users");
        assert_eq!(info.effective_key(), vec!["id".to_string()]);
    }

    #[test]
    fn effective_key_falls_back_to_rowid() {
        let mut info = table("log");
        info.primary_key.clear();
        info.uses_rowid = true;
        assert_eq!(info.effective_key(), vec![ROWID_COLUMN.to_string()]);
        assert!(info.has_auto_increment());
    }

    #[test]
    fn unique_detection_covers_pk_and_unique_indexes() {
        let mut info = table("users");
        info.indexes.push(IndexInfo {
            name: "users_email_uq".to_string(),
            columns: vec!["email".to_string()],
            is_unique: true,
        });
        assert!(info.is_column_unique("id"));
        assert!(info.is_column_unique("email"));
        assert!(!info.is_column_unique("missing"));
    }

    #[test]
    fn indexed_detection_includes_composite_members() {
        let mut info = table("users");
        info.indexes.push(IndexInfo {
            name: "users_multi".to_string(),
            columns: vec!["email".to_string(), "id".to_string()],
            is_unique: false,
        });
        assert!(info.is_column_indexed("email"));
        assert!(info.is_column_indexed("id"));
        assert!(!info.is_column_indexed("missing"));
    }
}
