use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cardinality of a foreign-key-derived association.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Many rows of `from_table` point at one row of `to_table`.
    ManyToOne,
    /// One row of `from_table` owns many rows of `to_table`.
    OneToMany,
    /// Rows are associated through a junction table.
    ManyToMany,
}

impl RelationshipKind {
    /// The kind of the inverse edge.
    pub fn inverse(self) -> Self {
        match self {
            RelationshipKind::ManyToOne => RelationshipKind::OneToMany,
            RelationshipKind::OneToMany => RelationshipKind::ManyToOne,
            RelationshipKind::ManyToMany => RelationshipKind::ManyToMany,
        }
    }
}

/// A directed relationship between two tables.
///
/// Discovery emits these in inverse pairs: every foreign key produces one
/// forward edge from the owning table and one reverse edge from the
/// referenced table, with exactly inverted `(from, to)` tuples.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipInfo {
    /// Property name under which related rows are attached (snake_case).
    pub name: String,
    pub kind: RelationshipKind,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    /// Junction table for many-to-many relationships.
    pub junction_table: Option<String>,
    /// Junction column pointing back at `from_table`.
    pub junction_from_column: Option<String>,
    /// Junction column pointing at `to_table`.
    pub junction_to_column: Option<String>,
}

impl RelationshipInfo {
    /// Whether this edge is the exact inverse of `other`.
    pub fn is_inverse_of(&self, other: &RelationshipInfo) -> bool {
        self.from_table == other.to_table
            && self.from_column == other.to_column
            && self.to_table == other.from_table
            && self.to_column == other.from_column
            && self.kind == other.kind.inverse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_pair_detection() {
        let forward = RelationshipInfo {
            name: "user".to_string(),
            kind: RelationshipKind::ManyToOne,
            from_table: "posts".to_string(),
            from_column: "user_id".to_string(),
            to_table: "users".to_string(),
            to_column: "id".to_string(),
            junction_table: None,
            junction_from_column: None,
            junction_to_column: None,
        };
        let reverse = RelationshipInfo {
            name: "posts".to_string(),
            kind: RelationshipKind::OneToMany,
            from_table: "users".to_string(),
            from_column: "id".to_string(),
            to_table: "posts".to_string(),
            to_column: "user_id".to_string(),
            junction_table: None,
            junction_from_column: None,
            junction_to_column: None,
        };

        assert!(forward.is_inverse_of(&reverse));
        assert!(reverse.is_inverse_of(&forward));
        assert!(!forward.is_inverse_of(&forward));
    }
}
