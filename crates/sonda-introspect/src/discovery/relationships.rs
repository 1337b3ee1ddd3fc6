use std::collections::BTreeSet;

use sonda_core::{
    inverse_relation_name, relation_name_from_column, RelationshipInfo, RelationshipKind,
    TableInfo, ROWID_COLUMN,
};

/// Infers bidirectional relationships from discovered foreign keys.
///
/// Every foreign key yields exactly one forward edge from the owning table
/// and one reverse edge from the referenced table, with exactly inverted
/// `(from, to)` tuples. Junction tables are not detected: a table with two
/// foreign keys produces two independent pairs, and callers wanting
/// many-to-many semantics append explicit entries.
pub struct RelationshipDiscovery;

impl RelationshipDiscovery {
    /// Walk the foreign keys of all tables and emit relationship pairs.
    pub fn infer(tables: &[TableInfo]) -> Vec<RelationshipInfo> {
        let mut relationships = Vec::new();
        let mut used_names: BTreeSet<(String, String)> = BTreeSet::new();

        for table in tables {
            for fk in &table.foreign_keys {
                let referenced = match tables.iter().find(|t| t.name == fk.referenced_table) {
                    Some(referenced) => referenced,
                    None => {
                        tracing::warn!(
                            event = "dangling_foreign_key",
                            table = %table.name,
                            column = %fk.column,
                            referenced_table = %fk.referenced_table,
                        );
                        continue;
                    }
                };

                let target_unique = is_target_unique(referenced, &fk.referenced_column);
                if !target_unique {
                    // A non-unique referenced column is not a valid foreign
                    // key target in standard SQL; surface the anomaly
                    // instead of silently assuming many-to-one.
                    tracing::warn!(
                        event = "non_unique_fk_target",
                        table = %table.name,
                        column = %fk.column,
                        referenced_table = %referenced.name,
                        referenced_column = %fk.referenced_column,
                    );
                }
                let forward_kind = if target_unique {
                    RelationshipKind::ManyToOne
                } else {
                    RelationshipKind::OneToMany
                };

                let qualifier = relation_name_from_column(&fk.column, &referenced.name);
                let forward_name = unique_name(
                    &mut used_names,
                    &table.name,
                    qualifier.clone(),
                    &fk.column,
                );
                relationships.push(RelationshipInfo {
                    name: forward_name,
                    kind: forward_kind,
                    from_table: table.name.clone(),
                    from_column: fk.column.clone(),
                    to_table: referenced.name.clone(),
                    to_column: fk.referenced_column.clone(),
                    junction_table: None,
                    junction_from_column: None,
                    junction_to_column: None,
                });

                let reverse_name = unique_name(
                    &mut used_names,
                    &referenced.name,
                    inverse_relation_name(&table.name),
                    &fk.column,
                );
                relationships.push(RelationshipInfo {
                    name: reverse_name,
                    kind: forward_kind.inverse(),
                    from_table: referenced.name.clone(),
                    from_column: fk.referenced_column.clone(),
                    to_table: table.name.clone(),
                    to_column: fk.column.clone(),
                    junction_table: None,
                    junction_from_column: None,
                    junction_to_column: None,
                });
            }
        }

        relationships
    }
}

fn is_target_unique(referenced: &TableInfo, referenced_column: &str) -> bool {
    if referenced_column == ROWID_COLUMN && referenced.uses_rowid {
        return true;
    }
    referenced.is_column_unique(referenced_column)
}

/// Reserve a relationship name on a table, disambiguating collisions with a
/// suffix derived from the foreign-key column.
fn unique_name(
    used: &mut BTreeSet<(String, String)>,
    table: &str,
    base: String,
    fk_column: &str,
) -> String {
    let mut name = base;
    if used.contains(&(table.to_string(), name.clone())) {
        name = format!("{}_{}", name, relation_name_from_column(fk_column, table));
    }
    let mut counter = 2;
    while used.contains(&(table.to_string(), name.clone())) {
        name = format!("{name}_{counter}");
        counter += 1;
    }
    used.insert((table.to_string(), name.clone()));
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonda_core::{ColumnInfo, FkAction, ForeignKeyInfo, IndexInfo};

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

    fn fk(column_name: &str, referenced: &str, referenced_column: &str) -> ForeignKeyInfo {
        ForeignKeyInfo {
            name: format!("fk_{column_name}"),
            column: column_name.to_string(),
            referenced_table: referenced.to_string(),
            referenced_column: referenced_column.to_string(),
            on_delete: FkAction::NoAction,
            on_update: FkAction::NoAction,
        }
    }

    fn users() -> TableInfo {
        TableInfo {
            name: "users".to_string(),
            schema: None,
            columns: vec![column("id", true), column("email", false)],
            primary_key: vec!["id".to_string()],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            uses_rowid: false,
        }
    }

    fn posts() -> TableInfo {
        TableInfo {
            name: "posts".to_string(),
            schema: None,
            columns: vec![column("id", true), column("user_id", false)],
            primary_key: vec!["id".to_string()],
            indexes: Vec::new(),
            foreign_keys: vec![fk("user_id", "users", "id")],
            uses_rowid: false,
        }
    }

    #[test]
    fn foreign_key_yields_exact_inverse_pair() {
        let tables = vec![users(), posts()];
        let rels = RelationshipDiscovery::infer(&tables);
        assert_eq!(rels.len(), 2);

        let forward = &rels[0];
        let reverse = &rels[1];
        assert_eq!(forward.name, "user");
        assert_eq!(forward.kind, RelationshipKind::ManyToOne);
        assert_eq!(
            (forward.from_table.as_str(), forward.from_column.as_str()),
            ("posts", "user_id")
        );
        assert_eq!(
            (forward.to_table.as_str(), forward.to_column.as_str()),
            ("users", "id")
        );

        assert_eq!(reverse.name, "posts");
        assert_eq!(reverse.kind, RelationshipKind::OneToMany);
        assert!(forward.is_inverse_of(reverse));
    }

    #[test]
    fn non_unique_target_demotes_forward_edge() {
        let mut users = users();
        users.primary_key = vec!["id".to_string()];
        let mut posts = posts();
        // Point the fk at a column that is neither the pk nor unique.
        posts.foreign_keys = vec![fk("user_email", "users", "email")];
        posts.columns.push(column("user_email", false));

        let rels = RelationshipDiscovery::infer(&[users, posts]);
        assert_eq!(rels[0].kind, RelationshipKind::OneToMany);
        assert_eq!(rels[1].kind, RelationshipKind::ManyToOne);
    }

    #[test]
    fn unique_index_counts_as_unique_target() {
        let mut users = users();
        users.indexes.push(IndexInfo {
            name: "users_email_uq".to_string(),
            columns: vec!["email".to_string()],
            is_unique: true,
        });
        let mut posts = posts();
        posts.foreign_keys = vec![fk("user_email", "users", "email")];
        posts.columns.push(column("user_email", false));

        let rels = RelationshipDiscovery::infer(&[users, posts]);
        assert_eq!(rels[0].kind, RelationshipKind::ManyToOne);
    }

    #[test]
    fn dangling_foreign_key_is_skipped() {
        let rels = RelationshipDiscovery::infer(&[posts()]);
        assert!(rels.is_empty());
    }

    #[test]
    fn two_fks_to_one_table_disambiguate_reverse_names() {
        let mut posts = posts();
        posts.columns.push(column("editor_id", false));
        posts
            .foreign_keys
            .push(fk("editor_id", "users", "id"));

        let rels = RelationshipDiscovery::infer(&[users(), posts]);
        assert_eq!(rels.len(), 4);

        let forward_names: Vec<&str> = rels
            .iter()
            .filter(|rel| rel.from_table == "posts")
            .map(|rel| rel.name.as_str())
            .collect();
        assert_eq!(forward_names, vec!["user", "editor"]);

        let reverse_names: Vec<&str> = rels
            .iter()
            .filter(|rel| rel.from_table == "users")
            .map(|rel| rel.name.as_str())
            .collect();
        assert_eq!(reverse_names[0], "posts");
        assert_ne!(reverse_names[0], reverse_names[1]);
    }

    #[test]
    fn junction_table_yields_two_independent_pairs() {
        let tags = TableInfo {
            name: "tags".to_string(),
            schema: None,
            columns: vec![column("id", true)],
            primary_key: vec!["id".to_string()],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            uses_rowid: false,
        };
        let post_tags = TableInfo {
            name: "post_tags".to_string(),
            schema: None,
            columns: vec![column("post_id", false), column("tag_id", false)],
            primary_key: vec!["post_id".to_string(), "tag_id".to_string()],
            indexes: Vec::new(),
            foreign_keys: vec![fk("post_id", "posts", "id"), fk("tag_id", "tags", "id")],
            uses_rowid: false,
        };

        let rels = RelationshipDiscovery::infer(&[users(), posts(), tags, post_tags]);
        // posts.user pair + post_tags.post pair + post_tags.tag pair.
        assert_eq!(rels.len(), 6);
        assert!(rels
            .iter()
            .all(|rel| rel.kind != RelationshipKind::ManyToMany));
    }
}
