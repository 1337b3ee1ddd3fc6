use sonda_core::{ColumnInfo, FkAction, ForeignKeyInfo, IndexInfo};

use super::queries::{RawPgColumn, RawPgForeignKey, RawPgIndexColumn};

pub fn map_columns(raw: Vec<RawPgColumn>, primary_key: &[String]) -> Vec<ColumnInfo> {
    raw.into_iter()
        .map(|col| {
            let is_pk = primary_key.iter().any(|name| name == &col.name);
            let is_auto = col.is_identity
                || col
                    .default
                    .as_deref()
                    .map(|default| default.starts_with("nextval("))
                    .unwrap_or(false);
            ColumnInfo {
                ordinal_position: col.ordinal_position,
                name: col.name,
                native_type: col.data_type,
                is_nullable: col.is_nullable,
                default: col.default,
                is_primary_key: is_pk,
                is_auto_increment: is_auto,
                max_length: col.character_max_length,
                numeric_precision: col.numeric_precision,
                numeric_scale: col.numeric_scale,
            }
        })
        .collect()
}

pub fn map_foreign_keys(raw: Vec<RawPgForeignKey>) -> Vec<ForeignKeyInfo> {
    raw.into_iter()
        .map(|fk| ForeignKeyInfo {
            name: fk.name,
            column: fk.column,
            referenced_table: fk.referenced_table,
            referenced_column: fk.referenced_column,
            on_update: fk_action_from_code(&fk.on_update),
            on_delete: fk_action_from_code(&fk.on_delete),
        })
        .collect()
}

/// Group per-column index rows into ordered index descriptors.
pub fn group_indexes(raw: Vec<RawPgIndexColumn>) -> Vec<IndexInfo> {
    let mut indexes: Vec<IndexInfo> = Vec::new();
    for row in raw {
        match indexes.last_mut() {
            Some(last) if last.name == row.index_name => last.columns.push(row.column),
            _ => indexes.push(IndexInfo {
                name: row.index_name,
                columns: vec![row.column],
                is_unique: row.is_unique,
            }),
        }
    }
    indexes
}

/// Decode `pg_constraint.confupdtype` / `confdeltype` action codes.
fn fk_action_from_code(code: &str) -> FkAction {
    match code {
        "a" => FkAction::NoAction,
        "r" => FkAction::Restrict,
        "c" => FkAction::Cascade,
        "n" => FkAction::SetNull,
        "d" => FkAction::SetDefault,
        _ => FkAction::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_default_is_auto_increment() {
        let raw = vec![RawPgColumn {
            ordinal_position: 1,
            name: "id".to_string(),
            data_type: "integer".to_string(),
            is_nullable: false,
            default: Some("nextval('users_id_seq'::regclass)".to_string()),
            is_identity: false,
            character_max_length: None,
            numeric_precision: Some(32),
            numeric_scale: Some(0),
        }];
        let columns = map_columns(raw, &["id".to_string()]);
        assert!(columns[0].is_auto_increment);
        assert!(columns[0].is_primary_key);
    }

    #[test]
    fn index_rows_group_in_order() {
        let raw = vec![
            RawPgIndexColumn {
                index_name: "users_email_key".to_string(),
                is_unique: true,
                column: "email".to_string(),
            },
            RawPgIndexColumn {
                index_name: "users_name_idx".to_string(),
                is_unique: false,
                column: "last_name".to_string(),
            },
            RawPgIndexColumn {
                index_name: "users_name_idx".to_string(),
                is_unique: false,
                column: "first_name".to_string(),
            },
        ];
        let indexes = group_indexes(raw);
        assert_eq!(indexes.len(), 2);
        assert_eq!(
            indexes[1].columns,
            vec!["last_name".to_string(), "first_name".to_string()]
        );
        assert!(indexes[0].is_unique);
    }

    #[test]
    fn action_codes_decode() {
        assert_eq!(fk_action_from_code("c"), FkAction::Cascade);
        assert_eq!(fk_action_from_code("n"), FkAction::SetNull);
        assert_eq!(fk_action_from_code("?"), FkAction::Unknown);
    }
}
