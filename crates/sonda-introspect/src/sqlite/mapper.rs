use sonda_core::{ColumnInfo, FkAction, ForeignKeyInfo, IndexInfo};

use super::queries::{RawSqliteColumn, RawSqliteForeignKey};

/// Map pragma rows to column descriptors, resolving auto-increment with the
/// three-tier heuristic:
///
/// 1. the table DDL carries `AUTOINCREMENT` on a single-column INTEGER
///    primary key;
/// 2. a single-column INTEGER primary key without the keyword (rowid alias
///    semantics);
/// 3. no declared primary key at all: handled by the caller through the
///    `uses_rowid` flag, since no column carries the key in that case.
pub fn map_columns(raw: Vec<RawSqliteColumn>, ddl: Option<&str>) -> Vec<ColumnInfo> {
    let pk_columns: Vec<&RawSqliteColumn> = {
        let mut members: Vec<&RawSqliteColumn> =
            raw.iter().filter(|col| col.pk_position > 0).collect();
        members.sort_by_key(|col| col.pk_position);
        members
    };

    let ddl_has_keyword = ddl
        .map(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT"))
        .unwrap_or(false);
    let auto_increment_pk = match pk_columns.as_slice() {
        // Tier 1: the declared keyword wins outright. Tier 2: a plain
        // single-column INTEGER primary key aliases the rowid and
        // auto-assigns even without it.
        [only] if ddl_has_keyword || only.native_type.eq_ignore_ascii_case("integer") => {
            Some(only.name.clone())
        }
        _ => None,
    };

    raw.into_iter()
        .map(|col| {
            let (max_length, precision, scale) = parse_type_args(&col.native_type);
            let is_auto = auto_increment_pk
                .as_deref()
                .map(|name| name == col.name)
                .unwrap_or(false);
            ColumnInfo {
                ordinal_position: col.cid as i32 + 1,
                name: col.name,
                native_type: col.native_type,
                is_nullable: !col.not_null && col.pk_position == 0,
                default: col.default,
                is_primary_key: col.pk_position > 0,
                is_auto_increment: is_auto,
                max_length,
                numeric_precision: precision,
                numeric_scale: scale,
            }
        })
        .collect()
}

/// Primary key column names in key order.
pub fn primary_key_columns(raw: &[RawSqliteColumn]) -> Vec<String> {
    let mut members: Vec<&RawSqliteColumn> =
        raw.iter().filter(|col| col.pk_position > 0).collect();
    members.sort_by_key(|col| col.pk_position);
    members.into_iter().map(|col| col.name.clone()).collect()
}

/// Map a foreign-key pragma row; a constraint has no name in SQLite, so a
/// stable one is synthesized from the table and constraint id.
pub fn map_foreign_key(
    table: &str,
    raw: &RawSqliteForeignKey,
    resolved_referenced_column: String,
) -> ForeignKeyInfo {
    ForeignKeyInfo {
        name: format!("fk_{}_{}", table, raw.id),
        column: raw.column.clone(),
        referenced_table: raw.referenced_table.clone(),
        referenced_column: resolved_referenced_column,
        on_delete: FkAction::from_sql(&raw.on_delete),
        on_update: FkAction::from_sql(&raw.on_update),
    }
}

pub fn make_index(name: String, columns: Vec<String>, is_unique: bool) -> IndexInfo {
    IndexInfo {
        name,
        columns,
        is_unique,
    }
}

/// Extract `(max_length, precision, scale)` from a parenthesized type
/// suffix: `VARCHAR(255)` and `DECIMAL(10,2)`.
fn parse_type_args(native: &str) -> (Option<i32>, Option<i32>, Option<i32>) {
    let open = match native.find('(') {
        Some(pos) => pos,
        None => return (None, None, None),
    };
    let close = match native.rfind(')') {
        Some(pos) if pos > open => pos,
        _ => return (None, None, None),
    };

    let args: Vec<&str> = native[open + 1..close].split(',').collect();
    match args.as_slice() {
        [single] => {
            let value = single.trim().parse::<i32>().ok();
            (value, value, None)
        }
        [first, second] => {
            let precision = first.trim().parse::<i32>().ok();
            let scale = second.trim().parse::<i32>().ok();
            (None, precision, scale)
        }
        _ => (None, None, None),
    }
}

/// Tier-3 check: no declared primary key and not a WITHOUT ROWID table.
pub fn table_uses_rowid(raw: &[RawSqliteColumn], ddl: Option<&str>) -> bool {
    let has_pk = raw.iter().any(|col| col.pk_position > 0);
    let without_rowid = ddl
        .map(|sql| sql.to_ascii_uppercase().contains("WITHOUT ROWID"))
        .unwrap_or(false);
    !has_pk && !without_rowid
}
