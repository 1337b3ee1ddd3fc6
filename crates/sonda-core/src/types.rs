use std::collections::BTreeMap;

use crate::schema::ColumnInfo;

/// Map a native column type string to a Rust type name.
///
/// Custom mappings win over the built-in table; both are matched
/// case-insensitively on the base type with any parenthesized length or
/// precision suffix stripped (`varchar(255)` matches `VARCHAR`). Unknown
/// types fall back to `serde_json::Value`.
pub fn map_column_type(native: &str, custom: &BTreeMap<String, String>) -> String {
    let base = base_type(native);

    if let Some(mapped) = custom
        .iter()
        .find(|(key, _)| base_type(key) == base)
        .map(|(_, value)| value.clone())
    {
        return mapped;
    }

    if let Some(mapped) = builtin_mapping(&base) {
        return mapped.to_string();
    }

    if let Some(mapped) = affinity_mapping(&base) {
        return mapped.to_string();
    }

    tracing::debug!(event = "unmapped_column_type", native_type = %native);
    "serde_json::Value".to_string()
}

/// Map a discovered column to its Rust type, wrapping nullable columns in
/// `Option`.
pub fn mapped_rust_type(column: &ColumnInfo, custom: &BTreeMap<String, String>) -> String {
    let inner = map_column_type(&column.native_type, custom);
    if column.is_nullable {
        format!("Option<{inner}>")
    } else {
        inner
    }
}

/// Uppercased type name with any `(...)` suffix and surrounding space removed.
fn base_type(native: &str) -> String {
    let trimmed = native.trim();
    let without_args = match trimmed.find('(') {
        Some(pos) => &trimmed[..pos],
        None => trimmed,
    };
    without_args.trim().to_ascii_uppercase()
}

fn builtin_mapping(base: &str) -> Option<&'static str> {
    let mapped = match base {
        "INTEGER" | "INT" | "BIGINT" | "SMALLINT" | "TINYINT" | "MEDIUMINT" | "INT2" | "INT4"
        | "INT8" | "SERIAL" | "BIGSERIAL" | "SMALLSERIAL" => "i64",
        "TEXT" | "VARCHAR" | "CHARACTER VARYING" | "CHAR" | "CHARACTER" | "NCHAR" | "NVARCHAR"
        | "CLOB" | "CITEXT" | "NAME" | "UUID" => "String",
        "REAL" | "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" | "FLOAT4" | "FLOAT8" | "NUMERIC"
        | "DECIMAL" => "f64",
        "BOOLEAN" | "BOOL" => "bool",
        "BLOB" | "BYTEA" | "BINARY" | "VARBINARY" => "Vec<u8>",
        "DATE" => "chrono::NaiveDate",
        "TIME" | "TIME WITHOUT TIME ZONE" => "chrono::NaiveTime",
        "DATETIME" | "TIMESTAMP" | "TIMESTAMP WITHOUT TIME ZONE" => "chrono::NaiveDateTime",
        "TIMESTAMPTZ" | "TIMESTAMP WITH TIME ZONE" => "chrono::DateTime<chrono::Utc>",
        "JSON" | "JSONB" => "serde_json::Value",
        _ => return None,
    };
    Some(mapped)
}

/// SQLite-style affinity fallback for dialect-specific spellings the exact
/// table does not cover (`UNSIGNED BIG INT`, `VARYING CHARACTER`, ...).
fn affinity_mapping(base: &str) -> Option<&'static str> {
    if base.contains("INT") {
        Some("i64")
    } else if base.contains("CHAR") || base.contains("TEXT") || base.contains("CLOB") {
        Some("String")
    } else if base.contains("REAL") || base.contains("FLOA") || base.contains("DOUB") {
        Some("f64")
    } else if base.contains("BOOL") {
        Some("bool")
    } else if base.contains("BLOB") {
        Some("Vec<u8>")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_custom() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    #[test]
    fn varchar_with_length_maps_to_string() {
        assert_eq!(map_column_type("varchar(255)", &no_custom()), "String");
    }

    #[test]
    fn custom_mapping_overrides_builtin() {
        let mut custom = BTreeMap::new();
        custom.insert("VARCHAR".to_string(), "Text".to_string());
        assert_eq!(map_column_type("VARCHAR", &custom), "Text");
        assert_eq!(map_column_type("varchar(64)", &custom), "Text");
    }

    #[test]
    fn affinity_covers_dialect_spellings() {
        assert_eq!(map_column_type("UNSIGNED BIG INT", &no_custom()), "i64");
        assert_eq!(
            map_column_type("VARYING CHARACTER(70)", &no_custom()),
            "String"
        );
    }

    #[test]
    fn unknown_type_falls_back_to_value() {
        assert_eq!(
            map_column_type("GEOMETRY", &no_custom()),
            "serde_json::Value"
        );
    }

    #[test]
    fn nullable_columns_wrap_in_option() {
        let column = ColumnInfo {
            ordinal_position: 1,
            name: "email".to_string(),
            native_type: "TEXT".to_string(),
            is_nullable: true,
            default: None,
            is_primary_key: false,
            is_auto_increment: false,
            max_length: None,
            numeric_precision: None,
            numeric_scale: None,
        };
        assert_eq!(mapped_rust_type(&column, &no_custom()), "Option<String>");
    }

    #[test]
    fn timestamp_families_map_to_chrono() {
        assert_eq!(
            map_column_type("timestamp with time zone", &no_custom()),
            "chrono::DateTime<chrono::Utc>"
        );
        assert_eq!(
            map_column_type("DATETIME", &no_custom()),
            "chrono::NaiveDateTime"
        );
    }
}
