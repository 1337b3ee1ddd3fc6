//! Parameterized statement assembly for the repository layer.
//!
//! Exactly the statements the repositories need, not a general query
//! builder. Identifiers are always quoted; placeholders follow the
//! executor's dialect style.

use crate::executor::ParamStyle;

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn predicate(columns: &[String], style: ParamStyle, first_index: usize) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(offset, column)| {
            format!(
                "{} = {}",
                quote_ident(column),
                style.placeholder(first_index + offset)
            )
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

pub fn select_all(table: &str) -> String {
    format!("SELECT * FROM {}", quote_ident(table))
}

pub fn select_by_key(table: &str, key_columns: &[String], style: ParamStyle) -> String {
    format!(
        "SELECT * FROM {} WHERE {}",
        quote_ident(table),
        predicate(key_columns, style, 1)
    )
}

pub fn select_by_column(table: &str, column: &str, style: ParamStyle) -> String {
    format!(
        "SELECT * FROM {} WHERE {} = {}",
        quote_ident(table),
        quote_ident(column),
        style.placeholder(1)
    )
}

/// `IN` query over `count` placeholders; callers guarantee `count > 0`.
pub fn select_in(table: &str, column: &str, count: usize, style: ParamStyle) -> String {
    let placeholders: Vec<String> = (1..=count).map(|index| style.placeholder(index)).collect();
    format!(
        "SELECT * FROM {} WHERE {} IN ({})",
        quote_ident(table),
        quote_ident(column),
        placeholders.join(", ")
    )
}

pub fn insert(table: &str, columns: &[String], style: ParamStyle) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table));
    }
    let names: Vec<String> = columns.iter().map(|column| quote_ident(column)).collect();
    let placeholders: Vec<String> = (1..=columns.len())
        .map(|index| style.placeholder(index))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        names.join(", "),
        placeholders.join(", ")
    )
}

pub fn insert_returning(table: &str, columns: &[String], style: ParamStyle) -> String {
    format!("{} RETURNING *", insert(table, columns, style))
}

/// `UPDATE` with set placeholders first, then key placeholders.
pub fn update(
    table: &str,
    set_columns: &[String],
    key_columns: &[String],
    style: ParamStyle,
) -> String {
    let assignments: Vec<String> = set_columns
        .iter()
        .enumerate()
        .map(|(offset, column)| {
            format!("{} = {}", quote_ident(column), style.placeholder(offset + 1))
        })
        .collect();
    format!(
        "UPDATE {} SET {} WHERE {}",
        quote_ident(table),
        assignments.join(", "),
        predicate(key_columns, style, set_columns.len() + 1)
    )
}

pub fn delete(table: &str, key_columns: &[String], style: ParamStyle) -> String {
    format!(
        "DELETE FROM {} WHERE {}",
        quote_ident(table),
        predicate(key_columns, style, 1)
    )
}

pub fn count(table: &str) -> String {
    format!("SELECT COUNT(*) AS count FROM {}", quote_ident(table))
}

pub fn count_by_key(table: &str, key_columns: &[String], style: ParamStyle) -> String {
    format!(
        "SELECT COUNT(*) AS count FROM {} WHERE {}",
        quote_ident(table),
        predicate(key_columns, style, 1)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn key_predicates_number_placeholders_per_style() {
        assert_eq!(
            select_by_key("users", &cols(&["id"]), ParamStyle::Question),
            r#"SELECT * FROM "users" WHERE "id" = ?"#
        );
        assert_eq!(
            select_by_key("pairs", &cols(&["a", "b"]), ParamStyle::Dollar),
            r#"SELECT * FROM "pairs" WHERE "a" = $1 AND "b" = $2"#
        );
    }

    #[test]
    fn update_numbers_set_then_key() {
        assert_eq!(
            update("users", &cols(&["name", "email"]), &cols(&["id"]), ParamStyle::Dollar),
            r#"UPDATE "users" SET "name" = $1, "email" = $2 WHERE "id" = $3"#
        );
    }

    #[test]
    fn in_list_expands_placeholders() {
        assert_eq!(
            select_in("posts", "user_id", 3, ParamStyle::Question),
            r#"SELECT * FROM "posts" WHERE "user_id" IN (?, ?, ?)"#
        );
    }

    #[test]
    fn empty_insert_uses_default_values() {
        assert_eq!(
            insert("log", &[], ParamStyle::Question),
            r#"INSERT INTO "log" DEFAULT VALUES"#
        );
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }
}
