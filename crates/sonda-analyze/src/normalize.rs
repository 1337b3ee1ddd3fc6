use once_cell::sync::Lazy;
use regex::Regex;

/// Statement class of an observed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOp {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl QueryOp {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryOp::Select => "select",
            QueryOp::Insert => "insert",
            QueryOp::Update => "update",
            QueryOp::Delete => "delete",
            QueryOp::Other => "other",
        }
    }
}

static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"'(?:[^']|'')*'").unwrap());
static DOLLAR_PARAM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\d+").unwrap());
static NUMBER_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalize a query so repeated executions with different parameters
/// collapse to one canonical form: literals and placeholders become `?`,
/// whitespace collapses, casing is folded.
pub fn normalize(sql: &str) -> String {
    let stripped = STRING_LITERAL.replace_all(sql, "?");
    let stripped = DOLLAR_PARAM.replace_all(&stripped, "?");
    let stripped = NUMBER_LITERAL.replace_all(&stripped, "?");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    collapsed.trim().to_ascii_lowercase()
}

/// Classify a statement by its leading keyword.
pub fn classify(sql: &str) -> QueryOp {
    let first = sql.trim_start().split_whitespace().next().unwrap_or("");
    match first.to_ascii_uppercase().as_str() {
        "SELECT" => QueryOp::Select,
        "INSERT" => QueryOp::Insert,
        "UPDATE" => QueryOp::Update,
        "DELETE" => QueryOp::Delete,
        _ => QueryOp::Other,
    }
}

static FROM_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bfrom\s+["`]?([a-zA-Z_][a-zA-Z0-9_]*)"#).unwrap());
static WHERE_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bwhere\b(.*)").unwrap());
static COMPARED_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["`]?([a-zA-Z_][a-zA-Z0-9_]*)["`]?\s*(?:=|<=|>=|<|>)"#).unwrap());

/// Heuristic extraction of the table a SELECT reads from.
pub fn table_from_query(sql: &str) -> Option<String> {
    FROM_TABLE
        .captures(sql)
        .map(|caps| caps[1].to_ascii_lowercase())
}

/// Heuristic extraction of column names compared with `=`/`<`/`>` in the
/// WHERE clause. This is regex matching, not SQL parsing: false negatives
/// on complex predicates are expected and acceptable, and nothing
/// correctness-bearing may consume this.
pub fn where_columns(sql: &str) -> Vec<String> {
    let clause = match WHERE_CLAUSE.captures(sql) {
        Some(caps) => caps[1].to_string(),
        None => return Vec::new(),
    };

    let mut columns = Vec::new();
    for caps in COMPARED_COLUMN.captures_iter(&clause) {
        let column = caps[1].to_ascii_lowercase();
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literals_and_params_collapse() {
        assert_eq!(
            normalize("SELECT * FROM users WHERE id = 42"),
            normalize("select *   from users where id = 7")
        );
        assert_eq!(
            normalize("SELECT * FROM users WHERE name = 'Ada'"),
            "select * from users where name = ?"
        );
        assert_eq!(
            normalize("SELECT * FROM users WHERE id = $1"),
            "select * from users where id = ?"
        );
    }

    #[test]
    fn escaped_quotes_stay_inside_the_literal() {
        assert_eq!(
            normalize("SELECT * FROM t WHERE note = 'it''s fine' AND id = 3"),
            "select * from t where note = ? and id = ?"
        );
    }

    #[test]
    fn classification_by_leading_keyword() {
        assert_eq!(classify("  SELECT 1"), QueryOp::Select);
        assert_eq!(classify("insert into t values (1)"), QueryOp::Insert);
        assert_eq!(classify("UPDATE t SET a = 1"), QueryOp::Update);
        assert_eq!(classify("delete from t"), QueryOp::Delete);
        assert_eq!(classify("PRAGMA table_info(t)"), QueryOp::Other);
    }

    #[test]
    fn where_column_extraction() {
        let sql = "select * from posts where user_id = ? and created_at > ? order by id";
        assert_eq!(
            where_columns(sql),
            vec!["user_id".to_string(), "created_at".to_string()]
        );
        assert!(where_columns("select * from posts").is_empty());
    }

    #[test]
    fn from_table_extraction() {
        assert_eq!(
            table_from_query("select * from \"posts\" where id = ?"),
            Some("posts".to_string())
        );
        assert_eq!(table_from_query("pragma foo"), None);
    }
}
