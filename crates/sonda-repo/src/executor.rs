use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, PgPool, Row as _, SqlitePool, TypeInfo, ValueRef};

use sonda_core::{Error, Result};
use sonda_introspect::DatabaseConnection;

/// A result row shipped across the executor boundary.
pub type Row = serde_json::Map<String, Value>;

/// Placeholder style used by the dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `?` positional placeholders (SQLite).
    Question,
    /// `$1`-style numbered placeholders (PostgreSQL).
    Dollar,
}

impl ParamStyle {
    /// Render the placeholder for a 1-based parameter index.
    pub fn placeholder(self, index: usize) -> String {
        match self {
            ParamStyle::Question => "?".to_string(),
            ParamStyle::Dollar => format!("${index}"),
        }
    }
}

/// Outcome of a mutating statement.
#[derive(Debug, Clone, Copy)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Identifier assigned by the database for auto-increment inserts,
    /// when the dialect reports one.
    pub last_insert_id: Option<i64>,
}

/// The statement-execution collaborator this engine sits on top of.
///
/// The engine issues parameterized SQL and JSON-shaped parameters; the
/// executor owns actual I/O, timeouts and any retry policy. Everything in
/// this crate stays behind this seam so tests can substitute an
/// instrumented fake.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    fn param_style(&self) -> ParamStyle;

    /// Whether `INSERT ... RETURNING *` round-trips are supported.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Cheap liveness probe against the connection.
    async fn ping(&self) -> Result<()>;

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Row>>;

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecOutcome>;
}

/// Select the bundled executor for a connection.
pub fn executor_for(connection: &DatabaseConnection) -> Arc<dyn StatementExecutor> {
    match connection {
        DatabaseConnection::Sqlite(pool) => Arc::new(SqliteExecutor::new(pool.clone())),
        DatabaseConnection::Postgres(pool) => Arc::new(PostgresExecutor::new(pool.clone())),
    }
}

/// Reference executor backed by a SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    pool: SqlitePool,
}

impl SqliteExecutor {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn bind_params<'q>(
        mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
        params: &'q [Value],
    ) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<String>),
                Value::Bool(value) => query.bind(*value),
                Value::Number(value) => {
                    if let Some(int) = value.as_i64() {
                        query.bind(int)
                    } else {
                        query.bind(value.as_f64().unwrap_or(f64::NAN))
                    }
                }
                Value::String(value) => query.bind(value.as_str()),
                // Structured values travel as their JSON text.
                other => query.bind(other.to_string()),
            };
        }
        query
    }
}

#[async_trait]
impl StatementExecutor for SqliteExecutor {
    fn param_style(&self) -> ParamStyle {
        ParamStyle::Question
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("select 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::connection("liveness probe", err))?;
        Ok(())
    }

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let rows = Self::bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Error::connection(format!("executing: {sql}"), err))?;
        rows.iter().map(sqlite_row_to_json).collect()
    }

    async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let row = Self::bind_params(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::connection(format!("executing: {sql}"), err))?;
        row.as_ref().map(sqlite_row_to_json).transpose()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecOutcome> {
        let outcome = Self::bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::connection(format!("executing: {sql}"), err))?;
        Ok(ExecOutcome {
            rows_affected: outcome.rows_affected(),
            last_insert_id: Some(outcome.last_insert_rowid()),
        })
    }
}

fn sqlite_row_to_json(row: &SqliteRow) -> Result<Row> {
    let mut map = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row
            .try_get_raw(index)
            .map_err(|err| Error::connection("reading column", err))?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            decode_sqlite_value(row, index, &type_name)?
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

fn decode_sqlite_value(row: &SqliteRow, index: usize, type_name: &str) -> Result<Value> {
    let decode_err = |err| Error::connection("decoding column", err);
    let value = match type_name {
        "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" => {
            Value::from(row.try_get::<i64, _>(index).map_err(decode_err)?)
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            Value::from(row.try_get::<f64, _>(index).map_err(decode_err)?)
        }
        "BOOLEAN" | "BOOL" => Value::Bool(row.try_get::<bool, _>(index).map_err(decode_err)?),
        "BLOB" => {
            let bytes = row.try_get::<Vec<u8>, _>(index).map_err(decode_err)?;
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        // TEXT and the declared date/time affinities are all stored as text.
        _ => Value::String(row.try_get::<String, _>(index).map_err(decode_err)?),
    };
    Ok(value)
}

/// Executor backed by a PostgreSQL pool.
///
/// Decodes the common scalar families; exotic types degrade to `null` with
/// a debug log, matching this dialect's partial status.
#[derive(Debug, Clone)]
pub struct PostgresExecutor {
    pool: PgPool,
}

impl PostgresExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn bind_params<'q>(
        mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
        params: &'q [Value],
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        for param in params {
            query = match param {
                Value::Null => query.bind(None::<String>),
                Value::Bool(value) => query.bind(*value),
                Value::Number(value) => {
                    if let Some(int) = value.as_i64() {
                        query.bind(int)
                    } else {
                        query.bind(value.as_f64().unwrap_or(f64::NAN))
                    }
                }
                Value::String(value) => query.bind(value.as_str()),
                other => query.bind(other.clone()),
            };
        }
        query
    }
}

#[async_trait]
impl StatementExecutor for PostgresExecutor {
    fn param_style(&self) -> ParamStyle {
        ParamStyle::Dollar
    }

    fn supports_returning(&self) -> bool {
        true
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("select 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::connection("liveness probe", err))?;
        Ok(())
    }

    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let rows = Self::bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| Error::connection(format!("executing: {sql}"), err))?;
        rows.iter().map(pg_row_to_json).collect()
    }

    async fn fetch_optional(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        let row = Self::bind_params(sqlx::query(sql), params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::connection(format!("executing: {sql}"), err))?;
        row.as_ref().map(pg_row_to_json).transpose()
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecOutcome> {
        let outcome = Self::bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(|err| Error::connection(format!("executing: {sql}"), err))?;
        Ok(ExecOutcome {
            rows_affected: outcome.rows_affected(),
            last_insert_id: None,
        })
    }
}

fn pg_row_to_json(row: &PgRow) -> Result<Row> {
    let mut map = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row
            .try_get_raw(index)
            .map_err(|err| Error::connection("reading column", err))?;
        let value = if raw.is_null() {
            Value::Null
        } else {
            let type_name = raw.type_info().name().to_ascii_uppercase();
            decode_pg_value(row, index, &type_name, column.name())?
        };
        map.insert(column.name().to_string(), value);
    }
    Ok(map)
}

fn decode_pg_value(row: &PgRow, index: usize, type_name: &str, column: &str) -> Result<Value> {
    let decode_err = |err| Error::connection("decoding column", err);
    let value = match type_name {
        "BOOL" => Value::Bool(row.try_get::<bool, _>(index).map_err(decode_err)?),
        "INT2" => Value::from(row.try_get::<i16, _>(index).map_err(decode_err)? as i64),
        "INT4" => Value::from(row.try_get::<i32, _>(index).map_err(decode_err)? as i64),
        "INT8" => Value::from(row.try_get::<i64, _>(index).map_err(decode_err)?),
        "FLOAT4" => Value::from(row.try_get::<f32, _>(index).map_err(decode_err)? as f64),
        "FLOAT8" => Value::from(row.try_get::<f64, _>(index).map_err(decode_err)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
            Value::String(row.try_get::<String, _>(index).map_err(decode_err)?)
        }
        "JSON" | "JSONB" => row.try_get::<Value, _>(index).map_err(decode_err)?,
        "DATE" => Value::String(
            row.try_get::<chrono::NaiveDate, _>(index)
                .map_err(decode_err)?
                .to_string(),
        ),
        "TIME" => Value::String(
            row.try_get::<chrono::NaiveTime, _>(index)
                .map_err(decode_err)?
                .to_string(),
        ),
        "TIMESTAMP" => Value::String(
            row.try_get::<chrono::NaiveDateTime, _>(index)
                .map_err(decode_err)?
                .to_string(),
        ),
        "TIMESTAMPTZ" => Value::String(
            row.try_get::<chrono::DateTime<chrono::Utc>, _>(index)
                .map_err(decode_err)?
                .to_rfc3339(),
        ),
        "BYTEA" => {
            let bytes = row.try_get::<Vec<u8>, _>(index).map_err(decode_err)?;
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }
        other => {
            tracing::debug!(event = "undecoded_pg_type", column = %column, pg_type = %other);
            Value::Null
        }
    };
    Ok(value)
}
