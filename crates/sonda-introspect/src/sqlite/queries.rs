use sqlx::{Row, SqlitePool};

use sonda_core::{Error, Result};

pub struct RawSqliteColumn {
    pub cid: i64,
    pub name: String,
    pub native_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    /// 1-based position within the primary key; 0 when not part of it.
    pub pk_position: i64,
}

pub struct RawSqliteIndex {
    pub name: String,
    pub is_unique: bool,
}

pub struct RawSqliteForeignKey {
    pub id: i64,
    pub seq: i64,
    pub column: String,
    pub referenced_table: String,
    /// `None` when the constraint references the target's implicit key.
    pub referenced_column: Option<String>,
    pub on_update: String,
    pub on_delete: String,
}

pub async fn list_table_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        select name from sqlite_master
        where type = 'table' and name not like 'sqlite_%'
        order by name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection("listing tables", err))?;

    rows.into_iter()
        .map(|row| {
            row.try_get::<String, _>("name")
                .map_err(|err| Error::connection("decoding table name", err))
        })
        .collect()
}

pub async fn list_view_names(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        select name from sqlite_master
        where type = 'view' and name not like 'sqlite_%'
        order by name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection("listing views", err))?;

    rows.into_iter()
        .map(|row| {
            row.try_get::<String, _>("name")
                .map_err(|err| Error::connection("decoding view name", err))
        })
        .collect()
}

/// Source DDL for a table, used by the auto-increment heuristic.
pub async fn table_ddl(pool: &SqlitePool, table: &str) -> Result<Option<String>> {
    let row = sqlx::query("select sql from sqlite_master where type = 'table' and name = ?1")
        .bind(table)
        .fetch_optional(pool)
        .await
        .map_err(|err| Error::connection(format!("fetching DDL for {table}"), err))?;

    match row {
        Some(row) => row
            .try_get::<Option<String>, _>("sql")
            .map_err(|err| Error::connection("decoding table DDL", err)),
        None => Ok(None),
    }
}

pub async fn table_info(pool: &SqlitePool, table: &str) -> Result<Vec<RawSqliteColumn>> {
    let rows = sqlx::query(
        r#"
        select cid, name, type, "notnull", dflt_value, pk
        from pragma_table_info(?1)
        order by cid
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection(format!("listing columns of {table}"), err))?;

    rows.into_iter()
        .map(|row| {
            Ok(RawSqliteColumn {
                cid: row
                    .try_get("cid")
                    .map_err(|err| Error::connection("decoding column", err))?,
                name: row
                    .try_get("name")
                    .map_err(|err| Error::connection("decoding column", err))?,
                native_type: row
                    .try_get("type")
                    .map_err(|err| Error::connection("decoding column", err))?,
                not_null: row
                    .try_get::<i64, _>("notnull")
                    .map_err(|err| Error::connection("decoding column", err))?
                    != 0,
                default: row
                    .try_get("dflt_value")
                    .map_err(|err| Error::connection("decoding column", err))?,
                pk_position: row
                    .try_get("pk")
                    .map_err(|err| Error::connection("decoding column", err))?,
            })
        })
        .collect()
}

pub async fn index_list(pool: &SqlitePool, table: &str) -> Result<Vec<RawSqliteIndex>> {
    let rows = sqlx::query(
        r#"
        select name, "unique"
        from pragma_index_list(?1)
        order by name
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection(format!("listing indexes of {table}"), err))?;

    rows.into_iter()
        .map(|row| {
            Ok(RawSqliteIndex {
                name: row
                    .try_get("name")
                    .map_err(|err| Error::connection("decoding index", err))?,
                is_unique: row
                    .try_get::<i64, _>("unique")
                    .map_err(|err| Error::connection("decoding index", err))?
                    != 0,
            })
        })
        .collect()
}

/// Indexed column names in index order. Expression members report no name
/// and are skipped.
pub async fn index_columns(pool: &SqlitePool, index: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        select seqno, name
        from pragma_index_info(?1)
        order by seqno
        "#,
    )
    .bind(index)
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection(format!("listing columns of index {index}"), err))?;

    let mut columns = Vec::new();
    for row in rows {
        let name: Option<String> = row
            .try_get("name")
            .map_err(|err| Error::connection("decoding index column", err))?;
        if let Some(name) = name {
            columns.push(name);
        }
    }
    Ok(columns)
}

pub async fn foreign_key_list(pool: &SqlitePool, table: &str) -> Result<Vec<RawSqliteForeignKey>> {
    let rows = sqlx::query(
        r#"
        select id, seq, "table", "from", "to", on_update, on_delete
        from pragma_foreign_key_list(?1)
        order by id, seq
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection(format!("listing foreign keys of {table}"), err))?;

    rows.into_iter()
        .map(|row| {
            Ok(RawSqliteForeignKey {
                id: row
                    .try_get("id")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
                seq: row
                    .try_get("seq")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
                column: row
                    .try_get("from")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
                referenced_table: row
                    .try_get("table")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
                referenced_column: row
                    .try_get("to")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
                on_update: row
                    .try_get("on_update")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
                on_delete: row
                    .try_get("on_delete")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
            })
        })
        .collect()
}

pub async fn database_file(pool: &SqlitePool) -> Result<Option<String>> {
    let row = sqlx::query("select file from pragma_database_list where name = 'main'")
        .fetch_optional(pool)
        .await
        .map_err(|err| Error::connection("reading database list", err))?;

    let file = match row {
        Some(row) => row
            .try_get::<Option<String>, _>("file")
            .map_err(|err| Error::connection("decoding database file", err))?,
        None => None,
    };

    Ok(file.filter(|file| !file.is_empty()))
}
