use sqlx::{PgPool, Row};

use sonda_core::{Error, Result};

pub struct RawPgColumn {
    pub ordinal_position: i32,
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub default: Option<String>,
    pub is_identity: bool,
    pub character_max_length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
}

pub struct RawPgForeignKey {
    pub name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_update: String,
    pub on_delete: String,
}

pub struct RawPgIndexColumn {
    pub index_name: String,
    pub is_unique: bool,
    pub column: String,
}

pub async fn fetch_database_name(pool: &PgPool) -> Result<String> {
    sqlx::query_scalar::<_, String>("select current_database()")
        .fetch_one(pool)
        .await
        .map_err(|err| Error::connection("fetching database name", err))
}

pub async fn list_tables(pool: &PgPool) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query(
        r#"
        select table_schema, table_name
        from information_schema.tables
        where table_type = 'BASE TABLE'
          and table_schema not in ('pg_catalog', 'information_schema')
        order by table_schema, table_name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection("listing tables", err))?;

    rows.into_iter()
        .map(|row| {
            let schema: String = row
                .try_get("table_schema")
                .map_err(|err| Error::connection("decoding table", err))?;
            let name: String = row
                .try_get("table_name")
                .map_err(|err| Error::connection("decoding table", err))?;
            Ok((schema, name))
        })
        .collect()
}

pub async fn list_columns(pool: &PgPool, table: &str) -> Result<Vec<RawPgColumn>> {
    let rows = sqlx::query(
        r#"
        select
          ordinal_position,
          column_name,
          data_type,
          is_nullable,
          column_default,
          is_identity,
          character_maximum_length,
          numeric_precision,
          numeric_scale
        from information_schema.columns
        where table_name = $1
          and table_schema not in ('pg_catalog', 'information_schema')
        order by ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection(format!("listing columns of {table}"), err))?;

    rows.into_iter()
        .map(|row| {
            let is_nullable: String = row
                .try_get("is_nullable")
                .map_err(|err| Error::connection("decoding column", err))?;
            let is_identity: String = row
                .try_get("is_identity")
                .map_err(|err| Error::connection("decoding column", err))?;
            Ok(RawPgColumn {
                ordinal_position: row
                    .try_get("ordinal_position")
                    .map_err(|err| Error::connection("decoding column", err))?,
                name: row
                    .try_get("column_name")
                    .map_err(|err| Error::connection("decoding column", err))?,
                data_type: row
                    .try_get("data_type")
                    .map_err(|err| Error::connection("decoding column", err))?,
                is_nullable: is_nullable == "YES",
                default: row
                    .try_get("column_default")
                    .map_err(|err| Error::connection("decoding column", err))?,
                is_identity: is_identity == "YES",
                character_max_length: row
                    .try_get("character_maximum_length")
                    .map_err(|err| Error::connection("decoding column", err))?,
                numeric_precision: row
                    .try_get("numeric_precision")
                    .map_err(|err| Error::connection("decoding column", err))?,
                numeric_scale: row
                    .try_get("numeric_scale")
                    .map_err(|err| Error::connection("decoding column", err))?,
            })
        })
        .collect()
}

pub async fn primary_key_columns(pool: &PgPool, table: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        select kcu.column_name
        from information_schema.table_constraints tc
        join information_schema.key_column_usage kcu
          on tc.constraint_name = kcu.constraint_name
         and tc.table_schema = kcu.table_schema
        where tc.constraint_type = 'PRIMARY KEY'
          and tc.table_name = $1
        order by kcu.ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection(format!("fetching primary key of {table}"), err))?;

    rows.into_iter()
        .map(|row| {
            row.try_get::<String, _>("column_name")
                .map_err(|err| Error::connection("decoding primary key", err))
        })
        .collect()
}

pub async fn list_foreign_keys(pool: &PgPool, table: &str) -> Result<Vec<RawPgForeignKey>> {
    let rows = sqlx::query(
        r#"
        select
          con.conname as name,
          src_att.attname as column_name,
          ref_rel.relname as referenced_table,
          ref_att.attname as referenced_column,
          con.confupdtype::text as on_update_code,
          con.confdeltype::text as on_delete_code
        from pg_constraint con
        join pg_class src_rel on src_rel.oid = con.conrelid
        join pg_namespace src_nsp on src_nsp.oid = src_rel.relnamespace
        join pg_class ref_rel on ref_rel.oid = con.confrelid
        join unnest(con.conkey) with ordinality as s_ord(attnum, ordinality) on true
        join pg_attribute src_att
          on src_att.attrelid = src_rel.oid and src_att.attnum = s_ord.attnum
        join unnest(con.confkey) with ordinality as t_ord(attnum, ordinality)
          on t_ord.ordinality = s_ord.ordinality
        join pg_attribute ref_att
          on ref_att.attrelid = ref_rel.oid and ref_att.attnum = t_ord.attnum
        where src_rel.relname = $1
          and src_nsp.nspname not in ('pg_catalog', 'information_schema')
          and con.contype = 'f'
        order by con.conname, s_ord.ordinality
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection(format!("listing foreign keys of {table}"), err))?;

    rows.into_iter()
        .map(|row| {
            Ok(RawPgForeignKey {
                name: row
                    .try_get("name")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
                column: row
                    .try_get("column_name")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
                referenced_table: row
                    .try_get("referenced_table")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
                referenced_column: row
                    .try_get("referenced_column")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
                on_update: row
                    .try_get("on_update_code")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
                on_delete: row
                    .try_get("on_delete_code")
                    .map_err(|err| Error::connection("decoding foreign key", err))?,
            })
        })
        .collect()
}

pub async fn list_index_columns(pool: &PgPool, table: &str) -> Result<Vec<RawPgIndexColumn>> {
    let rows = sqlx::query(
        r#"
        select
          idx.relname as index_name,
          i.indisunique as is_unique,
          att.attname as column_name
        from pg_index i
        join pg_class tbl on tbl.oid = i.indrelid
        join pg_namespace nsp on nsp.oid = tbl.relnamespace
        join pg_class idx on idx.oid = i.indexrelid
        join unnest(i.indkey) with ordinality as ord(attnum, ordinality) on true
        join pg_attribute att
          on att.attrelid = tbl.oid and att.attnum = ord.attnum
        where tbl.relname = $1
          and nsp.nspname not in ('pg_catalog', 'information_schema')
          and not i.indisprimary
        order by idx.relname, ord.ordinality
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection(format!("listing indexes of {table}"), err))?;

    rows.into_iter()
        .map(|row| {
            Ok(RawPgIndexColumn {
                index_name: row
                    .try_get("index_name")
                    .map_err(|err| Error::connection("decoding index", err))?,
                is_unique: row
                    .try_get("is_unique")
                    .map_err(|err| Error::connection("decoding index", err))?,
                column: row
                    .try_get("column_name")
                    .map_err(|err| Error::connection("decoding index", err))?,
            })
        })
        .collect()
}

pub async fn list_views(pool: &PgPool) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        select table_name
        from information_schema.views
        where table_schema not in ('pg_catalog', 'information_schema')
        order by table_name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|err| Error::connection("listing views", err))?;

    rows.into_iter()
        .map(|row| {
            row.try_get::<String, _>("table_name")
                .map_err(|err| Error::connection("decoding view name", err))
        })
        .collect()
}
