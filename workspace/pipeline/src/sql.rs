//! Small helpers for the few statements SeaORM's query builder cannot express
//! (`CREATE TABLE ... AS`, `REINDEX`, `ANALYZE`, windowed sub-joins).

use sea_orm::{ConnectionTrait, DbBackend, Statement, Value};

use crate::error::Result;

/// Quotes an identifier for the given backend.
pub fn quote_ident(backend: DbBackend, ident: &str) -> String {
    match backend {
        DbBackend::MySql => format!("`{}`", ident.replace('`', "``")),
        DbBackend::Postgres | DbBackend::Sqlite => format!("\"{}\"", ident.replace('"', "\"\"")),
    }
}

/// Positional bind placeholder number `n` (1-based).
pub fn placeholder(backend: DbBackend, n: usize) -> String {
    match backend {
        DbBackend::Postgres => format!("${n}"),
        DbBackend::MySql | DbBackend::Sqlite => "?".to_string(),
    }
}

/// Runs a `SELECT COUNT(*) AS occurrences ...` statement and returns the count.
pub async fn query_count<C: ConnectionTrait>(conn: &C, sql: String) -> Result<i64> {
    let backend = conn.get_database_backend();
    let row = conn
        .query_one(Statement::from_string(backend, sql))
        .await?;
    match row {
        Some(row) => Ok(row.try_get::<i64>("", "occurrences")?),
        None => Ok(0),
    }
}

pub async fn count_rows<C: ConnectionTrait>(conn: &C, table: &str) -> Result<i64> {
    let backend = conn.get_database_backend();
    query_count(
        conn,
        format!(
            "SELECT COUNT(*) AS occurrences FROM {}",
            quote_ident(backend, table)
        ),
    )
    .await
}

/// Counts `child` rows whose `fk` column is NULL or points at no `parent.id`.
pub async fn count_unresolved<C: ConnectionTrait>(
    conn: &C,
    child: &str,
    fk: &str,
    parent: &str,
) -> Result<i64> {
    let backend = conn.get_database_backend();
    let (child, fk, parent, id) = (
        quote_ident(backend, child),
        quote_ident(backend, fk),
        quote_ident(backend, parent),
        quote_ident(backend, "id"),
    );
    query_count(
        conn,
        format!(
            "SELECT COUNT(*) AS occurrences FROM {child} c \
             LEFT JOIN {parent} p ON p.{id} = c.{fk} \
             WHERE c.{fk} IS NULL OR p.{id} IS NULL"
        ),
    )
    .await
}

/// Whether a table named `table` exists in the current schema.
pub async fn table_exists<C: ConnectionTrait>(conn: &C, table: &str) -> Result<bool> {
    let backend = conn.get_database_backend();
    let sql = match backend {
        DbBackend::Postgres => format!(
            "SELECT COUNT(*) AS occurrences FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = {}",
            placeholder(backend, 1)
        ),
        DbBackend::MySql => format!(
            "SELECT COUNT(*) AS occurrences FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = {}",
            placeholder(backend, 1)
        ),
        DbBackend::Sqlite => format!(
            "SELECT COUNT(*) AS occurrences FROM sqlite_master \
             WHERE type = 'table' AND name = {}",
            placeholder(backend, 1)
        ),
    };
    let row = conn
        .query_one(Statement::from_sql_and_values(
            backend,
            sql,
            [Value::from(table.to_string())],
        ))
        .await?;
    let count = match row {
        Some(row) => row.try_get::<i64>("", "occurrences")?,
        None => 0,
    };
    Ok(count > 0)
}
