//! Warehouse table queries.
//!
//! Warehouse tables have user-defined shapes, so rows are read and written
//! dynamically: columns come from `pragma_table_info` and cells are decoded
//! by their stored SQLite type.

use autoflow_tools::{ColumnType, Table};
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, SqliteConnection, TypeInfo, ValueRef};

use crate::db::models::WriteMode;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

const COLUMNS_SQL: &str = "SELECT name, type FROM pragma_table_info(?) ORDER BY cid";

/// Keep only alphanumerics and `_` in a table name.
pub fn sanitize_table_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Quote an identifier for interpolation into SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_type(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Integer => "INTEGER",
        ColumnType::Float => "REAL",
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::Text | ColumnType::Json | ColumnType::Empty => "TEXT",
    }
}

/// List user tables, sorted by name.
pub async fn list_tables(pool: &DbPool) -> AppResult<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT name
        FROM sqlite_master
        WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(name,)| name).collect())
}

/// Whether a table exists.
pub async fn table_exists(pool: &DbPool, name: &str) -> AppResult<bool> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}

async fn table_columns(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Vec<(String, String)>, sqlx::Error> {
    sqlx::query_as(COLUMNS_SQL).bind(name).fetch_all(conn).await
}

fn decode_cell(row: &SqliteRow, idx: usize, boolean: bool) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(idx)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let kind = raw.type_info().name().to_string();

    let value = match kind.as_str() {
        "INTEGER" => {
            let v: i64 = row.try_get_unchecked(idx)?;
            if boolean {
                Value::Bool(v != 0)
            } else {
                Value::from(v)
            }
        }
        "REAL" => {
            let v: f64 = row.try_get_unchecked(idx)?;
            serde_json::Number::from_f64(v)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }
        "BLOB" => {
            let v: Vec<u8> = row.try_get_unchecked(idx)?;
            Value::String(String::from_utf8_lossy(&v).into_owned())
        }
        _ => Value::String(row.try_get_unchecked::<String, _>(idx)?),
    };
    Ok(value)
}

/// Read a table, optionally bounded to the first `limit` rows.
pub async fn read_table(pool: &DbPool, name: &str, limit: Option<i64>) -> AppResult<Table> {
    let mut conn = pool.acquire().await?;

    let columns = table_columns(&mut conn, name).await?;
    if columns.is_empty() {
        return Err(AppError::NotFound(format!("Table '{}' not found", name)));
    }

    let sql = match limit {
        Some(_) => format!("SELECT * FROM {} LIMIT ?", quote_ident(name)),
        None => format!("SELECT * FROM {}", quote_ident(name)),
    };
    let mut query = sqlx::query(&sql);
    if let Some(n) = limit {
        query = query.bind(n);
    }
    let rows = query.fetch_all(&mut *conn).await?;

    let booleans: Vec<bool> = columns
        .iter()
        .map(|(_, declared)| declared.eq_ignore_ascii_case("BOOLEAN"))
        .collect();
    let mut table = Table::new(columns.into_iter().map(|(name, _)| name).collect());
    for row in &rows {
        let cells = booleans
            .iter()
            .enumerate()
            .map(|(idx, boolean)| decode_cell(row, idx, *boolean))
            .collect::<Result<Vec<_>, _>>()?;
        table.push_row(cells);
    }

    Ok(table)
}

fn bind_cell<'q>(query: SqliteQuery<'q>, cell: &Value) -> SqliteQuery<'q> {
    match cell {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        other => query.bind(other.to_string()),
    }
}

/// Write a table. Returns the number of rows written.
///
/// Replace drops any existing table first. Append creates the table if
/// missing and adds columns it does not have yet. The write is atomic.
pub async fn write_table(
    pool: &DbPool,
    name: &str,
    table: &Table,
    mode: WriteMode,
) -> AppResult<u64> {
    if table.num_columns() == 0 {
        return Err(AppError::Validation(format!(
            "Cannot write table '{}' without columns",
            name
        )));
    }

    let quoted = quote_ident(name);
    let types = table.column_types();
    let mut tx = pool.begin().await?;

    let existing = table_columns(&mut tx, name).await?;
    if mode == WriteMode::Replace || existing.is_empty() {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quoted))
            .execute(&mut *tx)
            .await?;

        let definitions = table
            .columns()
            .iter()
            .zip(&types)
            .map(|(column, column_type)| format!("{} {}", quote_ident(column), sql_type(*column_type)))
            .collect::<Vec<_>>()
            .join(", ");
        sqlx::query(&format!("CREATE TABLE {} ({})", quoted, definitions))
            .execute(&mut *tx)
            .await?;
    } else {
        for (column, column_type) in table.columns().iter().zip(&types) {
            if !existing.iter().any(|(name, _)| name == column) {
                sqlx::query(&format!(
                    "ALTER TABLE {} ADD COLUMN {} {}",
                    quoted,
                    quote_ident(column),
                    sql_type(*column_type)
                ))
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    let column_list = table
        .columns()
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; table.num_columns()].join(", ");
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quoted, column_list, placeholders
    );

    for row in table.rows() {
        let mut query = sqlx::query(&insert);
        for cell in row {
            query = bind_cell(query, cell);
        }
        query.execute(&mut *tx).await?;
    }

    tx.commit().await?;

    tracing::debug!(
        table = %name,
        rows = table.num_rows(),
        mode = ?mode,
        "Table written"
    );

    Ok(table.num_rows() as u64)
}

/// Drop a table if it exists.
pub async fn drop_table(pool: &DbPool, name: &str) -> AppResult<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(name)))
        .execute(pool)
        .await?;
    Ok(())
}
