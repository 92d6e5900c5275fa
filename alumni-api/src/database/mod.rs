pub mod alumni;
pub mod employment;
pub mod files;
pub mod migrations;
pub mod users;

use crate::error::{ApiError, ApiResult};
use crate::query::{fold_case, ListParams, Page};
use crate::store::{Deadline, StoreProbe, Stores};
use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Pooled handle that runs blocking SQLite work off the async runtime
#[derive(Clone)]
pub struct AsyncDbConnection {
    pool: Arc<Pool<SqliteConnectionManager>>,
    query_timeout: Duration,
}

impl AsyncDbConnection {
    pub fn new(pool: Pool<SqliteConnectionManager>, query_timeout: Duration) -> Self {
        Self {
            pool: Arc::new(pool),
            query_timeout,
        }
    }

    /// Run `op` on a pooled connection within the query budget.
    ///
    /// `op` receives the [`Deadline`] and must check it before committing.
    /// If the budget runs out while `op` is still running the caller gets
    /// `Timeout` right away and the late transaction fails its own check.
    pub async fn run<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&mut Connection, &Deadline) -> ApiResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let deadline = Deadline::after(self.query_timeout);

        let task = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            op(&mut *conn, &deadline)
        });

        match tokio::time::timeout(self.query_timeout, task).await {
            Ok(joined) => joined?,
            Err(_) => Err(ApiError::timeout()),
        }
    }
}

/// SQLite's built-in `lower()` and `LIKE` only fold ASCII; searches go
/// through `unicode_lower` instead
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "unicode_lower",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: Option<String> = ctx.get(0)?;
            Ok(value.map(|v| fold_case(&v)))
        },
    )
}

pub struct Database {
    pub async_connection: AsyncDbConnection,
}

impl Database {
    /// Open the database file, run migrations and build the pool
    pub fn new(db_path: &Path, query_timeout: Duration) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Migrate on a plain connection before the pool opens
        {
            let mut conn = Connection::open(db_path)?;
            conn.busy_timeout(query_timeout)?;
            migrations::run_migrations(&mut conn)?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(move |conn| {
            conn.busy_timeout(query_timeout)?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            register_functions(conn)
        });

        let pool = Pool::builder()
            .max_size(8)
            .connection_timeout(query_timeout)
            .build(manager)?;

        Ok(Database {
            async_connection: AsyncDbConnection::new(pool, query_timeout),
        })
    }

    pub fn stores(&self) -> Stores {
        let conn = self.async_connection.clone();
        Stores {
            users: Arc::new(users::SqliteUserStore::new(conn.clone())),
            alumni: Arc::new(alumni::SqliteAlumniStore::new(conn.clone())),
            employment: Arc::new(employment::SqliteEmploymentStore::new(conn.clone())),
            files: Arc::new(files::SqliteFileStore::new(conn.clone())),
            probe: Arc::new(conn),
        }
    }
}

#[async_trait]
impl StoreProbe for AsyncDbConnection {
    async fn ping(&self) -> ApiResult<()> {
        self.run(|conn, _| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}

/// Relational ids are integers; anything else cannot name a row
pub(crate) fn parse_id(id: &str) -> ApiResult<i64> {
    id.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::invalid_argument(format!("Invalid id: {}", id)))
}

/// WHERE clause assembled from fixed SQL fragments and bound values
#[derive(Debug, Default)]
pub(crate) struct Filter {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, clause: &str, values: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.to_string());
        self.values.extend(values);
    }

    /// OR of case-folded `LIKE` over `columns` when the params carry a
    /// search term
    pub fn search(&mut self, params: &ListParams, columns: &[&str]) {
        if !params.has_search() || columns.is_empty() {
            return;
        }
        let pattern = params.like_pattern();
        let clause = columns
            .iter()
            .map(|column| format!("unicode_lower({}) LIKE ? ESCAPE '\\'", column))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.push(
            &format!("({})", clause),
            columns.iter().map(|_| Value::Text(pattern.clone())),
        );
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Count and fetch one page with the same filter.
///
/// `from` is the FROM/JOIN part, `select` the column list, `sort_column` the
/// fully qualified whitelisted column and `id_column` the tie breaker.
#[allow(clippy::too_many_arguments)]
pub(crate) fn fetch_page<T>(
    conn: &Connection,
    select: &str,
    from: &str,
    filter: &Filter,
    sort_column: &str,
    id_column: &str,
    params: &ListParams,
    map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> ApiResult<Page<T>> {
    let where_sql = filter.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM {}{}", from, where_sql);
    let total: i64 = conn.query_row(&count_sql, params_from_iter(filter.values.iter()), |row| {
        row.get(0)
    })?;

    let order = params.order.as_sql();
    let list_sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} {}, {} {} LIMIT ? OFFSET ?",
        select, from, where_sql, sort_column, order, id_column, order
    );

    let mut values = filter.values.clone();
    values.push(Value::Integer(i64::from(params.limit)));
    values.push(Value::Integer(params.offset() as i64));

    let mut stmt = conn.prepare(&list_sql)?;
    let items = stmt
        .query_map(params_from_iter(values.iter()), map)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        total: total.max(0) as u64,
    })
}

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ListQuery, EMPLOYMENT_SORT};

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12").unwrap(), 12);
        assert_eq!(parse_id(" 7 ").unwrap(), 7);
        assert!(parse_id("abc").is_err());
        assert!(parse_id("").is_err());
    }

    #[test]
    fn test_filter_sql() {
        let params = ListParams::resolve(
            &ListQuery {
                search: Some("acme".to_string()),
                ..Default::default()
            },
            &EMPLOYMENT_SORT,
        );
        let mut filter = Filter::new();
        filter.push("e.deleted_at IS NULL", []);
        filter.search(&params, &["e.company_name", "e.job_title"]);

        assert_eq!(
            filter.where_sql(),
            " WHERE e.deleted_at IS NULL AND (unicode_lower(e.company_name) LIKE ? ESCAPE '\\' OR unicode_lower(e.job_title) LIKE ? ESCAPE '\\')"
        );
        assert_eq!(filter.values.len(), 2);
    }

    #[test]
    fn test_unicode_lower_search() {
        let conn = Connection::open_in_memory().unwrap();
        register_functions(&conn).unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT); INSERT INTO t VALUES ('ÉCOLE Über'), (NULL);")
            .unwrap();

        let params = ListParams::resolve(
            &ListQuery {
                search: Some("école".to_string()),
                ..Default::default()
            },
            &EMPLOYMENT_SORT,
        );
        let mut filter = Filter::new();
        filter.search(&params, &["name"]);

        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM t{}", filter.where_sql()),
                params_from_iter(filter.values.iter()),
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_empty_filter() {
        assert_eq!(Filter::new().where_sql(), "");
    }
}
