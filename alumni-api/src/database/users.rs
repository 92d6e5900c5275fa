use crate::database::{fetch_page, now, parse_id, AsyncDbConnection, Filter};
use crate::error::{ApiError, ApiResult, ErrorKind};
use crate::query::{ListParams, Page};
use crate::store::{NewUser, UserStore};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use shared_types::{Role, UserAccount};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, deleted_at";

pub struct SqliteUserStore {
    conn: AsyncDbConnection,
}

impl SqliteUserStore {
    pub fn new(conn: AsyncDbConnection) -> Self {
        Self { conn }
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    let role: String = row.get(4)?;
    Ok(UserAccount {
        id: row.get::<_, i64>(0)?.to_string(),
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: role.parse::<Role>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
        created_at: row.get(5)?,
        deleted_at: row.get(6)?,
    })
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn create(&self, new_user: NewUser) -> ApiResult<UserAccount> {
        self.conn
            .run(move |conn, deadline| {
                let created_at = now();
                let tx = conn.transaction()?;
                let id: i64 = tx
                    .query_row(
                        "INSERT INTO users (username, email, password_hash, role, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5) RETURNING id",
                        params![
                            new_user.username,
                            new_user.email,
                            new_user.password_hash,
                            new_user.role.as_str(),
                            created_at
                        ],
                        |row| row.get(0),
                    )
                    .map_err(|e| match ApiError::from(e) {
                        err if err.kind() == ErrorKind::Conflict => {
                            ApiError::conflict("Username or email already registered")
                        }
                        err => err,
                    })?;
                deadline.check()?;
                tx.commit()?;

                Ok(UserAccount {
                    id: id.to_string(),
                    username: new_user.username,
                    email: new_user.email,
                    password_hash: new_user.password_hash,
                    role: new_user.role,
                    created_at,
                    deleted_at: None,
                })
            })
            .await
    }

    async fn find_by_username(&self, username: &str) -> ApiResult<Option<UserAccount>> {
        let username = username.to_string();
        self.conn
            .run(move |conn, _| {
                let sql = format!(
                    "SELECT {} FROM users WHERE username = ?1 AND deleted_at IS NULL",
                    USER_COLUMNS
                );
                Ok(conn.query_row(&sql, [&username], map_user).optional()?)
            })
            .await
    }

    async fn get(&self, id: &str, include_deleted: bool) -> ApiResult<UserAccount> {
        let id = parse_id(id)?;
        self.conn
            .run(move |conn, _| {
                let mut sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
                if !include_deleted {
                    sql.push_str(" AND deleted_at IS NULL");
                }
                conn.query_row(&sql, [id], map_user)
                    .optional()?
                    .ok_or_else(|| ApiError::not_found("User not found"))
            })
            .await
    }

    async fn list(
        &self,
        params: &ListParams,
        include_deleted: bool,
    ) -> ApiResult<Page<UserAccount>> {
        let params = params.clone();
        self.conn
            .run(move |conn, _| {
                let mut filter = Filter::new();
                if !include_deleted {
                    filter.push("deleted_at IS NULL", []);
                }
                filter.search(&params, params.search_fields);

                fetch_page(
                    conn,
                    USER_COLUMNS,
                    "users",
                    &filter,
                    params.sort_by,
                    "id",
                    &params,
                    map_user,
                )
            })
            .await
    }

    async fn soft_delete(&self, id: &str) -> ApiResult<()> {
        let id = parse_id(id)?;
        self.conn
            .run(move |conn, deadline| {
                let tx = conn.transaction()?;
                let changed = tx.execute(
                    "UPDATE users SET deleted_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                    params![now(), id],
                )?;
                if changed == 0 {
                    return Err(ApiError::not_found("User not found"));
                }
                deadline.check()?;
                tx.commit()?;
                Ok(())
            })
            .await
    }
}
