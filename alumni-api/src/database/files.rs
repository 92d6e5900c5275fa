use crate::database::{fetch_page, now, parse_id, AsyncDbConnection, Filter};
use crate::error::{ApiError, ApiResult};
use crate::query::{ListParams, Page};
use crate::store::{FileStore, NewFile};
use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension, Row};
use shared_types::UploadedFile;

const FILE_COLUMNS: &str = "id, file_name, original_name, storage_path, size, content_type, \
    uploaded_by, owner_id, uploaded_at";

pub struct SqliteFileStore {
    conn: AsyncDbConnection,
}

impl SqliteFileStore {
    pub fn new(conn: AsyncDbConnection) -> Self {
        Self { conn }
    }
}

fn map_file(row: &Row<'_>) -> rusqlite::Result<UploadedFile> {
    Ok(UploadedFile {
        id: row.get::<_, i64>(0)?.to_string(),
        file_name: row.get(1)?,
        original_name: row.get(2)?,
        storage_path: row.get(3)?,
        size: row.get(4)?,
        content_type: row.get(5)?,
        uploaded_by: row.get::<_, i64>(6)?.to_string(),
        owner_id: row.get::<_, i64>(7)?.to_string(),
        uploaded_at: row.get(8)?,
    })
}

#[async_trait]
impl FileStore for SqliteFileStore {
    async fn create(&self, new_file: NewFile) -> ApiResult<UploadedFile> {
        let uploaded_by = parse_id(&new_file.uploaded_by)?;
        let owner_id = parse_id(&new_file.owner_id)?;

        self.conn
            .run(move |conn, deadline| {
                let tx = conn.transaction()?;

                let owner_exists: Option<i64> = tx
                    .query_row(
                        "SELECT id FROM users WHERE id = ?1 AND deleted_at IS NULL",
                        [owner_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if owner_exists.is_none() {
                    return Err(ApiError::invalid_argument(
                        "target_user_id does not reference an existing user",
                    ));
                }

                let uploaded_at = now();
                let id: i64 = tx.query_row(
                    "INSERT INTO files (file_name, original_name, storage_path, size, content_type,
                                        uploaded_by, owner_id, uploaded_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8) RETURNING id",
                    params![
                        new_file.file_name,
                        new_file.original_name,
                        new_file.storage_path,
                        new_file.size,
                        new_file.content_type,
                        uploaded_by,
                        owner_id,
                        uploaded_at
                    ],
                    |row| row.get(0),
                )?;

                deadline.check()?;
                tx.commit()?;

                Ok(UploadedFile {
                    id: id.to_string(),
                    file_name: new_file.file_name,
                    original_name: new_file.original_name,
                    storage_path: new_file.storage_path,
                    size: new_file.size,
                    content_type: new_file.content_type,
                    uploaded_by: uploaded_by.to_string(),
                    owner_id: owner_id.to_string(),
                    uploaded_at,
                })
            })
            .await
    }

    async fn get(&self, id: &str) -> ApiResult<UploadedFile> {
        let id = parse_id(id)?;
        self.conn
            .run(move |conn, _| {
                let sql = format!("SELECT {} FROM files WHERE id = ?1", FILE_COLUMNS);
                conn.query_row(&sql, [id], map_file)
                    .optional()?
                    .ok_or_else(|| ApiError::not_found("File not found"))
            })
            .await
    }

    async fn list(
        &self,
        params: &ListParams,
        owner_id: Option<&str>,
    ) -> ApiResult<Page<UploadedFile>> {
        let params = params.clone();
        let owner_id = owner_id.map(parse_id).transpose()?;
        self.conn
            .run(move |conn, _| {
                let mut filter = Filter::new();
                if let Some(owner_id) = owner_id {
                    filter.push("owner_id = ?", [Value::Integer(owner_id)]);
                }
                filter.search(&params, params.search_fields);

                fetch_page(
                    conn,
                    FILE_COLUMNS,
                    "files",
                    &filter,
                    params.sort_by,
                    "id",
                    &params,
                    map_file,
                )
            })
            .await
    }

    async fn delete(&self, id: &str) -> ApiResult<UploadedFile> {
        let id = parse_id(id)?;
        self.conn
            .run(move |conn, deadline| {
                let tx = conn.transaction()?;
                let sql = format!(
                    "DELETE FROM files WHERE id = ?1 RETURNING {}",
                    FILE_COLUMNS
                );
                let removed = tx
                    .query_row(&sql, [id], map_file)
                    .optional()?
                    .ok_or_else(|| ApiError::not_found("File not found"))?;
                deadline.check()?;
                tx.commit()?;
                Ok(removed)
            })
            .await
    }
}
