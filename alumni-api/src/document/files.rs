use crate::document::{new_id, now, paginate, parse_id, Document, DocumentDb, SortKey};
use crate::error::{ApiError, ApiResult};
use crate::query::{ListParams, Page};
use crate::store::{FileStore, NewFile};
use async_trait::async_trait;
use shared_types::UploadedFile;
use std::sync::Arc;

impl Document for UploadedFile {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self, field: &str) -> SortKey<'_> {
        match field {
            "original_name" => SortKey::Text(&self.original_name),
            "size" => SortKey::Int(self.size),
            "content_type" => SortKey::Text(&self.content_type),
            "uploaded_at" => SortKey::Int(self.uploaded_at),
            _ => SortKey::Text(&self.id),
        }
    }

    fn search_text(&self, field: &str) -> &str {
        match field {
            "original_name" => &self.original_name,
            "content_type" => &self.content_type,
            _ => "",
        }
    }
}

pub struct DocumentFileStore {
    db: Arc<DocumentDb>,
}

impl DocumentFileStore {
    pub fn new(db: Arc<DocumentDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FileStore for DocumentFileStore {
    async fn create(&self, new_file: NewFile) -> ApiResult<UploadedFile> {
        let owner_id = parse_id(&new_file.owner_id)?;
        self.db
            .write(move |c| {
                let owner_active = c
                    .users
                    .get(&owner_id)
                    .map(|u| u.deleted_at.is_none())
                    .unwrap_or(false);
                if !owner_active {
                    return Err(ApiError::invalid_argument(
                        "target_user_id does not reference an existing user",
                    ));
                }

                let file = UploadedFile {
                    id: new_id(),
                    file_name: new_file.file_name,
                    original_name: new_file.original_name,
                    storage_path: new_file.storage_path,
                    size: new_file.size,
                    content_type: new_file.content_type,
                    uploaded_by: new_file.uploaded_by,
                    owner_id,
                    uploaded_at: now(),
                };
                c.files.insert(file.id.clone(), file.clone());
                Ok(file)
            })
            .await
    }

    async fn get(&self, id: &str) -> ApiResult<UploadedFile> {
        let id = parse_id(id)?;
        self.db
            .read(|c| {
                c.files
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| ApiError::not_found("File not found"))
            })
            .await
    }

    async fn list(
        &self,
        params: &ListParams,
        owner_id: Option<&str>,
    ) -> ApiResult<Page<UploadedFile>> {
        self.db
            .read(|c| {
                let docs = c
                    .files
                    .values()
                    .filter(|f| owner_id.map_or(true, |owner| f.owner_id == owner));
                Ok(paginate(docs, params, UploadedFile::clone))
            })
            .await
    }

    async fn delete(&self, id: &str) -> ApiResult<UploadedFile> {
        let id = parse_id(id)?;
        self.db
            .write(|c| {
                c.files
                    .remove(&id)
                    .ok_or_else(|| ApiError::not_found("File not found"))
            })
            .await
    }
}
