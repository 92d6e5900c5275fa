use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::policy;
use crate::query::{ListParams, Page};
use crate::store::{FileStore, NewFile};
use shared_types::{UploadFileParams, UploadedFile};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MIB: usize = 1024 * 1024;

/// Accepted content types and their size limits in bytes
pub fn size_limit(content_type: &str) -> Option<usize> {
    match content_type {
        "image/jpeg" | "image/jpg" | "image/png" => Some(MIB),
        "application/pdf" => Some(2 * MIB),
        _ => None,
    }
}

/// `image/PNG; charset=binary` -> `image/png`
fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Final path component only, so a client name can never steer the write
fn clean_original_name(raw: &str) -> ApiResult<String> {
    let name = Path::new(raw.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_default();
    if name.is_empty() {
        return Err(ApiError::invalid_argument("original_name is required"));
    }
    Ok(name)
}

fn generated_file_name(original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}{}", uuid::Uuid::new_v4(), extension)
}

#[derive(Clone)]
pub struct FileService {
    store: Arc<dyn FileStore>,
    upload_dir: PathBuf,
    max_body_bytes: usize,
}

impl FileService {
    pub fn new(store: Arc<dyn FileStore>, upload_dir: PathBuf, max_body_bytes: usize) -> Self {
        Self {
            store,
            upload_dir,
            max_body_bytes,
        }
    }

    /// Largest request body the upload route will buffer
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    pub async fn upload(
        &self,
        caller: &Identity,
        params: &UploadFileParams,
        content_type: &str,
        body: &[u8],
    ) -> ApiResult<UploadedFile> {
        let owner_id = policy::resolve_file_owner(caller, params.target_user_id.as_deref())?;
        let original_name = clean_original_name(&params.original_name)?;

        let content_type = normalize_content_type(content_type);
        let limit = size_limit(&content_type).ok_or_else(|| {
            ApiError::invalid_argument(format!(
                "Unsupported file type {:?}, allowed: image/jpeg, image/png, application/pdf",
                content_type
            ))
        })?;
        if body.is_empty() {
            return Err(ApiError::invalid_argument("File is empty"));
        }
        if body.len() > limit {
            return Err(ApiError::invalid_argument(format!(
                "File size exceeds limit for type {} (max {} MB)",
                content_type,
                limit / MIB
            )));
        }

        let file_name = generated_file_name(&original_name);
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let storage_path = self.upload_dir.join(&file_name);
        tokio::fs::write(&storage_path, body).await?;

        let created = self
            .store
            .create(NewFile {
                file_name,
                original_name,
                storage_path: storage_path.to_string_lossy().into_owned(),
                size: body.len() as i64,
                content_type,
                uploaded_by: caller.user_id.clone(),
                owner_id,
            })
            .await;

        match created {
            Ok(file) => {
                tracing::info!(
                    "File {} uploaded by {} for {}",
                    file.id,
                    file.uploaded_by,
                    file.owner_id
                );
                Ok(file)
            }
            Err(err) => {
                if let Err(e) = tokio::fs::remove_file(&storage_path).await {
                    tracing::warn!("Failed to remove orphaned upload {:?}: {}", storage_path, e);
                }
                Err(err)
            }
        }
    }

    pub async fn list(
        &self,
        caller: &Identity,
        params: &ListParams,
    ) -> ApiResult<Page<UploadedFile>> {
        let owner = policy::owner_filter(caller);
        self.store.list(params, owner.as_deref()).await
    }

    pub async fn get(&self, caller: &Identity, id: &str) -> ApiResult<UploadedFile> {
        let file = self.store.get(id).await?;
        policy::ensure_access(caller, &file.owner_id)?;
        Ok(file)
    }

    /// Metadata plus the stored bytes
    pub async fn open(&self, caller: &Identity, id: &str) -> ApiResult<(UploadedFile, Vec<u8>)> {
        let file = self.get(caller, id).await?;
        let bytes = match tokio::fs::read(&file.storage_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!("File {} is missing on disk at {}", file.id, file.storage_path);
                return Err(ApiError::not_found("File content not found"));
            }
            Err(e) => return Err(e.into()),
        };
        Ok((file, bytes))
    }

    pub async fn delete(&self, caller: &Identity, id: &str) -> ApiResult<()> {
        let file = self.get(caller, id).await?;
        let removed = self.store.delete(&file.id).await?;

        if let Err(e) = tokio::fs::remove_file(&removed.storage_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", removed.storage_path, e);
            }
        }
        tracing::info!("File {} deleted by {}", removed.id, caller.user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limits() {
        assert_eq!(size_limit("image/png"), Some(MIB));
        assert_eq!(size_limit("image/jpg"), Some(MIB));
        assert_eq!(size_limit("application/pdf"), Some(2 * MIB));
        assert_eq!(size_limit("text/html"), None);
    }

    #[test]
    fn test_normalize_content_type() {
        assert_eq!(normalize_content_type("Image/PNG; charset=binary"), "image/png");
        assert_eq!(normalize_content_type(""), "");
    }

    #[test]
    fn test_clean_original_name() {
        assert_eq!(clean_original_name("../../etc/cv.pdf").unwrap(), "cv.pdf");
        assert_eq!(clean_original_name("photo.PNG").unwrap(), "photo.PNG");
        assert!(clean_original_name("   ").is_err());
        assert!(clean_original_name("..").is_err());
    }

    #[test]
    fn test_generated_name_keeps_extension() {
        let name = generated_file_name("Transcript.PDF");
        assert!(name.ends_with(".pdf"));
        assert_eq!(name.len(), 36 + 4);

        let bare = generated_file_name("README");
        assert_eq!(bare.len(), 36);
        assert_ne!(generated_file_name("a.png"), generated_file_name("a.png"));
    }
}
