use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Metadata for a stored upload
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct UploadedFile {
    pub id: String,
    pub file_name: String,
    pub original_name: String,
    pub storage_path: String,
    pub size: i64,
    pub content_type: String,
    pub uploaded_by: String,
    pub owner_id: String,
    pub uploaded_at: i64,
}

/// Query string accepted by the upload endpoint alongside the raw body
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UploadFileParams {
    pub original_name: String,
    pub target_user_id: Option<String>,
}
