//! In-process document store.
//!
//! Collections live behind a single async `RwLock`. A write stages its
//! changes on a copy of the collections and swaps the copy in only after the
//! deadline check and the snapshot write succeed, so a failed write leaves
//! no trace. Reads never observe a half-applied write.

pub mod alumni;
pub mod employment;
pub mod files;
pub mod users;

use crate::error::{ApiError, ApiResult};
use crate::query::{ListParams, Page, SortOrder};
use crate::store::{Deadline, StoreProbe, Stores};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared_types::{AlumniRecord, UploadedFile};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

pub use employment::EmploymentDocument;
pub use users::UserDocument;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collections {
    #[serde(default)]
    pub users: BTreeMap<String, UserDocument>,
    #[serde(default)]
    pub alumni: BTreeMap<String, AlumniRecord>,
    #[serde(default)]
    pub employment: BTreeMap<String, EmploymentDocument>,
    #[serde(default)]
    pub files: BTreeMap<String, UploadedFile>,
}

pub struct DocumentDb {
    collections: RwLock<Collections>,
    snapshot_path: Option<PathBuf>,
    query_timeout: Duration,
}

impl DocumentDb {
    /// Open a store persisted at `path`, loading the last snapshot if any
    pub fn open(path: &Path, query_timeout: Duration) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let collections = if path.exists() {
            let raw = std::fs::read(path)?;
            let collections: Collections = serde_json::from_slice(&raw)?;
            tracing::info!(
                "Loaded document snapshot from {:?}: {} users, {} alumni, {} employment, {} files",
                path,
                collections.users.len(),
                collections.alumni.len(),
                collections.employment.len(),
                collections.files.len()
            );
            collections
        } else {
            Collections::default()
        };

        Ok(Self {
            collections: RwLock::new(collections),
            snapshot_path: Some(path.to_path_buf()),
            query_timeout,
        })
    }

    /// A store that lives only as long as the process
    pub fn in_memory(query_timeout: Duration) -> Self {
        Self {
            collections: RwLock::new(Collections::default()),
            snapshot_path: None,
            query_timeout,
        }
    }

    pub async fn read<T>(&self, op: impl FnOnce(&Collections) -> ApiResult<T>) -> ApiResult<T> {
        let guard = tokio::time::timeout(self.query_timeout, self.collections.read())
            .await
            .map_err(|_| ApiError::timeout())?;
        op(&guard)
    }

    pub async fn write<T>(
        &self,
        op: impl FnOnce(&mut Collections) -> ApiResult<T>,
    ) -> ApiResult<T> {
        let deadline = Deadline::after(self.query_timeout);
        let mut guard = tokio::time::timeout(self.query_timeout, self.collections.write())
            .await
            .map_err(|_| ApiError::timeout())?;

        let mut staged = guard.clone();
        let output = op(&mut staged)?;

        deadline.check()?;
        self.persist(&staged).await?;
        *guard = staged;

        Ok(output)
    }

    /// Write the current collections to the snapshot file
    pub async fn flush(&self) -> ApiResult<()> {
        let guard = self.collections.read().await;
        self.persist(&guard).await
    }

    async fn persist(&self, collections: &Collections) -> ApiResult<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let bytes = serde_json::to_vec(collections)?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    pub fn stores(self: &Arc<Self>) -> Stores {
        Stores {
            users: Arc::new(users::DocumentUserStore::new(self.clone())),
            alumni: Arc::new(alumni::DocumentAlumniStore::new(self.clone())),
            employment: Arc::new(employment::DocumentEmploymentStore::new(self.clone())),
            files: Arc::new(files::DocumentFileStore::new(self.clone())),
            probe: self.clone(),
        }
    }
}

#[async_trait]
impl StoreProbe for DocumentDb {
    async fn ping(&self) -> ApiResult<()> {
        self.read(|_| Ok(())).await
    }
}

/// Document ids are UUIDs in canonical hyphenated form
pub(crate) fn parse_id(id: &str) -> ApiResult<String> {
    uuid::Uuid::parse_str(id.trim())
        .map(|id| id.to_string())
        .map_err(|_| ApiError::invalid_argument(format!("Invalid id: {}", id)))
}

/// Time-ordered, so id order follows insertion order
pub(crate) fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Comparable projection of one field. `Null` sorts first, as in SQL.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum SortKey<'a> {
    Null,
    Int(i64),
    Text(&'a str),
    Date(NaiveDate),
}

impl<'a> From<Option<i64>> for SortKey<'a> {
    fn from(value: Option<i64>) -> Self {
        value.map(SortKey::Int).unwrap_or(SortKey::Null)
    }
}

impl<'a> From<Option<NaiveDate>> for SortKey<'a> {
    fn from(value: Option<NaiveDate>) -> Self {
        value.map(SortKey::Date).unwrap_or(SortKey::Null)
    }
}

/// Field access the generic listing needs
pub(crate) trait Document {
    fn id(&self) -> &str;

    fn sort_key(&self, field: &str) -> SortKey<'_>;

    fn search_text(&self, field: &str) -> &str;
}

/// Filter by the params' search term, sort by the whitelisted field with the
/// id as tie breaker, then cut one page. `total` counts every match.
pub(crate) fn paginate<'a, D, T>(
    docs: impl Iterator<Item = &'a D>,
    params: &ListParams,
    convert: impl Fn(&D) -> T,
) -> Page<T>
where
    D: Document + 'a,
{
    let mut matched: Vec<&D> = docs
        .filter(|doc| {
            params.matches(
                params
                    .search_fields
                    .iter()
                    .map(|field| doc.search_text(field)),
            )
        })
        .collect();

    matched.sort_by(|a, b| {
        let ordering = a
            .sort_key(params.sort_by)
            .cmp(&b.sort_key(params.sort_by))
            .then_with(|| a.id().cmp(b.id()));
        match params.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    let total = matched.len() as u64;
    let items = matched
        .into_iter()
        .skip(params.offset() as usize)
        .take(params.limit as usize)
        .map(convert)
        .collect();

    Page { items, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{ListQuery, ALUMNI_SORT};

    struct Doc {
        id: String,
        name: String,
        year: i64,
    }

    impl Document for Doc {
        fn id(&self) -> &str {
            &self.id
        }

        fn sort_key(&self, field: &str) -> SortKey<'_> {
            match field {
                "name" => SortKey::Text(&self.name),
                "graduation_year" => SortKey::Int(self.year),
                _ => SortKey::Text(&self.id),
            }
        }

        fn search_text(&self, field: &str) -> &str {
            match field {
                "name" => &self.name,
                _ => "",
            }
        }
    }

    fn docs() -> Vec<Doc> {
        vec![
            Doc { id: "a".into(), name: "Budi".into(), year: 2020 },
            Doc { id: "b".into(), name: "Ani".into(), year: 2021 },
            Doc { id: "c".into(), name: "Citra".into(), year: 2020 },
        ]
    }

    #[test]
    fn test_paginate_sorts_and_counts() {
        let params = ListParams::resolve(
            &ListQuery {
                sort_by: Some("name".to_string()),
                limit: Some("2".to_string()),
                ..Default::default()
            },
            &ALUMNI_SORT,
        );
        let docs = docs();
        let page = paginate(docs.iter(), &params, |d| d.name.clone());
        assert_eq!(page.total, 3);
        assert_eq!(page.items, vec!["Ani", "Budi"]);
    }

    #[test]
    fn test_paginate_desc_with_tie_breaker() {
        let params = ListParams::resolve(
            &ListQuery {
                sort_by: Some("graduation_year".to_string()),
                order: Some("desc".to_string()),
                ..Default::default()
            },
            &ALUMNI_SORT,
        );
        let docs = docs();
        let page = paginate(docs.iter(), &params, |d| d.id.clone());
        assert_eq!(page.items, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_paginate_search_mirrors_total() {
        let params = ListParams::resolve(
            &ListQuery {
                search: Some("A".to_string()),
                page: Some("2".to_string()),
                limit: Some("1".to_string()),
                ..Default::default()
            },
            &ALUMNI_SORT,
        );
        let docs = docs();
        let page = paginate(docs.iter(), &params, |d| d.name.clone());
        // "Ani" and "Citra" match case-insensitively, "Budi" does not
        assert_eq!(page.total, 2);
        assert_eq!(page.items, vec!["Citra"]);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_trace() {
        let db = DocumentDb::in_memory(Duration::from_secs(5));
        let result: ApiResult<()> = db
            .write(|c| {
                c.files.insert(
                    "x".to_string(),
                    UploadedFile {
                        id: "x".to_string(),
                        file_name: "x".to_string(),
                        original_name: "x".to_string(),
                        storage_path: "x".to_string(),
                        size: 1,
                        content_type: "text/plain".to_string(),
                        uploaded_by: "u".to_string(),
                        owner_id: "u".to_string(),
                        uploaded_at: 0,
                    },
                );
                Err(ApiError::conflict("abort"))
            })
            .await;
        assert!(result.is_err());

        let count = db.read(|c| Ok(c.files.len())).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_snapshot_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.json");

        {
            let db = DocumentDb::open(&path, Duration::from_secs(5)).unwrap();
            db.write(|c| {
                c.users.insert(
                    "u1".to_string(),
                    UserDocument {
                        id: "u1".to_string(),
                        username: "rina".to_string(),
                        email: "rina@example.com".to_string(),
                        password_hash: "hash".to_string(),
                        role: shared_types::Role::Admin,
                        created_at: 1,
                        deleted_at: None,
                    },
                );
                Ok(())
            })
            .await
            .unwrap();
        }

        let reopened = DocumentDb::open(&path, Duration::from_secs(5)).unwrap();
        let hash = reopened
            .read(|c| Ok(c.users.get("u1").map(|u| u.password_hash.clone())))
            .await
            .unwrap();
        assert_eq!(hash.as_deref(), Some("hash"));
    }

    #[test]
    fn test_parse_id() {
        let id = new_id();
        assert_eq!(parse_id(&id).unwrap(), id);
        assert!(parse_id("42").is_err());
    }
}
