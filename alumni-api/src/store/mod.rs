//! Persistence port.
//!
//! Every backend implements the same four store traits with identical
//! observable semantics. Identifiers cross this boundary as opaque strings;
//! each backend parses its own native ids and reports a malformed id as
//! `InvalidArgument`.

use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::lifecycle::Transition;
use crate::query::{ListParams, Page};
use async_trait::async_trait;
use shared_types::{
    AlumniEmploymentSummary, AlumniRecord, CreateAlumniRequest, CreateEmploymentRequest,
    EmploymentRecord, LifecycleState, Role, UpdateAlumniRequest, UpdateEmploymentRequest,
    UploadedFile, UserAccount,
};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Which persistence engine a route group is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Relational,
    Document,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Relational => "relational",
            BackendKind::Document => "document",
        }
    }

    /// Mount point of the backend's route group
    pub fn prefix(&self) -> &'static str {
        match self {
            BackendKind::Relational => "/api/pg",
            BackendKind::Document => "/api/mg",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relational" | "pg" => Ok(BackendKind::Relational),
            "document" | "mg" => Ok(BackendKind::Document),
            other => Err(ApiError::invalid_argument(format!(
                "unknown backend: {}",
                other
            ))),
        }
    }
}

/// Wall-clock budget for one store operation, checked before commit so an
/// overrunning transaction rolls back instead of landing late.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn check(&self) -> ApiResult<()> {
        if Instant::now() >= self.0 {
            Err(ApiError::timeout())
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub file_name: String,
    pub original_name: String,
    pub storage_path: String,
    pub size: i64,
    pub content_type: String,
    pub uploaded_by: String,
    pub owner_id: String,
}

/// Which slice of the employment table a listing reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmploymentFilter {
    pub state: LifecycleState,
    pub owner_id: Option<String>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new_user: NewUser) -> ApiResult<UserAccount>;

    /// Active accounts only
    async fn find_by_username(&self, username: &str) -> ApiResult<Option<UserAccount>>;

    async fn get(&self, id: &str, include_deleted: bool) -> ApiResult<UserAccount>;

    async fn list(&self, params: &ListParams, include_deleted: bool)
        -> ApiResult<Page<UserAccount>>;

    async fn soft_delete(&self, id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait AlumniStore: Send + Sync {
    async fn create(&self, request: &CreateAlumniRequest) -> ApiResult<AlumniRecord>;

    /// Active alumni only
    async fn get(&self, id: &str) -> ApiResult<AlumniRecord>;

    async fn update(&self, id: &str, changes: &UpdateAlumniRequest) -> ApiResult<AlumniRecord>;

    async fn soft_delete(&self, id: &str) -> ApiResult<()>;

    async fn list(&self, params: &ListParams, owner_id: Option<&str>)
        -> ApiResult<Page<AlumniRecord>>;

    /// Active alumni of one graduation year joined with their active jobs
    async fn employment_by_graduation_year(
        &self,
        year: i32,
    ) -> ApiResult<Vec<AlumniEmploymentSummary>>;
}

#[async_trait]
pub trait EmploymentStore: Send + Sync {
    /// Fails with `InvalidArgument` when the alumni does not exist
    async fn create(&self, request: &CreateEmploymentRequest) -> ApiResult<EmploymentRecord>;

    /// The stored record in whatever state it is in, with its owner's user id
    async fn get(&self, id: &str) -> ApiResult<(EmploymentRecord, String)>;

    async fn list(
        &self,
        params: &ListParams,
        filter: &EmploymentFilter,
    ) -> ApiResult<Page<EmploymentRecord>>;

    /// Active records of one alumni, oldest start date first
    async fn list_by_alumni(&self, alumni_id: &str) -> ApiResult<Vec<EmploymentRecord>>;

    /// Applies `changes` to an active record the caller may access, atomically
    async fn update(
        &self,
        id: &str,
        caller: &Identity,
        changes: &UpdateEmploymentRequest,
    ) -> ApiResult<EmploymentRecord>;

    /// Checks the precondition and writes the new state in one transaction
    async fn transition(&self, id: &str, caller: &Identity, transition: Transition)
        -> ApiResult<()>;
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn create(&self, new_file: NewFile) -> ApiResult<UploadedFile>;

    async fn get(&self, id: &str) -> ApiResult<UploadedFile>;

    async fn list(&self, params: &ListParams, owner_id: Option<&str>)
        -> ApiResult<Page<UploadedFile>>;

    /// Removes the metadata and returns it so the caller can drop the blob
    async fn delete(&self, id: &str) -> ApiResult<UploadedFile>;
}

#[async_trait]
pub trait StoreProbe: Send + Sync {
    async fn ping(&self) -> ApiResult<()>;
}

/// The full set of stores one backend provides
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub alumni: Arc<dyn AlumniStore>,
    pub employment: Arc<dyn EmploymentStore>,
    pub files: Arc<dyn FileStore>,
    pub probe: Arc<dyn StoreProbe>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("pg".parse::<BackendKind>().unwrap(), BackendKind::Relational);
        assert_eq!("Document".parse::<BackendKind>().unwrap(), BackendKind::Document);
        assert!("redis".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Document.prefix(), "/api/mg");
    }

    #[test]
    fn test_deadline() {
        assert!(Deadline::after(Duration::from_secs(60)).check().is_ok());
        assert!(Deadline::after(Duration::ZERO).check().is_err());
    }
}
