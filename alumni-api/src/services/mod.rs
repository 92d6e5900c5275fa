//! Application services: request validation, authorization and the calls
//! into one backend's stores. Handlers stay thin and only translate HTTP.

pub mod alumni;
pub mod employment;
pub mod files;
pub mod users;

use crate::auth::TokenService;
use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::store::{BackendKind, StoreProbe, Stores};
use std::path::PathBuf;
use std::sync::Arc;

pub use alumni::AlumniService;
pub use employment::EmploymentService;
pub use files::FileService;
pub use users::UserService;

/// Settings shared by both backends
#[derive(Clone)]
pub struct BackendSettings {
    pub tokens: Arc<TokenService>,
    pub bcrypt_cost: u32,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl BackendSettings {
    pub fn from_config(config: &ApiConfig) -> Self {
        let secret = if config.auth.jwt_secret.trim().is_empty() {
            tracing::warn!(
                "auth.jwt_secret is not set; using a per-process secret, tokens will not survive a restart"
            );
            format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
        } else {
            config.auth.jwt_secret.clone()
        };

        Self {
            tokens: Arc::new(TokenService::new(&secret, config.auth.token_expiry_hours)),
            bcrypt_cost: config.auth.bcrypt_cost,
            upload_dir: config.storage.upload_dir(),
            max_upload_bytes: config.storage.max_upload_bytes,
        }
    }
}

/// Everything one route group needs, bound to one persistence engine
#[derive(Clone)]
pub struct Backend {
    pub kind: BackendKind,
    pub tokens: Arc<TokenService>,
    pub users: UserService,
    pub alumni: AlumniService,
    pub employment: EmploymentService,
    pub files: FileService,
    probe: Arc<dyn StoreProbe>,
}

impl Backend {
    pub fn new(kind: BackendKind, stores: Stores, settings: &BackendSettings) -> Self {
        Self {
            kind,
            tokens: settings.tokens.clone(),
            users: UserService::new(
                kind,
                stores.users.clone(),
                settings.tokens.clone(),
                settings.bcrypt_cost,
            ),
            alumni: AlumniService::new(stores.alumni.clone()),
            employment: EmploymentService::new(stores.employment.clone(), stores.alumni.clone()),
            files: FileService::new(
                stores.files.clone(),
                settings.upload_dir.join(kind.as_str()),
                settings.max_upload_bytes,
            ),
            probe: stores.probe,
        }
    }

    pub async fn ping(&self) -> ApiResult<()> {
        self.probe.ping().await
    }
}

/// Both route groups, as mounted by the HTTP layer
#[derive(Clone)]
pub struct Backends {
    pub relational: Backend,
    pub document: Backend,
}

impl Backends {
    pub fn get(&self, kind: BackendKind) -> &Backend {
        match kind {
            BackendKind::Relational => &self.relational,
            BackendKind::Document => &self.document,
        }
    }
}
