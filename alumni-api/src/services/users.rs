use crate::auth::{hash_password, verify_password, Identity, TokenService};
use crate::error::{ApiError, ApiResult};
use crate::policy;
use crate::query::{ListParams, Page};
use crate::store::{BackendKind, NewUser, UserStore};
use shared_types::{LoginRequest, LoginResponse, Role, UserAccount};
use std::sync::Arc;

#[derive(Clone)]
pub struct UserService {
    kind: BackendKind,
    store: Arc<dyn UserStore>,
    tokens: Arc<TokenService>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(
        kind: BackendKind,
        store: Arc<dyn UserStore>,
        tokens: Arc<TokenService>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            kind,
            store,
            tokens,
            bcrypt_cost,
        }
    }

    pub async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err(ApiError::invalid_argument(
                "Username and password are required",
            ));
        }

        let invalid = || ApiError::unauthorized("Invalid username or password");

        let user = match self.store.find_by_username(request.username.trim()).await? {
            Some(user) => user,
            None => {
                tracing::warn!(backend = %self.kind, "Login failed for unknown user {}", request.username);
                return Err(invalid());
            }
        };

        if !verify_password(&request.password, &user.password_hash).await? {
            tracing::warn!(backend = %self.kind, "Login failed for user {}: wrong password", user.username);
            return Err(invalid());
        }

        let token = self.tokens.issue(&user, self.kind)?;
        tracing::info!(backend = %self.kind, "User {} logged in", user.username);

        Ok(LoginResponse { user, token })
    }

    pub async fn profile(&self, caller: &Identity) -> ApiResult<UserAccount> {
        self.store.get(&caller.user_id, false).await
    }

    /// Create an account. Used by the `create-user` command.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> ApiResult<UserAccount> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() {
            return Err(ApiError::invalid_argument("Username cannot be empty"));
        }
        if email.is_empty() || !email.contains('@') {
            return Err(ApiError::invalid_argument("A valid email is required"));
        }

        let password_hash = hash_password(password, Some(self.bcrypt_cost)).await?;
        let user = self
            .store
            .create(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                role,
            })
            .await?;

        tracing::info!(backend = %self.kind, "Created {} account {} ({})", user.role, user.username, user.id);
        Ok(user)
    }

    /// Admins also see soft-deleted accounts
    pub async fn list(&self, caller: &Identity, params: &ListParams) -> ApiResult<Page<UserAccount>> {
        self.store.list(params, caller.is_admin()).await
    }

    pub async fn get(&self, caller: &Identity, id: &str) -> ApiResult<UserAccount> {
        let user = self.store.get(id, caller.is_admin()).await?;
        policy::ensure_access(caller, &user.id)?;
        Ok(user)
    }

    pub async fn delete(&self, caller: &Identity, id: &str) -> ApiResult<()> {
        policy::ensure_admin(caller)?;
        self.store.soft_delete(id).await?;
        tracing::info!(backend = %self.kind, "User {} soft-deleted by {}", id, caller.user_id);
        Ok(())
    }
}
