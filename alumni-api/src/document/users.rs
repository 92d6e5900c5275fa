use crate::document::{new_id, now, paginate, parse_id, Document, DocumentDb, SortKey};
use crate::error::{ApiError, ApiResult};
use crate::query::{ListParams, Page};
use crate::store::{NewUser, UserStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{Role, UserAccount};
use std::sync::Arc;

/// Stored user document. Unlike [`UserAccount`] it serializes the hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDocument {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: i64,
    pub deleted_at: Option<i64>,
}

impl UserDocument {
    fn to_account(&self) -> UserAccount {
        UserAccount {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            password_hash: self.password_hash.clone(),
            role: self.role,
            created_at: self.created_at,
            deleted_at: self.deleted_at,
        }
    }
}

impl Document for UserDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn sort_key(&self, field: &str) -> SortKey<'_> {
        match field {
            "username" => SortKey::Text(&self.username),
            "email" => SortKey::Text(&self.email),
            "role" => SortKey::Text(self.role.as_str()),
            "created_at" => SortKey::Int(self.created_at),
            _ => SortKey::Text(&self.id),
        }
    }

    fn search_text(&self, field: &str) -> &str {
        match field {
            "username" => &self.username,
            "email" => &self.email,
            _ => "",
        }
    }
}

pub struct DocumentUserStore {
    db: Arc<DocumentDb>,
}

impl DocumentUserStore {
    pub fn new(db: Arc<DocumentDb>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for DocumentUserStore {
    async fn create(&self, new_user: NewUser) -> ApiResult<UserAccount> {
        self.db
            .write(move |c| {
                let taken = c
                    .users
                    .values()
                    .any(|u| u.username == new_user.username || u.email == new_user.email);
                if taken {
                    return Err(ApiError::conflict("Username or email already registered"));
                }

                let doc = UserDocument {
                    id: new_id(),
                    username: new_user.username,
                    email: new_user.email,
                    password_hash: new_user.password_hash,
                    role: new_user.role,
                    created_at: now(),
                    deleted_at: None,
                };
                let account = doc.to_account();
                c.users.insert(doc.id.clone(), doc);
                Ok(account)
            })
            .await
    }

    async fn find_by_username(&self, username: &str) -> ApiResult<Option<UserAccount>> {
        self.db
            .read(|c| {
                Ok(c.users
                    .values()
                    .find(|u| u.username == username && u.deleted_at.is_none())
                    .map(UserDocument::to_account))
            })
            .await
    }

    async fn get(&self, id: &str, include_deleted: bool) -> ApiResult<UserAccount> {
        let id = parse_id(id)?;
        self.db
            .read(|c| {
                c.users
                    .get(&id)
                    .filter(|u| include_deleted || u.deleted_at.is_none())
                    .map(UserDocument::to_account)
                    .ok_or_else(|| ApiError::not_found("User not found"))
            })
            .await
    }

    async fn list(
        &self,
        params: &ListParams,
        include_deleted: bool,
    ) -> ApiResult<Page<UserAccount>> {
        self.db
            .read(|c| {
                let docs = c
                    .users
                    .values()
                    .filter(|u| include_deleted || u.deleted_at.is_none());
                Ok(paginate(docs, params, UserDocument::to_account))
            })
            .await
    }

    async fn soft_delete(&self, id: &str) -> ApiResult<()> {
        let id = parse_id(id)?;
        self.db
            .write(|c| {
                let user = c
                    .users
                    .get_mut(&id)
                    .filter(|u| u.deleted_at.is_none())
                    .ok_or_else(|| ApiError::not_found("User not found"))?;
                user.deleted_at = Some(now());
                Ok(())
            })
            .await
    }
}
