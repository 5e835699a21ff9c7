use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{discard_blobs, non_empty};
use crate::{
    auth::{AuthUser, SharedIdentityProvider},
    entities::user::{self, UserRole},
    errors::ServiceError,
    storage::{SharedBlobStore, Upload},
};

/// Email/password signup input.
#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResult {
    pub uid: String,
    #[schema(value_type = String, example = "storeOwner")]
    pub role: UserRole,
    /// Present when the identity provider hands out a token at signup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub profile_image: Option<Upload>,
}

/// Accounts and user profiles.
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DatabaseConnection>,
    identity: SharedIdentityProvider,
    blobs: SharedBlobStore,
}

impl UserService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        identity: SharedIdentityProvider,
        blobs: SharedBlobStore,
    ) -> Self {
        Self {
            db_pool,
            identity,
            blobs,
        }
    }

    #[instrument(skip(self))]
    pub async fn find(&self, uid: &str) -> Result<Option<user::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(user::Entity::find_by_id(uid.to_string()).one(db).await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, uid: &str) -> Result<user::Model, ServiceError> {
        self.find(uid)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    /// Creates the identity account, then the user record keyed by its uid.
    #[instrument(skip(self, input), fields(email = ?input.email))]
    pub async fn signup(&self, input: SignupInput) -> Result<SignupResult, ServiceError> {
        let (email, password, name, role) = match (
            non_empty(input.email),
            input.password.filter(|p| !p.is_empty()),
            non_empty(input.name),
            non_empty(input.role),
        ) {
            (Some(email), Some(password), Some(name), Some(role)) => (email, password, name, role),
            _ => {
                return Err(ServiceError::InvalidInput(
                    "Email, password, name and role are required".to_string(),
                ))
            }
        };
        let role = UserRole::parse(&role)
            .ok_or_else(|| ServiceError::InvalidInput("Invalid role".to_string()))?;

        let account = self
            .identity
            .create_account(&email, &password, &name)
            .await?;

        if self.find(&account.uid).await?.is_some() {
            return Err(ServiceError::InvalidInput("User already exists".to_string()));
        }

        let user = self.insert(&account.uid, email, name, role).await?;
        info!(uid = %user.uid, role = ?user.role, "User signed up");

        Ok(SignupResult {
            uid: user.uid,
            role: user.role,
            id_token: account.id_token,
        })
    }

    /// Registers a caller who signed in with Google. An existing record is
    /// returned unchanged.
    #[instrument(skip(self, caller), fields(uid = %caller.uid))]
    pub async fn signup_google(
        &self,
        caller: &AuthUser,
        role: Option<String>,
        name: Option<String>,
    ) -> Result<user::Model, ServiceError> {
        if let Some(existing) = self.find(&caller.uid).await? {
            return Ok(existing);
        }

        let role = non_empty(role)
            .ok_or_else(|| ServiceError::InvalidInput("Role is required".to_string()))?;
        let role = UserRole::parse(&role)
            .ok_or_else(|| ServiceError::InvalidInput("Invalid role".to_string()))?;

        let email = caller.email.clone().unwrap_or_default();
        let name = non_empty(name)
            .or_else(|| non_empty(caller.name.clone()))
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        let user = self.insert(&caller.uid, email, name, role).await?;
        info!(uid = %user.uid, role = ?user.role, "Google user registered");
        Ok(user)
    }

    async fn insert(
        &self,
        uid: &str,
        email: String,
        name: String,
        role: UserRole,
    ) -> Result<user::Model, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();
        let user = user::ActiveModel {
            uid: Set(uid.to_string()),
            email: Set(email),
            name: Set(name),
            role: Set(role),
            profile_image_url: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(user.insert(db).await?)
    }

    #[instrument(skip(self, update), fields(uid = %uid))]
    pub async fn update_profile(
        &self,
        uid: &str,
        update: ProfileUpdate,
    ) -> Result<user::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = self.get(uid).await?;

        let uploaded = match update.profile_image {
            Some(upload) => Some(self.blobs.upload(upload).await?),
            None => None,
        };

        let mut active: user::ActiveModel = existing.into();
        if let Some(name) = non_empty(update.name) {
            active.name = Set(name);
        }
        if let Some(blob) = uploaded.as_ref() {
            active.profile_image_url = Set(Some(blob.url.clone()));
        }
        active.updated_at = Set(Utc::now());

        match active.update(db).await {
            Ok(user) => Ok(user),
            Err(e) => {
                if let Some(blob) = uploaded {
                    discard_blobs(&self.blobs, &[blob.public_id]).await;
                }
                Err(e.into())
            }
        }
    }
}
