use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::instrument;
use uuid::Uuid;

use super::{AuthError, AuthUser, IdentityProvider, NewAccount};

const ISSUER: &str = "thrift-market-api";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    iat: i64,
    exp: i64,
    iss: String,
}

/// Local HS256 provider. Accounts live in memory, keyed by email.
pub struct SharedSecretIdentityProvider {
    secret: String,
    token_ttl_secs: i64,
    accounts: RwLock<HashMap<String, String>>,
}

impl SharedSecretIdentityProvider {
    pub fn new(secret: impl Into<String>, token_ttl_secs: usize) -> Self {
        Self {
            secret: secret.into(),
            token_ttl_secs: token_ttl_secs as i64,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Signs a token for `uid`. Used by signup and by tests to mint callers.
    pub fn issue_token(
        &self,
        uid: &str,
        email: Option<&str>,
        name: Option<&str>,
    ) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: uid.to_string(),
            email: email.map(str::to_string),
            name: name.map(str::to_string),
            iat: now,
            exp: now + self.token_ttl_secs,
            iss: ISSUER.to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AuthError::Provider(format!("Token creation failed: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for SharedSecretIdentityProvider {
    #[instrument(skip(self, token))]
    async fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        Ok(AuthUser {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
        })
    }

    #[instrument(skip(self, password))]
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<NewAccount, AuthError> {
        if password.chars().count() < 6 {
            return Err(AuthError::InvalidAccount(
                "Password should be at least 6 characters".to_string(),
            ));
        }

        let key = email.trim().to_ascii_lowercase();
        let uid = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&key) {
                return Err(AuthError::AccountExists("Email already in use".to_string()));
            }
            let uid = Uuid::new_v4().simple().to_string();
            accounts.insert(key, uid.clone());
            uid
        };

        let id_token = self.issue_token(&uid, Some(email), Some(display_name))?;
        Ok(NewAccount {
            uid,
            id_token: Some(id_token),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SharedSecretIdentityProvider {
        SharedSecretIdentityProvider::new("unit-test-secret-that-is-long-enough-for-hs256", 3600)
    }

    #[tokio::test]
    async fn issued_tokens_verify() {
        let provider = provider();
        let token = provider
            .issue_token("uid-1", Some("a@b.c"), Some("Ann"))
            .unwrap();
        let user = provider.verify_token(&token).await.unwrap();
        assert_eq!(user.uid, "uid-1");
        assert_eq!(user.email.as_deref(), Some("a@b.c"));
        assert_eq!(user.name.as_deref(), Some("Ann"));
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let other = SharedSecretIdentityProvider::new("a-completely-different-secret-value", 3600);
        let token = other.issue_token("uid-1", None, None).unwrap();
        assert!(matches!(
            provider().verify_token(&token).await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn expired_tokens_are_reported() {
        // Expiry well past the default 60s leeway.
        let now = Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Claims {
                sub: "uid-1".into(),
                email: None,
                name: None,
                iat: now - 7200,
                exp: now - 3600,
                iss: ISSUER.into(),
            },
            &EncodingKey::from_secret(b"unit-test-secret-that-is-long-enough-for-hs256"),
        )
        .unwrap();
        assert!(matches!(
            provider().verify_token(&token).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn duplicate_emails_are_rejected() {
        let provider = provider();
        provider
            .create_account("dup@example.com", "secret1", "Dup")
            .await
            .unwrap();
        let err = provider
            .create_account("DUP@example.com", "secret1", "Dup")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountExists(_)));
    }

    #[tokio::test]
    async fn short_passwords_are_rejected() {
        let err = provider()
            .create_account("short@example.com", "123", "Short")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidAccount(_)));
    }
}
