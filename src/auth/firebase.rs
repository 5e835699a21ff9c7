use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::{AuthError, AuthUser, IdentityProvider, NewAccount};

const GOOGLE_JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_KEY_TTL: Duration = Duration::from_secs(3600);
/// Shortest gap between refetches triggered by an unknown `kid`.
const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Remote endpoints, overridable so tests can point at a mock server.
#[derive(Debug, Clone)]
pub struct FirebaseEndpoints {
    pub jwks_url: String,
    pub identity_toolkit_base: String,
}

impl Default for FirebaseEndpoints {
    fn default() -> Self {
        Self {
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            identity_toolkit_base: IDENTITY_TOOLKIT_BASE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    n: String,
    e: String,
}

struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ToolkitErrorBody {
    error: ToolkitError,
}

#[derive(Debug, Deserialize)]
struct ToolkitError {
    message: String,
}

/// Verifies Firebase ID tokens and creates email/password accounts.
pub struct FirebaseIdentityProvider {
    project_id: String,
    api_key: Option<String>,
    endpoints: FirebaseEndpoints,
    http: reqwest::Client,
    keys: RwLock<Option<CachedKeys>>,
    min_refresh_interval: Duration,
}

impl FirebaseIdentityProvider {
    pub fn new(
        project_id: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        Self::with_endpoints(project_id, api_key, timeout, FirebaseEndpoints::default())
    }

    pub fn with_endpoints(
        project_id: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        endpoints: FirebaseEndpoints,
    ) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        Ok(Self {
            project_id: project_id.into(),
            api_key,
            endpoints,
            http,
            keys: RwLock::new(None),
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        })
    }

    /// Overrides how soon an unknown `kid` may trigger another JWK set fetch.
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    fn issuer(&self) -> String {
        format!("https://securetoken.google.com/{}", self.project_id)
    }

    /// Returns the decoding key for `kid`, refreshing the JWK set when it is
    /// stale or does not know the key yet. Unknown keys refetch at most once
    /// per `min_refresh_interval`.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.keys.read().await;
            if let Some(cached) = cache.as_ref() {
                if let Some(key) = self.lookup(cached, kid)? {
                    return Ok(key);
                }
            }
        }

        let mut cache = self.keys.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref() {
            if let Some(key) = self.lookup(cached, kid)? {
                return Ok(key);
            }
        }

        let fresh = self.fetch_keys().await?;
        let key = fresh.keys.get(kid).cloned();
        *cache = Some(fresh);
        key.ok_or(AuthError::InvalidToken)
    }

    /// Key from a cache that is still usable. `Ok(None)` means a fetch is due,
    /// `Err` means the `kid` is unknown and the cache was refreshed too recently.
    fn lookup(&self, cached: &CachedKeys, kid: &str) -> Result<Option<DecodingKey>, AuthError> {
        let now = Instant::now();
        if cached.expires_at <= now {
            return Ok(None);
        }
        if let Some(key) = cached.keys.get(kid) {
            return Ok(Some(key.clone()));
        }
        if now.duration_since(cached.fetched_at) < self.min_refresh_interval {
            debug!(kid = %kid, "Unknown signing key, refresh throttled");
            return Err(AuthError::InvalidToken);
        }
        Ok(None)
    }

    async fn fetch_keys(&self) -> Result<CachedKeys, AuthError> {
        debug!(url = %self.endpoints.jwks_url, "Refreshing identity provider signing keys");
        let response = self
            .http
            .get(&self.endpoints.jwks_url)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "JWK set request failed with status {}",
                response.status()
            )));
        }

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(max_age)
            .unwrap_or(DEFAULT_KEY_TTL);

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let mut keys = HashMap::with_capacity(set.keys.len());
        for jwk in set.keys {
            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys.insert(jwk.kid, key);
                }
                Err(e) => warn!(kid = %jwk.kid, error = %e, "Skipping malformed signing key"),
            }
        }

        let fetched_at = Instant::now();
        Ok(CachedKeys {
            keys,
            fetched_at,
            expires_at: fetched_at + ttl,
        })
    }
}

/// Parses `max-age=N` out of a Cache-Control header value.
fn max_age(cache_control: &str) -> Option<Duration> {
    cache_control
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn map_signup_error(message: &str) -> AuthError {
    // Identity Toolkit messages look like "WEAK_PASSWORD : Password should be at least 6 characters"
    let code = message.split(':').next().unwrap_or(message).trim();
    match code {
        "EMAIL_EXISTS" => AuthError::AccountExists("Email already in use".to_string()),
        "INVALID_EMAIL" => AuthError::InvalidAccount("Invalid email address".to_string()),
        "WEAK_PASSWORD" => {
            AuthError::InvalidAccount("Password should be at least 6 characters".to_string())
        }
        "MISSING_PASSWORD" => AuthError::InvalidAccount("Password is required".to_string()),
        other => AuthError::Provider(other.to_string()),
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    #[instrument(skip(self, token))]
    async fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidToken);
        }
        let kid = header.kid.ok_or(AuthError::InvalidToken)?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.project_id.as_str()]);
        validation.set_issuer(&[self.issuer()]);

        let claims = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            })?
            .claims;

        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken);
        }

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
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AuthError::Provider("Firebase web API key is not configured".into()))?;

        let url = format!(
            "{}/v1/accounts:signUp",
            self.endpoints.identity_toolkit_base.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .query(&[("key", api_key)])
            .json(&json!({
                "email": email,
                "password": password,
                "displayName": display_name,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(match serde_json::from_str::<ToolkitErrorBody>(&body) {
                Ok(parsed) => map_signup_error(&parsed.error.message),
                Err(_) => AuthError::Provider(format!("signUp failed with status {}", status)),
            });
        }

        let created: SignUpResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        Ok(NewAccount {
            uid: created.local_id,
            id_token: created.id_token,
        })
    }
}
