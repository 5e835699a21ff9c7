use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;
use thrift_market_api::auth::{
    AuthError, FirebaseEndpoints, FirebaseIdentityProvider, IdentityProvider,
};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROJECT: &str = "thrift-market-test";
const KID: &str = "test-key-1";
const MODULUS: &str = "nNKFrXCGqdBk4whPXgt6eoyAPfDdbK7CFtTYyxxKmTRHKYdmByd72GnngFDJLPiIvqECHA3IhRYigfYIO3EWl9Y40bAjy-07XDfTEknd5E8j5XeAWKuu48hZI-FgfTg0gbKrg9Jm2QZXc8Gv439BVrYqffkbTVhuvBpByi6LaqZhX4aBzc4ai11nK7Wb3yTyCY6PBw3s1D8OypJ_0Zqo-ssV1PeUW8xIAK_ijhZTiuoMEsAd6bS8QOliTWO5LQzcfpZVHSoKqqFbagK5ELdRVvPUl5tng6bXlmH-rcn3_lRZ571vvyqt6OD4HymWoBwkGyou7kt7gDjYWrjifXf8UQ";

fn signing_key() -> EncodingKey {
    EncodingKey::from_rsa_pem(include_bytes!("fixtures/identity_test_key.pem"))
        .expect("test key parses")
}

fn token(kid: &str, audience: &str, expires_in: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "iss": format!("https://securetoken.google.com/{}", audience),
        "aud": audience,
        "sub": "firebase-uid-1",
        "email": "fiona@example.com",
        "name": "Fiona",
        "iat": now,
        "exp": now + expires_in,
    });
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, &claims, &signing_key()).expect("token signs")
}

async fn provider(server: &MockServer, api_key: Option<&str>) -> FirebaseIdentityProvider {
    FirebaseIdentityProvider::with_endpoints(
        PROJECT,
        api_key.map(str::to_string),
        Duration::from_secs(5),
        FirebaseEndpoints {
            jwks_url: format!("{}/jwks", server.uri()),
            identity_toolkit_base: server.uri(),
        },
    )
    .expect("provider builds")
}

async fn mount_jwks(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("cache-control", "public, max-age=600")
                .set_body_json(json!({
                    "keys": [{ "kid": KID, "kty": "RSA", "alg": "RS256", "n": MODULUS, "e": "AQAB" }]
                })),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn valid_tokens_verify_and_keys_are_cached() {
    let server = MockServer::start().await;
    mount_jwks(&server, 1).await;
    let provider = provider(&server, None).await;

    for _ in 0..2 {
        let user = provider
            .verify_token(&token(KID, PROJECT, 600))
            .await
            .expect("token verifies");
        assert_eq!(user.uid, "firebase-uid-1");
        assert_eq!(user.email.as_deref(), Some("fiona@example.com"));
        assert_eq!(user.name.as_deref(), Some("Fiona"));
    }
}

#[tokio::test]
async fn wrong_audience_and_expired_tokens_fail() {
    let server = MockServer::start().await;
    mount_jwks(&server, 1).await;
    let provider = provider(&server, None).await;

    assert_matches!(
        provider.verify_token(&token(KID, "other-project", 600)).await,
        Err(AuthError::InvalidToken)
    );
    assert_matches!(
        provider.verify_token(&token(KID, PROJECT, -3600)).await,
        Err(AuthError::TokenExpired)
    );
}

#[tokio::test]
async fn unknown_key_ids_do_not_refetch_while_the_cache_is_fresh() {
    let server = MockServer::start().await;
    mount_jwks(&server, 1).await;
    let provider = provider(&server, None).await;

    provider
        .verify_token(&token(KID, PROJECT, 600))
        .await
        .expect("known key verifies");
    for _ in 0..5 {
        assert_matches!(
            provider.verify_token(&token("rotated-away", PROJECT, 600)).await,
            Err(AuthError::InvalidToken)
        );
    }
}

#[tokio::test]
async fn unknown_key_ids_refetch_once_the_interval_passes() {
    let server = MockServer::start().await;
    // Cache miss on the unknown kid forces a second fetch
    mount_jwks(&server, 2).await;
    let provider = provider(&server, None)
        .await
        .with_min_refresh_interval(Duration::ZERO);

    provider
        .verify_token(&token(KID, PROJECT, 600))
        .await
        .expect("known key verifies");
    assert_matches!(
        provider.verify_token(&token("rotated-away", PROJECT, 600)).await,
        Err(AuthError::InvalidToken)
    );
}

#[tokio::test]
async fn jwks_outage_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let provider = provider(&server, None).await;

    assert_matches!(
        provider.verify_token(&token(KID, PROJECT, 600)).await,
        Err(AuthError::Provider(_))
    );
}

#[tokio::test]
async fn create_account_calls_sign_up() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .and(query_param("key", "web-api-key"))
        .and(body_partial_json(json!({
            "email": "new@example.com",
            "displayName": "Newt",
            "returnSecureToken": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "identitytoolkit#SignupNewUserResponse",
            "localId": "fb-new-uid",
            "idToken": "fresh-id-token",
            "email": "new@example.com"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let provider = provider(&server, Some("web-api-key")).await;

    let account = provider
        .create_account("new@example.com", "hunter22", "Newt")
        .await
        .expect("account created");
    assert_eq!(account.uid, "fb-new-uid");
    assert_eq!(account.id_token.as_deref(), Some("fresh-id-token"));
}

#[tokio::test]
async fn sign_up_errors_are_mapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/accounts:signUp"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "EMAIL_EXISTS" }
        })))
        .mount(&server)
        .await;
    let provider = provider(&server, Some("web-api-key")).await;

    let err = provider
        .create_account("taken@example.com", "hunter22", "Taken")
        .await
        .unwrap_err();
    assert_matches!(err, AuthError::AccountExists(ref msg) if msg == "Email already in use");
}

#[tokio::test]
async fn sign_up_needs_an_api_key() {
    let server = MockServer::start().await;
    let provider = provider(&server, None).await;

    assert_matches!(
        provider.create_account("a@example.com", "hunter22", "A").await,
        Err(AuthError::Provider(_))
    );
}
