//! OAuth2 service-account flow (RFC 7523 JWT bearer grant).
//!
//! A signed assertion is exchanged at the key's `token_uri` for a short-lived
//! access token, which is reused until shortly before it expires.

use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use docchat_shared::{DocChatError, Result, ServiceAccountKey};

/// Read-only Drive scope; the credential never needs more.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion (the maximum Google accepts).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this long before the server-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Access-token provider for one service-account key.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    client: Client,
    scope: String,
    token: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Create a provider that requests `scope`.
    pub fn new(key: ServiceAccountKey, client: Client, scope: impl Into<String>) -> Self {
        Self {
            key,
            client,
            scope: scope.into(),
            token: Mutex::new(None),
        }
    }

    /// The key this provider signs with.
    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    /// Return a valid access token, exchanging a new assertion if needed.
    pub async fn access_token(&self) -> Result<String> {
        let mut guard = self.token.lock().await;

        if let Some(cached) = guard.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
            debug!("access token near expiry, refreshing");
        }

        let fresh = self.exchange().await?;
        let token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(token)
    }

    /// Build the signed JWT assertion.
    fn assertion(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| DocChatError::source_unavailable("invalid service account private key", e))?;

        jsonwebtoken::encode(&header, &claims, &encoding_key)
            .map_err(|e| DocChatError::source_unavailable("failed to sign token assertion", e))
    }

    #[instrument(skip_all, fields(account = %self.key.client_email))]
    async fn exchange(&self) -> Result<CachedToken> {
        let assertion = self.assertion()?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| DocChatError::source_unavailable("token request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocChatError::source_status(format!(
                "token endpoint returned HTTP {status}: {}",
                snippet(&body)
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DocChatError::source_unavailable("invalid token response", e))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        info!(expires_in_secs = lifetime.as_secs(), "obtained access token");

        Ok(CachedToken {
            access_token: token.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        })
    }
}

/// First 200 chars of an error body, for log and error context.
pub(crate) fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_key(token_uri: &str) -> ServiceAccountKey {
        let pem = std::fs::read_to_string("../../../fixtures/keys/test_service_account.pem")
            .expect("read test key fixture");
        ServiceAccountKey {
            project_id: "demo-project".into(),
            client_email: "reader@demo-project.iam.gserviceaccount.com".into(),
            private_key_id: Some("test-kid".into()),
            private_key: pem,
            token_uri: token_uri.into(),
        }
    }

    async fn mount_token(server: &wiremock::MockServer, expected_calls: u64) {
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/token"))
            .and(wiremock::matchers::body_string_contains("jwt-bearer"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_json(
                serde_json::json!({
                    "access_token": "ya29.test-token",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                }),
            ))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn assertion_is_three_part_jwt() {
        let auth = ServiceAccountAuth::new(
            test_key("https://oauth2.googleapis.com/token"),
            Client::new(),
            DRIVE_READONLY_SCOPE,
        );
        let jwt = auth.assertion().expect("sign assertion");
        assert_eq!(jwt.split('.').count(), 3);
    }

    #[test]
    fn bad_private_key_is_source_unavailable() {
        let mut key = test_key("https://oauth2.googleapis.com/token");
        key.private_key = "not a pem".into();
        let auth = ServiceAccountAuth::new(key, Client::new(), DRIVE_READONLY_SCOPE);
        let err = auth.assertion().unwrap_err();
        assert!(matches!(err, DocChatError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn token_is_reused_until_expiry() {
        let server = wiremock::MockServer::start().await;
        mount_token(&server, 1).await;

        let auth = ServiceAccountAuth::new(
            test_key(&format!("{}/token", server.uri())),
            Client::new(),
            DRIVE_READONLY_SCOPE,
        );

        assert_eq!(auth.access_token().await.unwrap(), "ya29.test-token");
        assert_eq!(auth.access_token().await.unwrap(), "ya29.test-token");
        // `expect(1)` is verified when the server drops
    }

    #[tokio::test]
    async fn rejected_credentials_surface_status() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("POST"))
            .and(wiremock::matchers::path("/token"))
            .respond_with(
                wiremock::ResponseTemplate::new(400)
                    .set_body_string(r#"{"error":"invalid_grant"}"#),
            )
            .mount(&server)
            .await;

        let auth = ServiceAccountAuth::new(
            test_key(&format!("{}/token", server.uri())),
            Client::new(),
            DRIVE_READONLY_SCOPE,
        );
        let err = auth.access_token().await.unwrap_err();
        assert!(err.to_string().contains("HTTP 400"));
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let body = "é".repeat(300);
        assert_eq!(snippet(&body).chars().count(), 200);
        assert_eq!(snippet("short"), "short");
    }
}
