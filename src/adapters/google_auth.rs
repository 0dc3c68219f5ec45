use crate::config::GoogleSettings;
use crate::domain::ports::TokenSource;
use crate::utils::error::{BotError, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before Google says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// The fields of a Google service account key file that token minting needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(raw)?;
        if key.client_email.trim().is_empty() || key.private_key.trim().is_empty() {
            return Err(BotError::auth(
                "Service account key is missing client_email or private_key",
            ));
        }
        Ok(key)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_settings(settings: &GoogleSettings) -> Result<Self> {
        match (&settings.service_account_json, &settings.service_account_file) {
            (Some(json), _) => Self::from_json(json.expose()),
            (None, Some(path)) => Self::from_file(path),
            (None, None) => Err(BotError::MissingConfigError {
                field: "GOOGLE_SERVICE_ACCOUNT_JSON".to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    token_type: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Mints OAuth access tokens with the JWT bearer flow and caches them until
/// shortly before they expire.
pub struct ServiceAccountTokenSource {
    client: Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    token_uri: String,
    scopes: Vec<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, scopes: &[&str], timeout: Duration) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let token_uri = key
            .token_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            key,
            encoding_key,
            token_uri,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            cached: Mutex::new(None),
        })
    }

    pub fn from_settings(settings: &GoogleSettings, scopes: &[&str]) -> Result<Self> {
        let key = ServiceAccountKey::from_settings(settings)?;
        tracing::debug!("Loaded service account {}", key.client_email);

        let mut source = Self::new(key, scopes, Duration::from_secs(settings.timeout_seconds))?;
        if let Some(uri) = &settings.token_uri {
            source.token_uri = uri.clone();
        }
        Ok(source)
    }

    /// Points token exchange at a different endpoint.
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Signed RS256 assertion for the token endpoint.
    pub fn signed_assertion(&self, now_unix: i64) -> Result<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let claims = Claims {
            iss: &self.key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.token_uri,
            iat: now_unix,
            exp: now_unix + ASSERTION_LIFETIME_SECS,
        };

        Ok(jsonwebtoken::encode(&header, &claims, &self.encoding_key)?)
    }

    async fn fetch_token(&self) -> Result<CachedToken> {
        let assertion = self.signed_assertion(chrono::Utc::now().timestamp())?;

        tracing::debug!("Requesting Google access token from {}", self.token_uri);
        let response = self
            .client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Token exchange failed with {}: {}", status, body);
            return Err(BotError::ApiResponseError {
                service: "Google OAuth".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response.json().await?;
        if let Some(kind) = &token.token_type {
            if !kind.eq_ignore_ascii_case("bearer") {
                return Err(BotError::auth(format!("Unexpected token type {}", kind)));
            }
        }

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        let refresh_at = Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN);
        tracing::debug!("Obtained access token valid for {:?}", lifetime);

        Ok(CachedToken {
            value: token.access_token,
            refresh_at,
        })
    }
}

impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}
