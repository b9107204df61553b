//! JWT Bearer authentication flow.

use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use tracing::debug;

use crate::credentials::SalesforceCredentials;
use crate::error::Result;
use crate::oauth::{handle_token_response, token_endpoint};
use crate::DEFAULT_API_VERSION;

/// JWT Bearer authentication for server-to-server integration.
///
/// Requires a connected app with a certificate configured. Each call to
/// [`authenticate`](Self::authenticate) mints a fresh session, so the same
/// value doubles as a refresh strategy.
#[derive(Clone)]
pub struct JwtAuth {
    /// Consumer key (client_id) from the connected app.
    consumer_key: String,
    /// Username of the Salesforce user to authenticate as.
    username: String,
    /// Private key for signing the JWT (PEM format).
    private_key: Vec<u8>,
    /// Assertion lifetime (default: 3 minutes).
    expiration: Duration,
    http_client: reqwest::Client,
}

impl std::fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuth")
            .field("consumer_key", &self.consumer_key)
            .field("username", &self.username)
            .field("private_key", &"[REDACTED]")
            .field("expiration", &self.expiration)
            .finish_non_exhaustive()
    }
}

impl JwtAuth {
    /// Create a new JWT authenticator.
    ///
    /// `private_key` is an RSA key in PEM format.
    pub fn new(
        consumer_key: impl Into<String>,
        username: impl Into<String>,
        private_key: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            username: username.into(),
            private_key: private_key.into(),
            expiration: Duration::minutes(3),
            http_client: reqwest::Client::new(),
        }
    }

    /// Load the private key from a file.
    pub fn from_key_file(
        consumer_key: impl Into<String>,
        username: impl Into<String>,
        key_path: impl AsRef<std::path::Path>,
    ) -> Result<Self> {
        let private_key = std::fs::read(key_path.as_ref())?;
        Ok(Self::new(consumer_key, username, private_key))
    }

    /// Set the assertion lifetime.
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = expiration;
        self
    }

    fn generate_assertion(&self, audience: &str) -> Result<String> {
        let now = Utc::now();
        let exp = now + self.expiration;

        let claims = JwtClaims {
            iss: &self.consumer_key,
            sub: &self.username,
            aud: audience,
            exp: exp.timestamp(),
        };

        let key = EncodingKey::from_rsa_pem(&self.private_key)?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    /// Authenticate against `login_url` (e.g. <https://login.salesforce.com>).
    pub async fn authenticate(&self, login_url: &str) -> Result<SalesforceCredentials> {
        let assertion = self.generate_assertion(login_url)?;

        debug!(login_url, username = %self.username, "authenticating with JWT bearer flow");

        let body = serde_urlencoded::to_string([
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ])?;

        let response = self
            .http_client
            .post(token_endpoint(login_url))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let token = handle_token_response(response).await?;
        Ok(SalesforceCredentials::new(
            token.instance_url,
            token.access_token,
            DEFAULT_API_VERSION,
        ))
    }
}

#[derive(Debug, Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    aud: &'a str,
    exp: i64,
}
