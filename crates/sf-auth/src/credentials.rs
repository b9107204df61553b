//! Credentials and the places they come from.
//!
//! Debug output never shows token values.

use tracing::{debug, instrument};

use crate::error::{Error, ErrorKind, Result};
use crate::oauth::TokenResponse;
use crate::DEFAULT_API_VERSION;

/// Trait for Salesforce credentials.
pub trait Credentials: Send + Sync {
    /// Get the Salesforce instance URL.
    fn instance_url(&self) -> &str;

    /// Get the access token.
    fn access_token(&self) -> &str;

    /// Get the API version (e.g., "62.0").
    fn api_version(&self) -> &str;

    /// Returns true if the credentials appear to be valid (non-empty).
    fn is_valid(&self) -> bool {
        !self.instance_url().is_empty() && !self.access_token().is_empty()
    }
}

/// An org session: where to send requests and the bearer token to send.
#[derive(Clone)]
pub struct SalesforceCredentials {
    instance_url: String,
    access_token: String,
    api_version: String,
    refresh_token: Option<String>,
}

impl std::fmt::Debug for SalesforceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceCredentials")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl SalesforceCredentials {
    /// Create new credentials with the given values.
    pub fn new(
        instance_url: impl Into<String>,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            instance_url: instance_url.into(),
            access_token: access_token.into(),
            api_version: api_version.into(),
            refresh_token: None,
        }
    }

    /// Create credentials with a refresh token.
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Change the API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Get the refresh token if available.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Apply a token grant on top of these credentials.
    ///
    /// The access token and instance URL come from the grant. The API version
    /// is kept, and so is the refresh token unless the grant rotated it.
    pub fn refreshed(&self, token: TokenResponse) -> Self {
        Self {
            instance_url: token.instance_url,
            access_token: token.access_token,
            api_version: self.api_version.clone(),
            refresh_token: token.refresh_token.or_else(|| self.refresh_token.clone()),
        }
    }

    /// Get the base REST API URL for this org.
    pub fn rest_api_url(&self) -> String {
        format!(
            "{}/services/data/v{}",
            self.instance_url.trim_end_matches('/'),
            self.api_version
        )
    }

    /// Load credentials from environment variables.
    ///
    /// Required:
    /// - `SF_INSTANCE_URL` or `SALESFORCE_INSTANCE_URL`
    /// - `SF_ACCESS_TOKEN` or `SALESFORCE_ACCESS_TOKEN`
    ///
    /// Optional:
    /// - `SF_API_VERSION` or `SALESFORCE_API_VERSION` (default: [`DEFAULT_API_VERSION`])
    /// - `SF_REFRESH_TOKEN` or `SALESFORCE_REFRESH_TOKEN`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `var`.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let either = |short: &str, long: &str| var(short).or_else(|| var(long));

        let instance_url = either("SF_INSTANCE_URL", "SALESFORCE_INSTANCE_URL")
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SF_INSTANCE_URL".to_string())))?;
        let access_token = either("SF_ACCESS_TOKEN", "SALESFORCE_ACCESS_TOKEN")
            .ok_or_else(|| Error::new(ErrorKind::EnvVar("SF_ACCESS_TOKEN".to_string())))?;
        let api_version = either("SF_API_VERSION", "SALESFORCE_API_VERSION")
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let mut creds = Self::new(instance_url, access_token, api_version);
        if let Some(rt) = either("SF_REFRESH_TOKEN", "SALESFORCE_REFRESH_TOKEN") {
            creds = creds.with_refresh_token(rt);
        }
        Ok(creds)
    }

    /// Load credentials from the Salesforce CLI using an org alias or
    /// username.
    ///
    /// Runs `sf org display --target-org <alias> --json`. The CLI refreshes an
    /// expired session as a side effect, so calling this again is also how a
    /// CLI-backed session gets renewed.
    #[instrument]
    pub async fn from_sfdx_alias(alias_or_username: &str) -> Result<Self> {
        use tokio::process::Command;

        let output = Command::new("sf")
            .args([
                "org",
                "display",
                "--target-org",
                alias_or_username,
                "--json",
            ])
            .output()
            .await
            .map_err(|e| {
                Error::with_source(ErrorKind::SfCli(format!("failed to run sf CLI: {e}")), e)
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::new(ErrorKind::SfCli(format!(
                "sf org display failed: {}",
                stderr.trim()
            ))));
        }

        let creds = Self::from_org_display(&output.stdout)?;
        debug!(instance_url = %creds.instance_url, "loaded credentials from sf CLI");
        Ok(creds)
    }

    /// Parse the JSON printed by `sf org display --json`.
    pub fn from_org_display(json: &[u8]) -> Result<Self> {
        let json: serde_json::Value = serde_json::from_slice(json)?;

        let result = json
            .get("result")
            .ok_or_else(|| Error::new(ErrorKind::SfCli("missing 'result' in output".to_string())))?;
        let field = |name: &str| result.get(name).and_then(|v| v.as_str());

        let instance_url = field("instanceUrl")
            .ok_or_else(|| Error::new(ErrorKind::SfCli("missing instanceUrl".to_string())))?;
        let access_token = field("accessToken")
            .ok_or_else(|| Error::new(ErrorKind::SfCli("missing accessToken".to_string())))?;
        let api_version = field("apiVersion").unwrap_or(DEFAULT_API_VERSION);

        Ok(Self::new(instance_url, access_token, api_version))
    }
}

impl Credentials for SalesforceCredentials {
    fn instance_url(&self) -> &str {
        &self.instance_url
    }

    fn access_token(&self) -> &str {
        &self.access_token
    }

    fn api_version(&self) -> &str {
        &self.api_version
    }
}
