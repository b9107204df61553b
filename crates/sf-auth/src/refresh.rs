//! Strategies for renewing an expired session.

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::credentials::{Credentials, SalesforceCredentials};
use crate::error::{Error, ErrorKind, Result};
use crate::jwt::JwtAuth;
use crate::oauth::OAuthClient;

/// Produces fresh credentials once the current access token stops working.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Obtain a new session. `current` holds the credentials that were just
    /// rejected.
    async fn refresh(&self, current: &SalesforceCredentials) -> Result<SalesforceCredentials>;
}

/// Refresh through the OAuth refresh-token grant.
///
/// Uses the refresh token carried by the current credentials.
#[derive(Debug, Clone)]
pub struct OAuthRefresher {
    client: OAuthClient,
    login_url: String,
}

impl OAuthRefresher {
    pub fn new(client: OAuthClient, login_url: impl Into<String>) -> Self {
        Self {
            client,
            login_url: login_url.into(),
        }
    }
}

#[async_trait]
impl SessionRefresher for OAuthRefresher {
    fn name(&self) -> &'static str {
        "oauth"
    }

    #[instrument(skip(self, current), fields(login_url = %self.login_url))]
    async fn refresh(&self, current: &SalesforceCredentials) -> Result<SalesforceCredentials> {
        let refresh_token = current.refresh_token().ok_or_else(|| {
            Error::new(ErrorKind::InvalidCredentials(
                "no refresh token available".to_string(),
            ))
        })?;

        let token = self
            .client
            .refresh_token(refresh_token, &self.login_url)
            .await?;
        let fresh = current.refreshed(token);
        info!(instance_url = %fresh.instance_url(), "session refreshed via refresh token");
        Ok(fresh)
    }
}

/// Refresh by asking the Salesforce CLI for the org's current session.
#[derive(Debug, Clone)]
pub struct SfdxRefresher {
    alias_or_username: String,
}

impl SfdxRefresher {
    pub fn new(alias_or_username: impl Into<String>) -> Self {
        Self {
            alias_or_username: alias_or_username.into(),
        }
    }
}

#[async_trait]
impl SessionRefresher for SfdxRefresher {
    fn name(&self) -> &'static str {
        "sf-cli"
    }

    async fn refresh(&self, current: &SalesforceCredentials) -> Result<SalesforceCredentials> {
        let fresh = SalesforceCredentials::from_sfdx_alias(&self.alias_or_username)
            .await?
            .with_api_version(current.api_version());
        info!(org = %self.alias_or_username, "session refreshed via sf CLI");
        Ok(fresh)
    }
}

/// Refresh by minting a new session with the JWT bearer grant.
#[derive(Debug, Clone)]
pub struct JwtRefresher {
    auth: JwtAuth,
    login_url: String,
}

impl JwtRefresher {
    pub fn new(auth: JwtAuth, login_url: impl Into<String>) -> Self {
        Self {
            auth,
            login_url: login_url.into(),
        }
    }
}

#[async_trait]
impl SessionRefresher for JwtRefresher {
    fn name(&self) -> &'static str {
        "jwt"
    }

    async fn refresh(&self, current: &SalesforceCredentials) -> Result<SalesforceCredentials> {
        let fresh = self
            .auth
            .authenticate(&self.login_url)
            .await?
            .with_api_version(current.api_version());
        info!(instance_url = %fresh.instance_url(), "session refreshed via JWT bearer");
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::OAuthConfig;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_oauth_refresher_updates_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/oauth2/token"))
            .and(body_string_contains("refresh_token=rt_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "instance_url": "https://na1.salesforce.com"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let refresher = OAuthRefresher::new(
            OAuthClient::new(OAuthConfig::new("client123")),
            mock_server.uri(),
        );
        let current = SalesforceCredentials::new("https://na1.salesforce.com", "stale", "61.0")
            .with_refresh_token("rt_abc");

        let fresh = refresher.refresh(&current).await.unwrap();
        assert_eq!(fresh.access_token(), "fresh");
        assert_eq!(fresh.api_version(), "61.0");
        assert_eq!(fresh.refresh_token(), Some("rt_abc"));
        assert_eq!(refresher.name(), "oauth");
    }

    #[tokio::test]
    async fn test_oauth_refresher_requires_refresh_token() {
        let refresher = OAuthRefresher::new(
            OAuthClient::new(OAuthConfig::new("client123")),
            "http://127.0.0.1:9",
        );
        let current = SalesforceCredentials::new("https://na1.salesforce.com", "stale", "62.0");

        let err = refresher.refresh(&current).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidCredentials(_)));
    }

    #[tokio::test]
    async fn test_jwt_refresher_surfaces_signing_error() {
        let refresher = JwtRefresher::new(
            JwtAuth::new("key", "user", b"not a pem".to_vec()),
            "http://127.0.0.1:9",
        );
        let current = SalesforceCredentials::new("https://na1.salesforce.com", "stale", "62.0");

        let err = refresher.refresh(&current).await.unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Jwt(_)));
    }

    #[test]
    fn test_refreshers_are_object_safe() {
        let refreshers: Vec<Box<dyn SessionRefresher>> = vec![
            Box::new(SfdxRefresher::new("dev")),
            Box::new(OAuthRefresher::new(
                OAuthClient::new(OAuthConfig::new("c")),
                crate::PRODUCTION_LOGIN_URL,
            )),
        ];
        let names: Vec<_> = refreshers.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["sf-cli", "oauth"]);
    }
}
