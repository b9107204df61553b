//! # sf-auth
//!
//! Salesforce sessions for the recovery proxy: where credentials come from
//! and how an expired one gets renewed.
//!
//! ## Security
//!
//! - Tokens, secrets and private keys are redacted in Debug output
//! - Tracing skips credential parameters
//! - Error messages sanitize credential data
//!
//! ## Credential sources
//!
//! - Environment variables ([`SalesforceCredentials::from_env`])
//! - Salesforce CLI org alias ([`SalesforceCredentials::from_sfdx_alias`])
//! - JWT bearer grant ([`JwtAuth`])
//!
//! ## Refresh strategies
//!
//! [`SessionRefresher`] is implemented by [`OAuthRefresher`] (refresh-token
//! grant), [`SfdxRefresher`] (re-read the CLI session) and [`JwtRefresher`]
//! (mint a new session).
//!
//! ## Example
//!
//! ```rust,ignore
//! use thunder_sf_auth::{SalesforceCredentials, SessionRefresher, SfdxRefresher};
//!
//! let creds = SalesforceCredentials::from_sfdx_alias("myorg").await?;
//! let refresher = SfdxRefresher::new("myorg");
//! let fresh = refresher.refresh(&creds).await?;
//! ```

mod credentials;
mod error;
mod jwt;
mod oauth;
mod refresh;

pub use credentials::{Credentials, SalesforceCredentials};
pub use error::{Error, ErrorKind, Result};
pub use jwt::JwtAuth;
pub use oauth::{OAuthClient, OAuthConfig, TokenResponse};
pub use refresh::{JwtRefresher, OAuthRefresher, SessionRefresher, SfdxRefresher};

/// Default Salesforce login URL for production.
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";

/// Default Salesforce login URL for sandbox.
pub const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com";

/// API version used when a credential source does not name one.
pub const DEFAULT_API_VERSION: &str = "62.0";
