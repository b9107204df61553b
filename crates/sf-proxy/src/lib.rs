//! # sf-proxy
//!
//! A local HTTP proxy in front of a Salesforce org that hides session
//! expiry from its callers.
//!
//! Requests under the configured prefixes (`/services/` and `/cometd/` by
//! default) are forwarded to the org's instance URL with the current bearer
//! token. When the org answers 401, the proxy renews the session through a
//! [`SessionRefresher`](thunder_sf_auth::SessionRefresher) and replays the
//! buffered request once. Concurrent expiries share a single refresh.
//!
//! ## Status mapping
//!
//! | Situation                              | Caller sees |
//! |----------------------------------------|-------------|
//! | Upstream answered (any status but 401) | that status |
//! | Refresh failed                         | 502         |
//! | Still 401 after refresh                | 502         |
//! | Upstream unreachable                   | 502         |
//! | Body over the limit                    | 413         |
//! | Body unreadable                        | 500         |
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use thunder_sf_auth::{SalesforceCredentials, SfdxRefresher};
//! use thunder_sf_proxy::{Proxy, ProxyConfig, Session};
//!
//! let creds = SalesforceCredentials::from_sfdx_alias("myorg").await?;
//! let session = Arc::new(Session::new(creds, Arc::new(SfdxRefresher::new("myorg"))));
//! let proxy = Proxy::new(ProxyConfig::default(), session)?;
//! let listener = proxy.bind().await?;
//! proxy.serve(listener).await?;
//! ```

mod config;
mod error;
mod forward;
mod server;
mod session;

pub use config::{ProxyConfig, ProxyConfigBuilder, DEFAULT_PORT, DEFAULT_PREFIXES};
pub use error::{Error, ErrorKind, Result};
pub use server::Proxy;
pub use session::Session;
