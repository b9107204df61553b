//! # thunder-sf-api
//!
//! Client-side Salesforce data access for applications that reach the org
//! through a host runtime's promise-based bridge.
//!
//! ## Crates
//!
//! - **thunder-sf-composite** - Composite API codec: batch detection, sub-response classification, aggregate errors
//! - **thunder-sf-bridge** - Blocking invoker over the host bridge with per-class dispatch locks
//! - **thunder-sf-auth** - Credential sources and session refresh strategies
//! - **thunder-sf-proxy** - Local proxy that renews expired sessions and replays the request
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use thunder_sf_api::{Invoker, HostBridge};
//!
//! fn load_account(host: Arc<dyn HostBridge>) -> thunder_sf_api::bridge::Result<Vec<u8>> {
//!     let invoker = Invoker::new(host)?;
//!     invoker.get("/services/data/v62.0/sobjects/Account/001xx000003DGb2")
//! }
//! ```
//!
//! Composite batches posted through the invoker come back as
//! [`bridge::ErrorKind::PartialBatch`] when some sub-requests failed; the
//! error still carries the raw payload.

#[cfg(feature = "auth")]
pub use thunder_sf_auth as auth;
#[cfg(feature = "bridge")]
pub use thunder_sf_bridge as bridge;
#[cfg(feature = "composite")]
pub use thunder_sf_composite as composite;
#[cfg(feature = "proxy")]
pub use thunder_sf_proxy as proxy;

#[cfg(feature = "auth")]
pub use thunder_sf_auth::{Credentials, SalesforceCredentials, SessionRefresher};
#[cfg(feature = "bridge")]
pub use thunder_sf_bridge::{CallClass, CallLocks, HostBridge, HostCall, Invoker, InvokerConfig};
#[cfg(feature = "composite")]
pub use thunder_sf_composite::{is_composite, parse_composite_response, CompositeErrors};
#[cfg(feature = "proxy")]
pub use thunder_sf_proxy::{Proxy, ProxyConfig, Session};
