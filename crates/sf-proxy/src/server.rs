//! Router construction and the listening loop.

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::forward::{forward, ProxyState};
use crate::session::Session;

/// The session-recovery proxy.
///
/// Cheap to clone; clones share the session and the upstream client.
#[derive(Debug, Clone)]
pub struct Proxy {
    state: Arc<ProxyState>,
}

impl Proxy {
    /// Create a proxy over `session`.
    pub fn new(config: ProxyConfig, session: Arc<Session>) -> Result<Self> {
        let client = config.http_client()?;
        Ok(Self::with_http_client(config, session, client))
    }

    /// Create a proxy with a caller-supplied upstream client.
    pub fn with_http_client(
        config: ProxyConfig,
        session: Arc<Session>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            state: Arc::new(ProxyState {
                session,
                client,
                config,
            }),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.state.session
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.state.config
    }

    /// Build the router: every configured prefix is forwarded, anything
    /// else is a 404.
    pub fn router(&self) -> Router {
        let mut router = Router::new();
        for prefix in &self.state.config.prefixes {
            let base = prefix.trim_end_matches('/');
            router = router
                .route(&format!("{base}/"), any(forward))
                .route(&format!("{base}/{{*path}}"), any(forward));
        }
        router
            .layer(DefaultBodyLimit::max(self.state.config.max_body_bytes))
            .with_state(Arc::clone(&self.state))
    }

    /// Bind the listening socket.
    ///
    /// Falls back to an OS-assigned port when the preferred one is taken.
    pub async fn bind(&self) -> Result<TcpListener> {
        let config = &self.state.config;
        let preferred = format!("{}:{}", config.host, config.port);
        let listener = match TcpListener::bind(&preferred).await {
            Ok(listener) => listener,
            Err(e) if config.port != 0 => {
                warn!(addr = %preferred, error = %e, "preferred port unavailable, using any free port");
                TcpListener::bind(format!("{}:0", config.host)).await?
            }
            Err(e) => return Err(e.into()),
        };

        let addr = listener.local_addr()?;
        info!(%addr, prefixes = ?config.prefixes, "proxy listening");
        Ok(listener)
    }

    /// Serve on `listener` until the process is stopped.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("proxy stopped");
        Ok(())
    }
}
