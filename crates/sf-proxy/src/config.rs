//! Proxy configuration.

use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8000;

/// Path prefixes forwarded by default: the REST API family and the
/// streaming (CometD) endpoint.
pub const DEFAULT_PREFIXES: &[&str] = &["/services/", "/cometd/"];

/// Configuration for the recovery proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Path prefixes to forward. Anything else is answered with 404.
    pub prefixes: Vec<String>,
    /// Address to bind.
    pub host: String,
    /// Preferred port. If taken, the OS picks one.
    pub port: u16,
    /// Connect timeout for upstream requests.
    pub connect_timeout: Duration,
    /// Overall timeout for one upstream request. Streaming long-polls hold a
    /// request open for close to two minutes.
    pub request_timeout: Duration,
    /// User-Agent sent upstream when the caller sent none.
    pub user_agent: String,
    /// Largest inbound body the proxy will buffer.
    pub max_body_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(180),
            user_agent: format!("thunder-sf-proxy/{}", env!("CARGO_PKG_VERSION")),
            max_body_bytes: 32 * 1024 * 1024,
        }
    }
}

impl ProxyConfig {
    /// Create a new proxy config builder.
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }

    /// Build the upstream HTTP client.
    ///
    /// Decompression and redirects are left to the caller so responses pass
    /// through untouched.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .user_agent(&self.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .no_gzip()
            .no_deflate()
            .build()
            .map_err(|e| {
                Error::with_source(
                    ErrorKind::Config(format!("failed to build HTTP client: {e}")),
                    e,
                )
            })
    }
}

/// Builder for ProxyConfig.
#[derive(Debug, Default)]
pub struct ProxyConfigBuilder {
    config: ProxyConfig,
}

impl ProxyConfigBuilder {
    /// Replace the forwarded prefixes.
    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Set the bind address.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the preferred port. 0 lets the OS choose.
    pub fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the upstream connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the upstream request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the default User-Agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the inbound body limit.
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.config.max_body_bytes = limit;
        self
    }

    /// Build the proxy configuration.
    ///
    /// Every prefix must start with `/`.
    pub fn build(self) -> Result<ProxyConfig> {
        if self.config.prefixes.is_empty() {
            return Err(Error::new(ErrorKind::Config(
                "at least one path prefix is required".to_string(),
            )));
        }
        if let Some(bad) = self.config.prefixes.iter().find(|p| !p.starts_with('/')) {
            return Err(Error::new(ErrorKind::Config(format!(
                "path prefix must start with '/': {bad}"
            ))));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProxyConfig::default();
        assert_eq!(config.prefixes, vec!["/services/", "/cometd/"]);
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "127.0.0.1");
        assert!(config.user_agent.starts_with("thunder-sf-proxy/"));
    }

    #[test]
    fn test_builder() {
        let config = ProxyConfig::builder()
            .with_prefixes(["/services/"])
            .with_host("0.0.0.0")
            .with_port(0)
            .with_request_timeout(Duration::from_secs(5))
            .with_max_body_bytes(1024)
            .build()
            .unwrap();

        assert_eq!(config.prefixes, vec!["/services/"]);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 0);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_body_bytes, 1024);
        assert!(config.http_client().is_ok());
    }

    #[test]
    fn test_builder_rejects_bad_prefixes() {
        let empty: [&str; 0] = [];
        assert!(ProxyConfig::builder().with_prefixes(empty).build().is_err());

        let err = ProxyConfig::builder()
            .with_prefixes(["services/"])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }
}
