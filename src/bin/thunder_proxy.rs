//! Local Salesforce proxy that keeps an org session alive.
//!
//! Forwards `/services/` and `/cometd/` to the org, renewing the session
//! whenever the org answers 401.
//!
//! ```sh
//! # Session from the Salesforce CLI
//! cargo run --features cli --bin thunder-proxy -- --org my-scratch
//!
//! # Session from the environment, renewed with the refresh-token grant
//! export SF_INSTANCE_URL=https://example.my.salesforce.com
//! export SF_ACCESS_TOKEN=...
//! export SF_REFRESH_TOKEN=...
//! export SF_CLIENT_ID=...
//! cargo run --features cli --bin thunder-proxy
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use thunder_sf_api::auth::{
    Credentials, JwtAuth, JwtRefresher, OAuthClient, OAuthConfig, OAuthRefresher,
    SalesforceCredentials, SessionRefresher, SfdxRefresher, PRODUCTION_LOGIN_URL,
};
use thunder_sf_api::proxy::{Proxy, ProxyConfig, Session, DEFAULT_PORT};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "thunder-proxy", version, about)]
struct Args {
    /// Preferred port; any free port is used if it is taken.
    #[arg(long, env = "THUNDER_PROXY_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Address to bind.
    #[arg(long, env = "THUNDER_PROXY_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Salesforce CLI org alias or username to take the session from.
    #[arg(long, env = "SF_TARGET_ORG")]
    org: Option<String>,

    /// Connected app consumer key, for refresh-token or JWT sessions.
    #[arg(long, env = "SF_CLIENT_ID")]
    client_id: Option<String>,

    /// Connected app consumer secret.
    #[arg(long, env = "SF_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Login URL for token requests.
    #[arg(long, env = "SF_LOGIN_URL", default_value = PRODUCTION_LOGIN_URL)]
    login_url: String,

    /// Username for the JWT bearer grant.
    #[arg(long, env = "SF_USERNAME", requires = "jwt_key")]
    username: Option<String>,

    /// RSA private key (PEM) for the JWT bearer grant.
    #[arg(long, env = "SF_JWT_KEY_FILE", requires = "username")]
    jwt_key: Option<PathBuf>,

    /// Extra path prefix to forward; repeat for several. Replaces the
    /// defaults when given.
    #[arg(long = "prefix")]
    prefixes: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,thunder_sf_proxy=debug")),
        )
        .init();

    let args = Args::parse();

    let (credentials, refresher) = session_source(&args).await?;
    tracing::info!(
        instance_url = %credentials.instance_url(),
        refresher = refresher.name(),
        "session loaded"
    );

    let mut config = ProxyConfig::builder()
        .with_host(&args.host)
        .with_port(args.port);
    if !args.prefixes.is_empty() {
        config = config.with_prefixes(args.prefixes.iter().cloned());
    }
    let config = config.build()?;

    let session = Arc::new(Session::new(credentials, refresher));
    let proxy = Proxy::new(config, session)?;
    let listener = proxy.bind().await?;
    let addr = listener.local_addr()?;
    println!("Proxy listening on http://{addr}");

    proxy
        .serve_with_shutdown(listener, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

/// Pick where the session comes from and how it is renewed.
async fn session_source(
    args: &Args,
) -> anyhow::Result<(SalesforceCredentials, Arc<dyn SessionRefresher>)> {
    if let (Some(username), Some(key)) = (&args.username, &args.jwt_key) {
        let client_id = args
            .client_id
            .as_deref()
            .context("--client-id is required for the JWT bearer grant")?;
        let auth = JwtAuth::from_key_file(client_id, username, key)
            .with_context(|| format!("reading {}", key.display()))?;
        let credentials = auth
            .authenticate(&args.login_url)
            .await
            .context("JWT bearer login failed")?;
        return Ok((
            credentials,
            Arc::new(JwtRefresher::new(auth, &args.login_url)),
        ));
    }

    if let Some(org) = &args.org {
        let credentials = SalesforceCredentials::from_sfdx_alias(org)
            .await
            .with_context(|| format!("loading org {org} from the Salesforce CLI"))?;
        return Ok((credentials, Arc::new(SfdxRefresher::new(org))));
    }

    let credentials = SalesforceCredentials::from_env()
        .context("no --org given and no session in the environment")?;
    let Some(client_id) = args.client_id.as_deref() else {
        bail!("SF_CLIENT_ID is required to refresh an environment session");
    };
    let mut oauth = OAuthConfig::new(client_id);
    if let Some(secret) = &args.client_secret {
        oauth = oauth.with_secret(secret);
    }
    let refresher = OAuthRefresher::new(OAuthClient::new(oauth), &args.login_url);
    Ok((credentials, Arc::new(refresher)))
}
