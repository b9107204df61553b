//! Request forwarding with one retry after a session refresh.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::rejection::{BytesRejection, FailedToBufferBody};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, Method, StatusCode, Uri};
use axum::response::Response;
use thunder_sf_auth::{Credentials, SalesforceCredentials};
use tracing::{debug, instrument, warn};

use crate::config::ProxyConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::session::Session;

/// Headers that describe one hop and never cross the proxy.
const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Everything a forwarded request needs.
#[derive(Debug)]
pub(crate) struct ProxyState {
    pub(crate) session: Arc<Session>,
    pub(crate) client: reqwest::Client,
    pub(crate) config: ProxyConfig,
}

/// Forward one inbound request to the org.
///
/// The body is buffered so it can be replayed. A 401 from the org triggers a
/// session refresh and exactly one retry; a second 401 is reported as 502.
#[instrument(skip_all, fields(method = %method, path = %uri.path()))]
pub(crate) async fn forward(
    State(state): State<Arc<ProxyState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Response> {
    let body = body.map_err(|rejection| body_error(rejection, state.config.max_body_bytes))?;
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    let credentials = state.session.current().await;
    let upstream = send(&state, &credentials, &method, path, &headers, &body).await?;
    if upstream.status() != StatusCode::UNAUTHORIZED {
        return relay(upstream).await;
    }

    warn!("Salesforce session expired, refreshing credentials and retrying");
    let fresh = state
        .session
        .refresh_after(credentials.access_token())
        .await?;

    let upstream = send(&state, &fresh, &method, path, &headers, &body).await?;
    if upstream.status() == StatusCode::UNAUTHORIZED {
        return Err(Error::new(ErrorKind::Unauthorized));
    }
    relay(upstream).await
}

async fn send(
    state: &ProxyState,
    credentials: &SalesforceCredentials,
    method: &Method,
    path: &str,
    inbound: &HeaderMap,
    body: &Bytes,
) -> Result<reqwest::Response> {
    let target = format!(
        "{}{}",
        credentials.instance_url().trim_end_matches('/'),
        path
    );
    debug!(target = %target, "forwarding request");

    let response = state
        .client
        .request(method.clone(), &target)
        .headers(request_headers(inbound))
        .bearer_auth(credentials.access_token())
        .body(body.clone())
        .send()
        .await?;

    debug!(status = response.status().as_u16(), "upstream responded");
    Ok(response)
}

async fn relay(upstream: reqwest::Response) -> Result<Response> {
    let status = upstream.status();
    let headers = response_headers(upstream.headers());
    let bytes = upstream.bytes().await?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Inbound headers minus the ones the proxy owns: credentials, routing and
/// framing.
fn request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = strip_hop_by_hop(inbound);
    headers.remove(header::AUTHORIZATION);
    headers.remove(header::HOST);
    headers
}

fn response_headers(upstream: &HeaderMap) -> HeaderMap {
    strip_hop_by_hop(upstream)
}

fn strip_hop_by_hop(source: &HeaderMap) -> HeaderMap {
    let mut headers = source.clone();
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    // The body is re-framed on each side.
    headers.remove(header::CONTENT_LENGTH);
    headers
}

fn body_error(rejection: BytesRejection, limit: usize) -> Error {
    match rejection {
        BytesRejection::FailedToBufferBody(FailedToBufferBody::LengthLimitError(e)) => {
            Error::with_source(ErrorKind::BodyTooLarge { limit }, e)
        }
        other => Error::new(ErrorKind::BodyRead(other.body_text())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_request_headers_drop_credentials_and_framing() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer caller"));
        inbound.insert(header::HOST, HeaderValue::from_static("localhost:8000"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        inbound.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        inbound.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        inbound.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        inbound.insert("sforce-call-options", HeaderValue::from_static("client=lwc"));

        let headers = request_headers(&inbound);

        assert!(headers.get(header::AUTHORIZATION).is_none());
        assert!(headers.get(header::HOST).is_none());
        assert!(headers.get(header::CONNECTION).is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers["sforce-call-options"], "client=lwc");
    }

    #[test]
    fn test_response_headers_keep_encoding() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        upstream.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        upstream.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let headers = response_headers(&upstream);

        assert_eq!(headers[header::CONTENT_ENCODING], "gzip");
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);
    }
}
