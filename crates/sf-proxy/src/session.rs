//! The proxy's org session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thunder_sf_auth::{Credentials, SalesforceCredentials, SessionRefresher};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, ErrorKind, Result};

/// Credentials shared by every in-flight request, plus the strategy that
/// renews them.
///
/// Reads are concurrent. Refreshes go through a single gate, so a burst of
/// requests that all hit an expired token triggers one refresh, and shares
/// its failure if it fails.
pub struct Session {
    credentials: RwLock<SalesforceCredentials>,
    refresher: Arc<dyn SessionRefresher>,
    refresh_gate: Mutex<Option<FailedRefresh>>,
    attempts_finished: AtomicU64,
    refreshes: AtomicU64,
}

/// The most recent failed attempt, kept so requests already queued on the
/// gate report it instead of trying again.
struct FailedRefresh {
    stale_token: String,
    finished: u64,
    message: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("refresher", &self.refresher.name())
            .field("refreshes", &self.refresh_count())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(credentials: SalesforceCredentials, refresher: Arc<dyn SessionRefresher>) -> Self {
        Self {
            credentials: RwLock::new(credentials),
            refresher,
            refresh_gate: Mutex::new(None),
            attempts_finished: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
        }
    }

    /// A copy of the current credentials.
    pub async fn current(&self) -> SalesforceCredentials {
        self.credentials.read().await.clone()
    }

    /// Number of refreshes performed so far.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Renew the session after `stale_token` was rejected.
    ///
    /// If another request already replaced `stale_token`, the replacement is
    /// returned without refreshing again. If an attempt for `stale_token`
    /// failed while this call was queued, that failure is returned; a call
    /// arriving after the failure tries again.
    #[instrument(skip(self, stale_token), fields(refresher = self.refresher.name()))]
    pub async fn refresh_after(&self, stale_token: &str) -> Result<SalesforceCredentials> {
        let seen = self.attempts_finished.load(Ordering::Acquire);
        let mut last_failure = self.refresh_gate.lock().await;

        let current = self.current().await;
        if current.access_token() != stale_token {
            debug!("session already refreshed by a concurrent request");
            return Ok(current);
        }

        if let Some(failed) = last_failure
            .as_ref()
            .filter(|f| f.finished > seen && f.stale_token == stale_token)
        {
            debug!("concurrent refresh failed, not retrying");
            return Err(Error::new(ErrorKind::Refresh(failed.message.clone())));
        }

        let outcome = self.refresher.refresh(&current).await;
        let finished = self.attempts_finished.fetch_add(1, Ordering::AcqRel) + 1;
        match outcome {
            Ok(fresh) => {
                *last_failure = None;
                *self.credentials.write().await = fresh.clone();
                let count = self.refreshes.fetch_add(1, Ordering::Relaxed) + 1;
                info!(refreshes = count, "session refreshed");
                Ok(fresh)
            }
            Err(e) => {
                warn!(error = %e, "session refresh failed");
                *last_failure = Some(FailedRefresh {
                    stale_token: stale_token.to_string(),
                    finished,
                    message: e.to_string(),
                });
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;
    use thunder_sf_auth::{Error as AuthError, ErrorKind as AuthErrorKind};

    struct CountingRefresher {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl SessionRefresher for CountingRefresher {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn refresh(
            &self,
            current: &SalesforceCredentials,
        ) -> thunder_sf_auth::Result<SalesforceCredentials> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            if self.fail {
                return Err(AuthError::new(AuthErrorKind::OAuth {
                    error: "invalid_grant".into(),
                    description: "expired access/refresh token".into(),
                }));
            }
            Ok(SalesforceCredentials::new(
                current.instance_url(),
                format!("token-{n}"),
                current.api_version(),
            ))
        }
    }

    fn session(fail: bool) -> (Arc<Session>, Arc<CountingRefresher>) {
        let refresher = Arc::new(CountingRefresher {
            calls: AtomicU32::new(0),
            fail,
        });
        let creds = SalesforceCredentials::new("https://na1.salesforce.com", "token-0", "62.0");
        (Arc::new(Session::new(creds, refresher.clone())), refresher)
    }

    #[tokio::test]
    async fn test_refresh_replaces_token() {
        let (session, refresher) = session(false);

        let fresh = session.refresh_after("token-0").await.unwrap();
        assert_eq!(fresh.access_token(), "token-1");
        assert_eq!(session.current().await.access_token(), "token-1");
        assert_eq!(session.refresh_count(), 1);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_token_reuses_newer_session() {
        let (session, refresher) = session(false);
        session.refresh_after("token-0").await.unwrap();

        // A request that started with token-0 arrives late.
        let fresh = session.refresh_after("token-0").await.unwrap();
        assert_eq!(fresh.access_token(), "token-1");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_coalesce() {
        let (session, refresher) = session(false);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let session = Arc::clone(&session);
                tokio::spawn(async move { session.refresh_after("token-0").await })
            })
            .collect();

        for task in tasks {
            let fresh = task.await.unwrap().unwrap();
            assert_eq!(fresh.access_token(), "token-1");
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.refresh_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_old_credentials() {
        let (session, _) = session(true);

        let err = session.refresh_after("token-0").await.unwrap_err();
        assert!(err.is_auth_failure());
        assert_eq!(session.current().await.access_token(), "token-0");
        assert_eq!(session.refresh_count(), 0);
    }

    #[tokio::test]
    async fn test_queued_requests_share_a_failed_refresh() {
        let (session, refresher) = session(true);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let session = Arc::clone(&session);
                tokio::spawn(async move { session.refresh_after("token-0").await })
            })
            .collect();

        for task in tasks {
            let err = task.await.unwrap().unwrap_err();
            assert!(err.is_auth_failure());
            assert!(err.to_string().contains("invalid_grant"));
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);

        // A request arriving after the failure tries again.
        session.refresh_after("token-0").await.unwrap_err();
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_debug_hides_credentials() {
        let (session, _) = session(false);
        let debug_output = format!("{:?}", session);
        assert!(debug_output.contains("counting"));
        assert!(!debug_output.contains("token-0"));
    }
}
