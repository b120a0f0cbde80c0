//! Single-flight credential renewal.
//!
//! When several requests are rejected with 401 at about the same time, the
//! first one to reach the coordinator becomes the *leader* and performs the
//! one renewal call of that wave. Everyone arriving while it is in flight
//! becomes a *follower* and receives the leader's outcome, success or failure.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use authwave_core::error::{RefreshFailedError, RenewalError};
use authwave_core::{AccessToken, CredentialPair, CredentialStore, RequestDescriptor, Result, Transport};

use crate::endpoints::{RefreshRequest, TokenPairResponse};

type RenewalOutcome = std::result::Result<AccessToken, RenewalError>;

/// Coordinates credential renewal so at most one renewal call is in flight.
///
/// One coordinator is shared by every request sent through the same
/// [`AuthClient`](crate::AuthClient).
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    refresh_path: String,
    state: Mutex<WaveState>,
}

/// Shared renewal state. `waiters` is non-empty only while `refreshing`.
#[derive(Default)]
struct WaveState {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<RenewalOutcome>>,
}

enum Role {
    Leader,
    Follower(oneshot::Receiver<RenewalOutcome>),
    /// A wave settled after the rejected request was sent.
    Settled(AccessToken),
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        refresh_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            store,
            refresh_path: refresh_path.into(),
            state: Mutex::new(WaveState::default()),
        }
    }

    /// Obtain a credential to replace `rejected`, renewing if necessary.
    ///
    /// `rejected` is the access token the failed request carried, or `None`
    /// if it was sent without one. If the store already holds a different
    /// token and no renewal is in flight, that token is returned without a
    /// network call.
    ///
    /// # Errors
    ///
    /// - [`Error::NoRefreshToken`](authwave_core::Error::NoRefreshToken) when
    ///   nothing is stored to renew with
    /// - [`Error::RefreshFailed`](authwave_core::Error::RefreshFailed) when
    ///   the backend rejects the renewal or cannot be reached
    ///
    /// Both clear the credential store and are delivered to every request
    /// waiting on the same wave.
    #[instrument(skip_all)]
    pub async fn ensure_fresh_credential(
        &self,
        rejected: Option<&AccessToken>,
    ) -> Result<AccessToken> {
        match self.join_wave(rejected)? {
            Role::Settled(token) => {
                debug!("Credential already renewed, reusing stored token");
                Ok(token)
            }
            Role::Follower(receiver) => {
                debug!("Renewal in flight, waiting for its outcome");
                match receiver.await {
                    Ok(outcome) => outcome.map_err(Into::into),
                    Err(_) => Err(RenewalError::RefreshFailed(abandoned()).into()),
                }
            }
            Role::Leader => {
                let guard = WaveGuard {
                    coordinator: self,
                    settled: false,
                };
                let outcome = self.renew().await;
                guard.settle(&outcome);
                outcome.map_err(Into::into)
            }
        }
    }

    /// Start a renewal wave regardless of whether the current token works.
    pub async fn renew_now(&self) -> Result<AccessToken> {
        let current = self.store.access_token()?;
        self.ensure_fresh_credential(current.as_ref()).await
    }

    /// True while a renewal call is in flight.
    pub fn is_refreshing(&self) -> bool {
        self.lock_state().refreshing
    }

    /// Number of requests waiting on the in-flight renewal.
    pub fn pending_waiters(&self) -> usize {
        self.lock_state().waiters.len()
    }

    /// Decide leader or follower. Must not suspend while the lock is held.
    fn join_wave(&self, rejected: Option<&AccessToken>) -> Result<Role> {
        let mut state = self.lock_state();

        if state.refreshing {
            let (sender, receiver) = oneshot::channel();
            state.waiters.push(sender);
            return Ok(Role::Follower(receiver));
        }

        if let Some(current) = self.store.access_token()?
            && Some(&current) != rejected
        {
            return Ok(Role::Settled(current));
        }

        state.refreshing = true;
        Ok(Role::Leader)
    }

    async fn renew(&self) -> RenewalOutcome {
        let refresh_token = match self.store.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                warn!("Renewal needed but no refresh token is stored");
                return Err(RenewalError::NoRefreshToken);
            }
            Err(e) => {
                return Err(refresh_failed(
                    None,
                    format!("could not read stored credentials: {}", e),
                ));
            }
        };

        info!("Renewing credentials");

        let request = RequestDescriptor::post(&self.refresh_path)
            .json(&RefreshRequest {
                refresh_token: refresh_token.as_str(),
            })
            .map_err(|e| refresh_failed(None, e.to_string()))?;

        let response = self
            .transport
            .send(&request)
            .await
            .map_err(|e| refresh_failed(None, e.to_string()))?;

        if !response.is_success() {
            warn!(status = response.status(), "Renewal rejected by backend");
            return Err(refresh_failed(
                Some(response.status()),
                response.reason().unwrap_or("renewal rejected"),
            ));
        }

        let pair: CredentialPair = response
            .json::<TokenPairResponse>()
            .map_err(|e| refresh_failed(Some(response.status()), e.to_string()))?
            .into();

        self.store.set(&pair).map_err(|e| {
            refresh_failed(None, format!("could not persist renewed credentials: {}", e))
        })?;

        debug!("Credentials renewed");
        Ok(pair.access_token)
    }

    /// End the wave: reset the flag, drain the queue, and fan out `outcome`.
    fn settle(&self, outcome: &RenewalOutcome) {
        let waiters = {
            let mut state = self.lock_state();
            state.refreshing = false;
            if outcome.is_err()
                && let Err(e) = self.store.clear()
            {
                warn!(error = %e, "Failed to clear credentials after renewal failure");
            }
            std::mem::take(&mut state.waiters)
        };

        debug!(waiters = waiters.len(), "Releasing renewal waiters");
        for waiter in waiters {
            // A follower that stopped waiting has nothing left to notify.
            let _ = waiter.send(outcome.clone());
        }
    }

    /// End a wave whose leader went away before the renewal finished.
    fn abandon(&self) {
        let waiters = {
            let mut state = self.lock_state();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };

        warn!(waiters = waiters.len(), "Renewal abandoned before completion");
        let outcome: RenewalOutcome = Err(RenewalError::RefreshFailed(abandoned()));
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, WaveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("RefreshCoordinator")
            .field("refresh_path", &self.refresh_path)
            .field("refreshing", &state.refreshing)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

/// Releases the wave if the leader's future is dropped mid-renewal.
struct WaveGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl WaveGuard<'_> {
    fn settle(mut self, outcome: &RenewalOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for WaveGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.abandon();
        }
    }
}

fn refresh_failed(status: Option<u16>, message: impl Into<String>) -> RenewalError {
    RenewalError::RefreshFailed(RefreshFailedError::new(status, message))
}

fn abandoned() -> RefreshFailedError {
    RefreshFailedError::new(None, "renewal abandoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use authwave_core::{Error, MemoryCredentialStore, Response};
    use serde_json::json;

    use crate::endpoints::REFRESH;
    use crate::testing::ScriptedTransport;

    fn coordinator(
        transport: &Arc<ScriptedTransport>,
        store: &Arc<MemoryCredentialStore>,
    ) -> Arc<RefreshCoordinator> {
        Arc::new(RefreshCoordinator::new(
            transport.clone(),
            store.clone(),
            REFRESH,
        ))
    }

    fn renewed_pair() -> Response {
        Response::json_body(
            200,
            &json!({"access_token": "new_access_token", "refresh_token": "new_refresh_token"}),
        )
    }

    async fn wait_for_waiters(coordinator: &RefreshCoordinator, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while coordinator.pending_waiters() < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("followers never queued");
    }

    #[tokio::test]
    async fn leader_renews_and_persists_pair() {
        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new(
            "old", "old-refresh",
        )));
        let transport = Arc::new(ScriptedTransport::new(|_| renewed_pair()));
        let coordinator = coordinator(&transport, &store);

        let token = coordinator
            .ensure_fresh_credential(Some(&AccessToken::new("old")))
            .await
            .unwrap();

        assert_eq!(token, AccessToken::new("new_access_token"));
        assert_eq!(
            store.get().unwrap(),
            Some(CredentialPair::new("new_access_token", "new_refresh_token"))
        );
        let calls = transport.calls_to(REFRESH);
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].body_json(),
            Some(&json!({"refresh_token": "old-refresh"}))
        );
        assert_eq!(calls[0].header_value("authorization"), None);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn one_renewal_for_a_wave_of_many_callers() {
        const N: usize = 8;
        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new(
            "expired_token",
            "refresh_token",
        )));
        let transport = Arc::new(ScriptedTransport::new(|_| renewed_pair()).gated(REFRESH));
        let coordinator = coordinator(&transport, &store);

        let handles: Vec<_> = (0..N)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    coordinator
                        .ensure_fresh_credential(Some(&AccessToken::new("expired_token")))
                        .await
                })
            })
            .collect();

        wait_for_waiters(&coordinator, N - 1).await;
        assert!(coordinator.is_refreshing());
        transport.open_gate();

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token, AccessToken::new("new_access_token"));
        }
        assert_eq!(transport.calls_to(REFRESH).len(), 1);
        assert_eq!(coordinator.pending_waiters(), 0);
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn failed_renewal_rejects_every_waiter_and_clears_store() {
        const N: usize = 4;
        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new(
            "expired_token",
            "refresh_token",
        )));
        let transport = Arc::new(
            ScriptedTransport::new(|_| {
                Response::json_body(403, &json!({"detail": "Invalid refresh token"}))
                    .with_reason("Forbidden")
            })
            .gated(REFRESH),
        );
        let coordinator = coordinator(&transport, &store);

        let handles: Vec<_> = (0..N)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    coordinator
                        .ensure_fresh_credential(Some(&AccessToken::new("expired_token")))
                        .await
                })
            })
            .collect();

        wait_for_waiters(&coordinator, N - 1).await;
        transport.open_gate();

        for handle in handles {
            let err = handle.await.unwrap().unwrap_err();
            assert!(
                matches!(&err, Error::RefreshFailed(e) if e.status == Some(403)),
                "unexpected error: {err:?}"
            );
        }
        assert_eq!(transport.calls_to(REFRESH).len(), 1);
        assert!(store.get().unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_without_network() {
        let store = Arc::new(MemoryCredentialStore::new());
        let transport = Arc::new(ScriptedTransport::new(|_| renewed_pair()));
        let coordinator = coordinator(&transport, &store);

        let err = coordinator.ensure_fresh_credential(None).await.unwrap_err();

        assert!(matches!(err, Error::NoRefreshToken));
        assert!(transport.calls().is_empty());
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn settled_wave_is_reused_without_network() {
        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new(
            "already_renewed",
            "r",
        )));
        let transport = Arc::new(ScriptedTransport::new(|_| renewed_pair()));
        let coordinator = coordinator(&transport, &store);

        let token = coordinator
            .ensure_fresh_credential(Some(&AccessToken::new("expired_token")))
            .await
            .unwrap();

        assert_eq!(token, AccessToken::new("already_renewed"));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn unreachable_refresh_endpoint_is_refresh_failure() {
        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new("a", "b")));
        let transport = Arc::new(ScriptedTransport::unreachable());
        let coordinator = coordinator(&transport, &store);

        let err = coordinator.renew_now().await.unwrap_err();

        assert!(matches!(&err, Error::RefreshFailed(e) if e.status.is_none()));
        assert!(store.get().unwrap().is_none());
    }

    #[tokio::test]
    async fn dropped_leader_releases_followers() {
        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new("a", "b")));
        let transport = Arc::new(ScriptedTransport::new(|_| renewed_pair()).gated(REFRESH));
        let coordinator = coordinator(&transport, &store);

        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.renew_now().await })
        };
        tokio::time::timeout(Duration::from_secs(5), async {
            while !coordinator.is_refreshing() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let follower = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .ensure_fresh_credential(Some(&AccessToken::new("a")))
                    .await
            })
        };
        wait_for_waiters(&coordinator, 1).await;

        leader.abort();
        let err = follower.await.unwrap().unwrap_err();

        assert!(matches!(err, Error::RefreshFailed(_)));
        assert!(!coordinator.is_refreshing());
        // An abandoned wave leaves the stored pair alone.
        assert_eq!(store.get().unwrap(), Some(CredentialPair::new("a", "b")));
    }
}
