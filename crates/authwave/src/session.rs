//! Login state on top of an [`AuthClient`].

use std::sync::{PoisonError, RwLock};

use tracing::{debug, info, instrument, warn};

use authwave_core::{CredentialPair, Credentials, RequestDescriptor, Result};

use crate::client::{AuthClient, AutoRefresh};
use crate::endpoints::{LoginRequest, Profile, TokenPairResponse};

/// Whether the client currently holds a working session.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated {
        /// Identity from the last successful profile fetch.
        profile: Option<Profile>,
    },
}

/// Drives login, logout and the "are we still logged in" probe.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use authwave::{AuthClient, SessionController};
/// use authwave_core::{BaseUrl, Credentials, MemoryCredentialStore};
/// use authwave_http::HttpTransport;
///
/// # async fn example() -> Result<(), authwave::Error> {
/// let transport = HttpTransport::new(BaseUrl::new("https://api.example.com")?)?;
/// let client = AuthClient::new(Arc::new(transport), Arc::new(MemoryCredentialStore::new()));
/// let session = SessionController::new(client);
///
/// session.login(&Credentials::new("alice@example.com", "hunter2")).await?;
/// if let Some(profile) = session.fetch_profile().await {
///     println!("Logged in as {}", profile.email);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionController {
    client: AuthClient,
    state: RwLock<SessionState>,
}

impl SessionController {
    /// Create a controller. The session starts anonymous until a login or a
    /// successful [`fetch_profile`](Self::fetch_profile).
    pub fn new(client: AuthClient) -> Self {
        Self {
            client,
            state: RwLock::new(SessionState::Anonymous),
        }
    }

    /// Exchange credentials for a credential pair and store it.
    ///
    /// The login request carries no bearer token and never triggers renewal.
    ///
    /// # Errors
    ///
    /// `RequestFailed` with the backend's status (401 for bad credentials),
    /// or `Transport` if the backend was unreachable. The session state and
    /// the store are left as they were.
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    pub async fn login(&self, credentials: &Credentials) -> Result<()> {
        info!("Logging in");

        let request = RequestDescriptor::post(&self.client.endpoints().login).json(&LoginRequest {
            email: credentials.email(),
            password: credentials.password(),
        })?;

        let response = self
            .client
            .send_with(request, AutoRefresh::Disabled)
            .await?;
        let pair: CredentialPair = response.json::<TokenPairResponse>()?.into();

        self.client.store().set(&pair)?;
        self.set_state(SessionState::Authenticated { profile: None });

        debug!("Login succeeded");
        Ok(())
    }

    /// Forget the stored credentials. Never fails.
    #[instrument(skip(self))]
    pub fn logout(&self) {
        if let Err(e) = self.client.store().clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        self.set_state(SessionState::Anonymous);
        info!("Logged out");
    }

    /// Fetch the current identity, renewing the credential if needed.
    ///
    /// Returns `None` and demotes the session to anonymous on any failure;
    /// the error is logged, never returned.
    #[instrument(skip(self))]
    pub async fn fetch_profile(&self) -> Option<Profile> {
        let profile_path = self.client.endpoints().profile.clone();

        match self.client.get_json::<Profile>(&profile_path).await {
            Ok(profile) => {
                debug!(id = profile.id, "Profile fetched");
                self.set_state(SessionState::Authenticated {
                    profile: Some(profile.clone()),
                });
                Some(profile)
            }
            Err(e) => {
                warn!(error = %e, "Profile fetch failed, session is anonymous");
                self.set_state(SessionState::Anonymous);
                None
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state(), SessionState::Authenticated { .. })
    }

    /// Identity from the last successful profile fetch.
    pub fn profile(&self) -> Option<Profile> {
        match self.state() {
            SessionState::Authenticated { profile } => profile,
            SessionState::Anonymous => None,
        }
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    fn set_state(&self, state: SessionState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use authwave_core::{CredentialStore, Error, MemoryCredentialStore, Response};
    use serde_json::json;

    use crate::endpoints::{LOGIN, PROFILE, REFRESH};
    use crate::testing::ScriptedTransport;

    fn controller(
        transport: &Arc<ScriptedTransport>,
        store: &Arc<MemoryCredentialStore>,
    ) -> SessionController {
        SessionController::new(AuthClient::new(transport.clone(), store.clone()))
    }

    #[tokio::test]
    async fn login_stores_tokens() {
        let store = Arc::new(MemoryCredentialStore::new());
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Response::json_body(200, &json!({"access_token": "123", "refresh_token": "321"}))
        }));
        let session = controller(&transport, &store);

        session
            .login(&Credentials::new("a@a.com", "password"))
            .await
            .unwrap();

        assert!(session.is_authenticated());
        assert_eq!(store.get().unwrap(), Some(CredentialPair::new("123", "321")));
        let call = &transport.calls_to(LOGIN)[0];
        assert_eq!(
            call.body_json(),
            Some(&json!({"email": "a@a.com", "password": "password"}))
        );
        assert_eq!(call.header_value("authorization"), None);
    }

    #[tokio::test]
    async fn login_with_invalid_credentials_stays_anonymous() {
        let store = Arc::new(MemoryCredentialStore::new());
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Response::json_body(401, &json!({"error": "invalid credentials"}))
                .with_reason("Unauthorized")
        }));
        let session = controller(&transport, &store);

        let err = session
            .login(&Credentials::new("a@a.com", "password"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Unauthorized"));
        assert!(matches!(err, Error::RequestFailed(ref e) if e.is_unauthorized()));
        assert!(!session.is_authenticated());
        assert!(store.get().unwrap().is_none());
        assert!(transport.calls_to(REFRESH).is_empty());
    }

    #[tokio::test]
    async fn login_transport_failure_is_distinguishable() {
        let store = Arc::new(MemoryCredentialStore::new());
        let transport = Arc::new(ScriptedTransport::unreachable());
        let session = controller(&transport, &store);

        let err = session
            .login(&Credentials::new("a@a.com", "password"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn logout_clears_store() {
        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new("a", "b")));
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Response::json_body(200, &json!({"id": 1, "email": "a@a.com"}))
        }));
        let session = controller(&transport, &store);
        session.fetch_profile().await.unwrap();

        session.logout();

        assert_eq!(session.state(), SessionState::Anonymous);
        assert!(store.get().unwrap().is_none());
    }

    #[tokio::test]
    async fn fetch_profile_authenticates() {
        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new("a", "b")));
        let transport = Arc::new(ScriptedTransport::new(|_| {
            Response::json_body(200, &json!({"id": 42, "email": "a@a.com"}))
        }));
        let session = controller(&transport, &store);

        let profile = session.fetch_profile().await.unwrap();

        assert_eq!(profile.id, 42);
        assert_eq!(session.profile(), Some(profile));
        assert_eq!(
            transport.calls_to(PROFILE)[0].header_value("authorization"),
            Some("Bearer a")
        );
    }

    #[tokio::test]
    async fn fetch_profile_failure_demotes_without_error() {
        let store = Arc::new(MemoryCredentialStore::with_pair(CredentialPair::new("a", "b")));
        let transport = Arc::new(ScriptedTransport::new(|_| Response::new(401, "")));
        let session = controller(&transport, &store);

        assert!(session.fetch_profile().await.is_none());
        assert_eq!(session.state(), SessionState::Anonymous);
        // The failed renewal inside the probe cleared the session.
        assert!(store.get().unwrap().is_none());
    }
}
