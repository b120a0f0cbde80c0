//! Bearer-attaching request interceptor.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use authwave_core::error::RequestFailedError;
use authwave_core::{
    AccessToken, Attempt, CredentialStore, RequestDescriptor, Response, Result, Transport,
};

use crate::coordinator::RefreshCoordinator;
use crate::endpoints::Endpoints;

/// Whether a send may renew the credential on 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoRefresh {
    /// Attach the stored bearer and renew once on 401.
    #[default]
    Enabled,
    /// Attach nothing and never renew. Used for login.
    Disabled,
}

/// HTTP client that attaches the stored access token to every request and
/// transparently renews it when the backend answers 401.
///
/// Cheap to clone; clones share the same store and [`RefreshCoordinator`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use authwave::{AuthClient, RequestDescriptor};
/// use authwave_core::{BaseUrl, MemoryCredentialStore};
/// use authwave_http::HttpTransport;
///
/// # async fn example() -> Result<(), authwave::Error> {
/// let transport = HttpTransport::new(BaseUrl::new("https://api.example.com")?)?;
/// let client = AuthClient::new(Arc::new(transport), Arc::new(MemoryCredentialStore::new()));
///
/// let response = client.send(RequestDescriptor::get("/api/items/")).await?;
/// println!("{}", response.text());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    coordinator: Arc<RefreshCoordinator>,
    endpoints: Endpoints,
}

impl AuthClient {
    /// Create a client using the default endpoint paths.
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        Self::with_endpoints(transport, store, Endpoints::default())
    }

    /// Create a client with custom endpoint paths.
    pub fn with_endpoints(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        endpoints: Endpoints,
    ) -> Self {
        let coordinator = Arc::new(RefreshCoordinator::new(
            transport.clone(),
            store.clone(),
            endpoints.refresh.clone(),
        ));

        Self {
            inner: Arc::new(ClientInner {
                transport,
                store,
                coordinator,
                endpoints,
            }),
        }
    }

    /// Returns the credential store backing this client.
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.inner.store
    }

    /// Returns the renewal coordinator shared by this client's requests.
    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.inner.coordinator
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.inner.endpoints
    }

    /// Send a request with the stored credential, renewing it once on 401.
    ///
    /// # Errors
    ///
    /// - `RequestFailed` for any non-2xx final response
    /// - `NoRefreshToken` / `RefreshFailed` when a 401 could not be recovered
    /// - `Transport` when no response arrived
    pub async fn send(&self, request: RequestDescriptor) -> Result<Response> {
        self.send_with(request, AutoRefresh::Enabled).await
    }

    /// Send a request, choosing whether the stored credential is used.
    #[instrument(skip(self, request), fields(method = %request.method(), target = %request.target()))]
    pub async fn send_with(
        &self,
        request: RequestDescriptor,
        auto_refresh: AutoRefresh,
    ) -> Result<Response> {
        let token = match auto_refresh {
            AutoRefresh::Enabled => self.inner.store.access_token()?,
            AutoRefresh::Disabled => None,
        };

        let response = self.dispatch(&request, token.as_ref()).await?;

        let renewable = auto_refresh == AutoRefresh::Enabled
            && request.attempt() == Attempt::Fresh
            && response.is_unauthorized();
        if !renewable {
            return into_result(response);
        }

        debug!("Credential rejected, obtaining a fresh one");
        let fresh = self
            .inner
            .coordinator
            .ensure_fresh_credential(token.as_ref())
            .await?;

        let replay = request.into_retried();
        let response = self.dispatch(&replay, Some(&fresh)).await?;
        into_result(response)
    }

    /// Send `request` and decode the JSON response.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestDescriptor) -> Result<T> {
        self.send(request).await?.json()
    }

    /// GET `target` and decode the JSON response.
    pub async fn get_json<T: DeserializeOwned>(&self, target: &str) -> Result<T> {
        self.send_json(RequestDescriptor::get(target)).await
    }

    /// POST `body` as JSON to `target` and decode the JSON response.
    pub async fn post_json<B, T>(&self, target: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = RequestDescriptor::post(target).json(body)?;
        self.send_json(request).await
    }

    async fn dispatch(
        &self,
        request: &RequestDescriptor,
        token: Option<&AccessToken>,
    ) -> Result<Response> {
        let response = match token {
            Some(token) => self.inner.transport.send(&request.with_bearer(token)).await?,
            None => self.inner.transport.send(request).await?,
        };
        debug!(status = response.status(), attempt = ?request.attempt(), "Response received");
        Ok(response)
    }
}

fn into_result(response: Response) -> Result<Response> {
    if response.is_success() {
        return Ok(response);
    }
    Err(RequestFailedError::new(
        response.status(),
        response.reason().map(str::to_string),
        response.json_value(),
    )
    .into())
}

impl fmt::Debug for AuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthClient")
            .field("endpoints", &self.inner.endpoints)
            .field("coordinator", &self.inner.coordinator)
            .field("store", &"[REDACTED]")
            .finish()
    }
}
