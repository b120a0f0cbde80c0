//! authwave - bearer-token HTTP client with single-flight renewal.
//!
//! Every request sent through an [`AuthClient`] carries the stored access
//! token. When the backend answers 401, the client renews the credential pair
//! through a shared [`RefreshCoordinator`] and replays the request once. Any
//! number of requests rejected together cause exactly one renewal call; if it
//! fails, the stored session is cleared and every one of them gets the error.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use authwave::{AuthClient, SessionController};
//! use authwave_core::{BaseUrl, Credentials, MemoryCredentialStore};
//! use authwave_http::HttpTransport;
//!
//! # async fn example() -> Result<(), authwave::Error> {
//! let transport = HttpTransport::new(BaseUrl::new("https://api.example.com")?)?;
//! let client = AuthClient::new(Arc::new(transport), Arc::new(MemoryCredentialStore::new()));
//! let session = SessionController::new(client.clone());
//!
//! session.login(&Credentials::new("alice@example.com", "hunter2")).await?;
//! let items: serde_json::Value = client.get_json("/api/items/").await?;
//! println!("{items}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod coordinator;
pub mod endpoints;
pub mod session;

#[cfg(test)]
mod testing;

pub use authwave_core::{
    AccessToken, CredentialPair, CredentialStore, Credentials, Error, RefreshToken,
    RequestDescriptor, Response, Result, Transport,
};
pub use client::{AuthClient, AutoRefresh};
pub use coordinator::RefreshCoordinator;
pub use endpoints::{Endpoints, Profile};
pub use session::{SessionController, SessionState};
