//! authwave-core - Core types and traits for the authwave client.

pub mod credentials;
pub mod error;
pub mod request;
pub mod store;
pub mod tokens;
pub mod traits;
pub mod types;

pub use credentials::Credentials;
pub use error::Error;
pub use request::{Attempt, Method, RequestDescriptor, Response};
pub use store::MemoryCredentialStore;
pub use tokens::{AccessToken, CredentialPair, RefreshToken};
pub use traits::{CredentialStore, Transport};
pub use types::BaseUrl;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
