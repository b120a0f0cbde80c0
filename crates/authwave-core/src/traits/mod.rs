//! Seams between the client and its environment.

mod store;
mod transport;

pub use store::CredentialStore;
pub use transport::Transport;
