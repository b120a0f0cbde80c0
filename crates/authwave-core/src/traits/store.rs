//! Credential persistence trait.

use crate::tokens::{AccessToken, CredentialPair, RefreshToken};
use crate::Result;

/// Synchronous persistence of the current credential pair.
///
/// Calls never suspend. Implementations are shared between tasks and must be
/// internally synchronized; a pair is always written and cleared as a unit.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored pair, if any.
    fn get(&self) -> Result<Option<CredentialPair>>;

    /// Replace the stored pair.
    fn set(&self, pair: &CredentialPair) -> Result<()>;

    /// Remove the stored pair.
    fn clear(&self) -> Result<()>;

    /// Returns the stored access token, if any.
    fn access_token(&self) -> Result<Option<AccessToken>> {
        Ok(self.get()?.map(|pair| pair.access_token))
    }

    /// Returns the stored refresh token, if any.
    fn refresh_token(&self) -> Result<Option<RefreshToken>> {
        Ok(self.get()?.map(|pair| pair.refresh_token))
    }
}
