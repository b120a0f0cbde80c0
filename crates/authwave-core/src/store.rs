//! In-memory credential store.

use std::sync::{PoisonError, RwLock};

use crate::Result;
use crate::tokens::CredentialPair;
use crate::traits::CredentialStore;

/// A [`CredentialStore`] that lives only as long as the process.
///
/// Useful for tests and for short-lived tools that log in on every run.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    pair: RwLock<Option<CredentialPair>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `pair`.
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            pair: RwLock::new(Some(pair)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<CredentialPair>> {
        let pair = self.pair.read().unwrap_or_else(PoisonError::into_inner);
        Ok(pair.clone())
    }

    fn set(&self, pair: &CredentialPair) -> Result<()> {
        let mut slot = self.pair.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(pair.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.pair.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::{AccessToken, RefreshToken};

    #[test]
    fn set_then_get_returns_pair() {
        let store = MemoryCredentialStore::new();
        store.set(&CredentialPair::new("a", "b")).unwrap();

        let pair = store.get().unwrap().unwrap();
        assert_eq!(pair.access_token, AccessToken::new("a"));
        assert_eq!(pair.refresh_token, RefreshToken::new("b"));
    }

    #[test]
    fn clear_removes_both_tokens() {
        let store = MemoryCredentialStore::with_pair(CredentialPair::new("123", "321"));
        store.clear().unwrap();

        assert!(store.get().unwrap().is_none());
        assert!(store.access_token().unwrap().is_none());
        assert!(store.refresh_token().unwrap().is_none());
    }

    #[test]
    fn set_replaces_previous_pair() {
        let store = MemoryCredentialStore::with_pair(CredentialPair::new("old", "old-r"));
        store.set(&CredentialPair::new("new", "new-r")).unwrap();
        assert_eq!(store.access_token().unwrap(), Some(AccessToken::new("new")));
        assert_eq!(
            store.refresh_token().unwrap(),
            Some(RefreshToken::new("new-r"))
        );
    }
}
