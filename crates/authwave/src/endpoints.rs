//! Backend endpoint definitions and request/response types.

use serde::{Deserialize, Serialize};

use authwave_core::CredentialPair;

// ============================================================================
// Endpoint Paths
// ============================================================================

/// Credential exchange.
pub const LOGIN: &str = "/api/auth/login/";

/// Credential renewal.
pub const REFRESH: &str = "/api/auth/refresh/";

/// Identity of the current bearer.
pub const PROFILE: &str = "/api/users/me/";

/// Paths of the endpoints the client itself calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub login: String,
    pub refresh: String,
    pub profile: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: LOGIN.to_string(),
            refresh: REFRESH.to_string(),
            profile: PROFILE.to_string(),
        }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for the login endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Request body for the refresh endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Response from both the login and refresh endpoints.
#[derive(Deserialize)]
pub(crate) struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenPairResponse> for CredentialPair {
    fn from(response: TokenPairResponse) -> Self {
        CredentialPair::new(response.access_token, response.refresh_token)
    }
}

/// Identity returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub email: String,
    /// Any further fields the backend includes.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_keeps_unknown_fields() {
        let profile: Profile = serde_json::from_value(json!({
            "id": 7,
            "email": "a@a.com",
            "is_staff": false
        }))
        .unwrap();
        assert_eq!(profile.id, 7);
        assert_eq!(profile.extra.get("is_staff"), Some(&json!(false)));
    }

    #[test]
    fn token_pair_response_maps_to_pair() {
        let response: TokenPairResponse = serde_json::from_value(json!({
            "access_token": "new",
            "refresh_token": "new2"
        }))
        .unwrap();
        let pair = CredentialPair::from(response);
        assert_eq!(pair, CredentialPair::new("new", "new2"));
    }

    #[test]
    fn refresh_request_uses_snake_case() {
        let body = serde_json::to_value(RefreshRequest {
            refresh_token: "abc321",
        })
        .unwrap();
        assert_eq!(body, json!({"refresh_token": "abc321"}));
    }
}
