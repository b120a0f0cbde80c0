//! Request and response types exchanged with a [`Transport`](crate::Transport).

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, InvalidInputError, TransportError};
use crate::tokens::AccessToken;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(InvalidInputError::Method {
                value: s.to_string(),
            }
            .into()),
        }
    }
}

/// Where a request is in its renewal lifecycle.
///
/// The only transition is `Fresh -> Retried`, taken when the request is
/// replayed after a renewal. A `Retried` request never triggers another one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attempt {
    #[default]
    Fresh,
    Retried,
}

/// A request to be sent through the interceptor.
///
/// `target` is resolved by the transport, normally against its base URL.
///
/// # Example
///
/// ```
/// use authwave_core::{Method, RequestDescriptor};
///
/// let req = RequestDescriptor::post("/api/items/")
///     .json(&serde_json::json!({"name": "widget"}))
///     .unwrap()
///     .header("X-Request-Id", "42");
/// assert_eq!(req.method(), Method::Post);
/// assert_eq!(req.header_value("x-request-id"), Some("42"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    target: String,
    headers: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    attempt: Attempt,
}

impl RequestDescriptor {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Vec::new(),
            body: None,
            attempt: Attempt::Fresh,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::Post, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::Put, target)
    }

    pub fn patch(target: impl Into<String>) -> Self {
        Self::new(Method::Patch, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::Delete, target)
    }

    /// Set a header, replacing any existing value with the same name.
    ///
    /// Header names compare case-insensitively.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name.into(), value.into());
        self
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, Error> {
        let value = serde_json::to_value(body).map_err(|e| InvalidInputError::Other {
            message: format!("request body is not serializable: {}", e),
        })?;
        self.body = Some(value);
        Ok(self)
    }

    /// Use an already-built JSON value as the request body.
    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body_json(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn attempt(&self) -> Attempt {
        self.attempt
    }

    /// Look up a header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Consume a fresh request and return its replay.
    pub fn into_retried(mut self) -> Self {
        self.attempt = Attempt::Retried;
        self
    }

    /// A copy of this request carrying `Authorization: Bearer <token>`.
    ///
    /// Any caller-supplied authorization header is replaced so exactly one
    /// bearer value is sent.
    pub fn with_bearer(&self, token: &AccessToken) -> Self {
        self.clone().header("Authorization", token.bearer())
    }

    fn set_header(&mut self, name: String, value: String) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value));
    }
}

/// A response received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    reason: Option<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            reason: None,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Build a response whose body is the serialized `value`.
    pub fn json_body(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
            .with_header("Content-Type", "application/json")
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Canonical reason phrase of the status, when the transport knows it.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|e| {
            TransportError::Decode {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// The body as JSON, or `None` when it is empty or not JSON.
    pub fn json_value(&self) -> Option<serde_json::Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bearer_replaces_existing_authorization() {
        let req = RequestDescriptor::get("/api/secure").header("authorization", "Bearer stale");
        let authed = req.with_bearer(&AccessToken::new("fresh"));

        let values: Vec<_> = authed
            .headers()
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case("authorization"))
            .collect();
        assert_eq!(values.len(), 1);
        assert_eq!(authed.header_value("Authorization"), Some("Bearer fresh"));
    }

    #[test]
    fn retried_transition_is_one_way() {
        let req = RequestDescriptor::get("/api/secure");
        assert_eq!(req.attempt(), Attempt::Fresh);
        let replay = req.into_retried();
        assert_eq!(replay.attempt(), Attempt::Retried);
        assert_eq!(replay.clone().into_retried().attempt(), Attempt::Retried);
    }

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn response_json_value_is_best_effort() {
        assert_eq!(Response::new(500, "").json_value(), None);
        assert_eq!(Response::new(502, "<html>").json_value(), None);
        assert_eq!(
            Response::json_body(403, &json!({"detail": "nope"})).json_value(),
            Some(json!({"detail": "nope"}))
        );
    }

    #[test]
    fn response_json_decode_error_is_transport() {
        let err = Response::new(200, "not json")
            .json::<serde_json::Value>()
            .unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::Decode { .. })));
    }
}
