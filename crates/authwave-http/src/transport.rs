//! HTTP transport implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument, trace};

use authwave_core::error::{Error, InvalidInputError, TransportError};
use authwave_core::{BaseUrl, Method, RequestDescriptor, Response, Result, Transport};

const JSON: &str = "application/json";

/// A [`Transport`] that sends requests with reqwest.
///
/// Request targets are resolved against the base URL. Every request carries
/// `Content-Type` and `Accept` of `application/json` unless the caller set
/// them. Status codes are not interpreted here.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: BaseUrl,
}

impl HttpTransport {
    /// Create a transport with default settings.
    pub fn new(base: BaseUrl) -> Result<Self> {
        Self::builder(base).build()
    }

    pub fn builder(base: BaseUrl) -> HttpTransportBuilder {
        HttpTransportBuilder {
            base,
            timeout: None,
            user_agent: concat!("authwave/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Returns the base URL this transport resolves targets against.
    pub fn base(&self) -> &BaseUrl {
        &self.base
    }

    fn headers(request: &RequestDescriptor) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));

        for (name, value) in request.headers() {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| InvalidInputError::Header {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| InvalidInputError::Header {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    base: BaseUrl,
    timeout: Option<Duration>,
    user_agent: String,
}

impl HttpTransportBuilder {
    /// Total timeout per request. None by default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        let mut builder = reqwest::Client::builder().user_agent(self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(transport_error)?;

        Ok(HttpTransport {
            client,
            base: self.base,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(base = %self.base, method = %request.method(), target = %request.target()))]
    async fn send(&self, request: &RequestDescriptor) -> Result<Response> {
        let url = self.base.endpoint(request.target());
        debug!(%url, "Sending request");

        let mut builder = self
            .client
            .request(reqwest_method(request.method()), &url)
            .headers(Self::headers(request)?);

        if let Some(body) = request.body_json() {
            let bytes = serde_json::to_vec(body).map_err(|e| InvalidInputError::Other {
                message: format!("request body is not serializable: {}", e),
            })?;
            builder = builder.body(bytes);
        }

        let response = builder.send().await.map_err(transport_error)?;

        let status = response.status();
        trace!(status = %status, "Response status");

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?;

        let mut converted = Response::new(status.as_u16(), body.to_vec());
        if let Some(reason) = status.canonical_reason() {
            converted = converted.with_reason(reason);
        }
        for (name, value) in headers {
            converted = converted.with_header(name, value);
        }
        Ok(converted)
    }
}

fn reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    let err = if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else if err.is_decode() || err.is_body() {
        TransportError::Decode {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    };
    Error::Transport(err)
}
