//! Request transport trait.

use async_trait::async_trait;

use crate::request::{RequestDescriptor, Response};
use crate::Result;

/// Sends a request and returns whatever response the backend produced.
///
/// A transport never interprets status codes: any received response,
/// including 4xx and 5xx, is `Ok`. `Err` means no response arrived.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response>;
}
