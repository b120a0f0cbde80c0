//! In-process transport for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use authwave_core::error::TransportError;
use authwave_core::{RequestDescriptor, Response, Result, Transport};

type Handler = Box<dyn Fn(&RequestDescriptor) -> Response + Send + Sync>;

/// Answers every request with a closure and records what it was sent.
///
/// Requests to a gated target block until [`ScriptedTransport::open_gate`].
pub(crate) struct ScriptedTransport {
    handler: Option<Handler>,
    calls: Mutex<Vec<RequestDescriptor>>,
    gate: Option<(String, Semaphore)>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&RequestDescriptor) -> Response + Send + Sync + 'static) -> Self {
        Self {
            handler: Some(Box::new(handler)),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// A transport on which every request fails without a response.
    pub fn unreachable() -> Self {
        Self {
            handler: None,
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(mut self, target: &str) -> Self {
        self.gate = Some((target.to_string(), Semaphore::new(0)));
        self
    }

    pub fn open_gate(&self) {
        if let Some((_, gate)) = &self.gate {
            gate.add_permits(1024);
        }
    }

    pub fn calls(&self) -> Vec<RequestDescriptor> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, target: &str) -> Vec<RequestDescriptor> {
        self.calls()
            .into_iter()
            .filter(|r| r.target() == target)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<Response> {
        self.calls.lock().unwrap().push(request.clone());

        if let Some((target, gate)) = &self.gate
            && target == request.target()
        {
            let _permit = gate.acquire().await.unwrap();
        }

        match &self.handler {
            Some(handler) => Ok(handler(request)),
            None => Err(TransportError::Connection {
                message: "connection refused".to_string(),
            }
            .into()),
        }
    }
}
