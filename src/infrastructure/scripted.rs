use crate::domain::ports::Transport;
use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

/// A request as seen by the transport.
#[derive(Debug, PartialEq, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// One canned answer: a raw payload or a transport failure.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "snake_case")]
pub enum CannedResponse {
    Ok(Value),
    Error {
        #[serde(default)]
        status: Option<u16>,
        message: String,
    },
}

impl CannedResponse {
    fn into_result(self) -> Result<Value, TransportError> {
        match self {
            Self::Ok(value) => Ok(value),
            Self::Error { status, message } => Err(TransportError::new(status, message)),
        }
    }
}

/// Transport that replays queued responses in order.
///
/// Every request consumes the next response regardless of method or path; an
/// empty queue answers with a 503. Requests are recorded for inspection.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<CannedResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn push(&self, response: CannedResponse) {
        self.responses.lock().await.push_back(response);
    }

    pub async fn push_ok(&self, value: Value) {
        self.push(CannedResponse::Ok(value)).await;
    }

    pub async fn push_error(&self, status: Option<u16>, message: impl Into<String>) {
        self.push(CannedResponse::Error {
            status,
            message: message.into(),
        })
        .await;
    }

    /// Drops queued responses nobody asked for; returns how many there were.
    pub async fn discard_unused(&self) -> usize {
        let mut responses = self.responses.lock().await;
        let unused = responses.len();
        responses.clear();
        unused
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    async fn respond(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError> {
        self.requests.lock().await.push(RecordedRequest {
            method,
            path: path.to_string(),
            body,
        });
        let next = self.responses.lock().await.pop_front();
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match next {
            Some(response) => response.into_result(),
            None => Err(TransportError::new(Some(503), "no scripted response")),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        self.respond(Method::Get, path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        self.respond(Method::Post, path, Some(body)).await
    }

    async fn patch(&self, path: &str, body: Value) -> Result<Value, TransportError> {
        self.respond(Method::Patch, path, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value, TransportError> {
        self.respond(Method::Delete, path, None).await
    }
}
