use crate::api::{ApiError, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Call { endpoint: String, payload: Value },
    Query { endpoint: String, params: Vec<(String, String)> },
}

/// Scripted stand-in for `ApiClient`. Replies are queued per endpoint and
/// consumed in order; an endpoint with nothing queued answers `HTTP 503`.
#[derive(Default)]
pub struct FakeTransport {
    calls: Mutex<Vec<RecordedCall>>,
    replies: Mutex<HashMap<String, VecDeque<Result<Value, ApiError>>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, endpoint: &str, reply: Result<Value, ApiError>) {
        self.replies
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next_reply(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.replies
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Err(ApiError::Transport { status: 503 }))
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn call(&self, endpoint: &str, payload: Value) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall::Call {
            endpoint: endpoint.to_string(),
            payload,
        });
        self.next_reply(endpoint)
    }

    async fn query(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        self.calls.lock().unwrap().push(RecordedCall::Query {
            endpoint: endpoint.to_string(),
            params: params
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
        });
        self.next_reply(endpoint)
    }
}
