//! Scripted data sources with controllable latency and failures.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use field_common::query::OP_SCALAR_FRAME;
use field_common::{FieldError, FieldResult, QueryClient, QueryResponse};
use playback::{FrameData, FrameSource};
use serde_json::Value;

/// Frame source returning `[Some(index)]` for every index, after an optional
/// per-index delay. Scripted indices fail with a data error instead.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFrames {
    delays: HashMap<usize, Duration>,
    default_delay: Duration,
    errors: HashMap<usize, String>,
    calls: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, index: usize, delay: Duration) -> Self {
        self.delays.insert(index, delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn with_error(mut self, index: usize, message: impl Into<String>) -> Self {
        self.errors.insert(index, message.into());
        self
    }

    /// Indices requested so far, in request order.
    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FrameSource for ScriptedFrames {
    async fn load_frame(&self, index: usize) -> FieldResult<FrameData> {
        self.calls.lock().unwrap().push(index);

        let delay = self.delays.get(&index).copied().unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match self.errors.get(&index) {
            Some(message) => Err(FieldError::query(OP_SCALAR_FRAME, message.clone())),
            None => Ok(FrameData::scalar(index, vec![Some(index as f64)])),
        }
    }
}

type Handler = Arc<dyn Fn(&Value) -> QueryResponse + Send + Sync>;

/// Query client answering each operation from a scripted handler.
#[derive(Clone, Default)]
pub struct ScriptedQueryClient {
    handlers: HashMap<String, Handler>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl ScriptedQueryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `operation` with a handler computing the response from the payload.
    pub fn on<F>(mut self, operation: &str, handler: F) -> Self
    where
        F: Fn(&Value) -> QueryResponse + Send + Sync + 'static,
    {
        self.handlers.insert(operation.to_string(), Arc::new(handler));
        self
    }

    /// Answer `operation` with a fixed response.
    pub fn respond(self, operation: &str, response: QueryResponse) -> Self {
        self.on(operation, move |_| response.clone())
    }

    /// `(operation, payload)` of every request so far.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, operation: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(op, _)| op == operation)
            .map(|(_, payload)| payload)
            .collect()
    }
}

#[async_trait]
impl QueryClient for ScriptedQueryClient {
    async fn query(&self, operation: &str, payload: Value) -> FieldResult<QueryResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((operation.to_string(), payload.clone()));

        match self.handlers.get(operation) {
            Some(handler) => Ok(handler(&payload)),
            None => Err(FieldError::Transport(format!(
                "no scripted response for '{}'",
                operation
            ))),
        }
    }
}
