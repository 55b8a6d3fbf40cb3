//! Shared test helpers for agent loop tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use stepwise_core::error::{ProviderError, ToolError};
use stepwise_core::provider::{ModelRequest, ModelResponse, Provider};
use stepwise_core::tool::Capability;

/// A mock provider that replays a script of replies.
///
/// Each call to `complete` pops the next entry and records the request.
/// Panics if more calls are made than entries provided.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that only ever succeeds, with these replies in order.
    pub fn replies(replies: impl IntoIterator<Item = String>) -> Self {
        Self::new(replies.into_iter().map(Ok).collect())
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let model = request.model.clone();
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider: no reply scripted for call #{call}"));

        next.map(|text| ModelResponse {
            text,
            usage: None,
            model,
        })
    }
}

/// A capability that records every input and answers with a fixed string.
pub struct RecordingCapability {
    name: String,
    reply: Result<String, String>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingCapability {
    pub fn new(name: &str, reply: &str) -> Self {
        Self {
            name: name.into(),
            reply: Ok(reply.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A capability whose every invocation fails with `reason`.
    pub fn failing(name: &str, reason: &str) -> Self {
        Self {
            name: name.into(),
            reply: Err(reason.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Capability for RecordingCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Records its inputs"
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        self.calls.lock().unwrap().push(input.to_string());
        self.reply.clone().map_err(|reason| ToolError::ExecutionFailed {
            tool_name: self.name.clone(),
            reason,
        })
    }
}

pub fn plan(content: &str) -> String {
    serde_json::json!({ "step": "PLAN", "content": content }).to_string()
}

pub fn tool(name: &str, input: &str) -> String {
    serde_json::json!({ "step": "TOOL", "tool": name, "input": input }).to_string()
}

pub fn output(content: &str) -> String {
    serde_json::json!({ "step": "OUTPUT", "content": content }).to_string()
}
