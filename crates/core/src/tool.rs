//! Capability trait — the abstraction over tools the model may call.
//!
//! The contract at this boundary is string in, string out. A capability
//! may have side effects (a network fetch, a subprocess), but the loop
//! only ever sees the returned string.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::ToolError;

/// The core Capability trait.
///
/// Each tool (`get_weather`, `run_command`, ...) implements this trait and
/// is registered under its name in the [`ToolRegistry`].
#[async_trait]
pub trait Capability: Send + Sync {
    /// The unique name the model uses to call this capability.
    fn name(&self) -> &str;

    /// What this capability does (rendered into the system prompt).
    fn description(&self) -> &str;

    /// Call signature shown to the model, e.g. `get_weather(city: str)`.
    fn signature(&self) -> String {
        format!("{}(input: str)", self.name())
    }

    /// Invoke the capability with the model-supplied input.
    async fn invoke(&self, input: &str) -> Result<String, ToolError>;

    /// Describe this capability for the tool catalog.
    fn info(&self) -> CapabilityInfo {
        CapabilityInfo {
            name: self.name().to_string(),
            signature: self.signature(),
            description: self.description().to_string(),
        }
    }
}

/// Catalog entry for one registered capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityInfo {
    pub name: String,
    pub signature: String,
    pub description: String,
}

/// A fixed mapping from tool name to capability.
///
/// Backed by a `BTreeMap` so the catalog renders in the same order on
/// every call.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Capability>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a capability. Replaces any existing one with the same name.
    pub fn register(&mut self, capability: impl Capability + 'static) {
        let name = capability.name().to_string();
        self.tools.insert(name, Arc::new(capability));
    }

    /// Get a capability by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Capability>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Look up `name` and invoke it with `input`.
    ///
    /// Fails with [`ToolError::UnknownTool`] if nothing is registered under
    /// that name. No retries.
    pub async fn invoke(&self, name: &str, input: &str) -> Result<String, ToolError> {
        let capability = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        debug!(tool = %name, "Invoking capability");
        capability.invoke(input).await
    }

    /// Catalog of registered capabilities, sorted by name.
    pub fn catalog(&self) -> Vec<CapabilityInfo> {
        self.tools.values().map(|t| t.info()).collect()
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
