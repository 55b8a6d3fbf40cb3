//! # stepwise core
//!
//! Domain types, traits, and error definitions for the stepwise agent.
//! This crate has no I/O of its own. It defines the step protocol, the
//! conversation history, and the two seams every other crate implements
//! against: [`Provider`] (the model call) and [`Capability`] (a tool).

pub mod error;
pub mod message;
pub mod provider;
pub mod step;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StepError, ToolError};
pub use message::{History, HistoryId, Message, Role};
pub use provider::{ModelRequest, ModelResponse, Provider, Usage};
pub use step::{Observation, Step, step_response_schema};
pub use tool::{Capability, CapabilityInfo, ToolRegistry};
