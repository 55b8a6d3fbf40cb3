//! The agent loop for stepwise.
//!
//! Each query follows a **Plan → Act → Observe** cycle:
//!
//! 1. **Receive** a user query and append it to the session history
//! 2. **Build the prompt** (system instructions + recent history)
//! 3. **Call the model**, which replies with exactly one step
//! 4. **If a tool step**: invoke the tool, append the observation, go to 2
//! 5. **If an output step**: return the answer
//!
//! The loop stops at the first answer, the first fatal error, or when the
//! step ceiling is reached.

pub mod context;
pub mod loop_runner;
pub mod prompt;
pub mod session;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use context::ContextBuilder;
pub use loop_runner::{AgentLoop, QueryOutcome};
pub use prompt::system_prompt;
pub use session::Session;
pub use stream_event::AgentEvent;
