//! Prompt assembly from system instructions and conversation history.
//!
//! | Part | Source |
//! |------|--------|
//! | System instructions | [`crate::prompt`], tool catalog |
//! | History | most recent N messages of the session |
//! | Open turn | `ASSISTANT:` marker |

pub mod builder;

pub use builder::ContextBuilder;
