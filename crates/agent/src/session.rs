//! A conversation session: the history the agent loop reads and appends to.
//!
//! One session per user. It is created by the driver and handed to the
//! loop for each query, so nothing about the conversation is global.

use stepwise_config::ContextScope;
use stepwise_core::message::{History, Message};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Session {
    history: History,
    scope: ContextScope,
}

impl Session {
    pub fn new(scope: ContextScope) -> Self {
        Self {
            history: History::new(),
            scope,
        }
    }

    pub fn scope(&self) -> ContextScope {
        self.scope
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Start a new query: reset the history if it is query-scoped, then
    /// append the user's message.
    pub fn begin_query(&mut self, query: &str) {
        if self.scope == ContextScope::Query && !self.history.is_empty() {
            debug!(dropped = self.history.len(), "Resetting query-scoped history");
            self.history = History::new();
        }
        self.history.push(Message::user(query));
    }

    /// Append a message to the history.
    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ContextScope::default())
    }
}
