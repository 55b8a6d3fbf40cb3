//! Error types for the stepwise domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the loop only ever
//! surfaces the top-level [`Error`].

use thiserror::Error;

/// The top-level error type for all stepwise operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model call boundary ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Step protocol ---
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    // --- Capabilities ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

}

impl Error {
    /// Whether this error came from a malformed model step.
    pub fn is_malformed_step(&self) -> bool {
        matches!(self, Error::Step(StepError::Malformed { .. }))
    }

    /// Whether this error names a tool that is not registered.
    pub fn is_unknown_tool(&self) -> bool {
        matches!(self, Error::Tool(ToolError::UnknownTool(_)))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Provider resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether the agent loop should wait and retry the same step.
    ///
    /// Only throttling signals are transient. Everything else is fatal
    /// to the current query. Message text is never consulted here; the
    /// HTTP layer has already classified opaque bodies.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. } | ProviderError::ResourceExhausted(_) => true,
            ProviderError::ApiError { status_code, .. } => *status_code == 429,
            _ => false,
        }
    }
}

/// Text fallback for transient-failure detection.
///
/// Used only for error bodies that carry no parseable status.
pub fn looks_transient(text: &str) -> bool {
    text.contains("429") || text.contains("RESOURCE_EXHAUSTED")
}

#[derive(Debug, Clone, Error)]
pub enum StepError {
    #[error("Malformed step: {reason}")]
    Malformed { reason: String, raw: String },
}

impl StepError {
    pub(crate) fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        StepError::Malformed {
            reason: reason.into(),
            raw: raw.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),
}
