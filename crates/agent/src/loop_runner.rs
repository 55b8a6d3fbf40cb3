//! The agent reasoning loop implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use stepwise_config::{AppConfig, PromptStyle};
use stepwise_core::error::{Error, ToolError};
use stepwise_core::message::Message;
use stepwise_core::provider::{ModelRequest, ModelResponse, Provider};
use stepwise_core::step::{Observation, Step, step_response_schema};
use stepwise_core::tool::ToolRegistry;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::context::ContextBuilder;
use crate::prompt::system_prompt;
use crate::session::Session;
use crate::stream_event::AgentEvent;

/// How a query ended, when it did not end in an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    /// The model produced an `OUTPUT` step.
    Answered {
        answer: String,
        steps: u32,
        tool_calls: usize,
    },
    /// The step ceiling was reached first.
    MaxStepsReached { steps: u32, tool_calls: usize },
}

impl QueryOutcome {
    pub fn answer(&self) -> Option<&str> {
        match self {
            QueryOutcome::Answered { answer, .. } => Some(answer),
            QueryOutcome::MaxStepsReached { .. } => None,
        }
    }

    pub fn steps(&self) -> u32 {
        match self {
            QueryOutcome::Answered { steps, .. } | QueryOutcome::MaxStepsReached { steps, .. } => {
                *steps
            }
        }
    }

    pub fn tool_calls(&self) -> usize {
        match self {
            QueryOutcome::Answered { tool_calls, .. }
            | QueryOutcome::MaxStepsReached { tool_calls, .. } => *tool_calls,
        }
    }
}

/// The core agent loop: call the model, interpret its step, dispatch
/// tools, feed observations back, until an answer or the step ceiling.
pub struct AgentLoop {
    /// The model provider to use
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Renders history into the prompt
    context: ContextBuilder,

    /// Maximum loop iterations per query
    max_steps: u32,

    /// Fixed sleep before every model call
    pacing: Duration,

    /// Wait before retrying a throttled call
    backoff: Duration,
}

impl AgentLoop {
    /// Create a new agent loop with the chain-of-thought prompt, a
    /// ten-message window and the default timings.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        let prompt = system_prompt(PromptStyle::default(), &tools.catalog());
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            tools,
            context: ContextBuilder::new(prompt).with_window(Some(10)),
            max_steps: 10,
            pacing: Duration::from_secs(1),
            backoff: Duration::from_secs(10),
        }
    }

    /// Build a loop from the `[agent]` settings and top-level model config.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        let settings = &config.agent;
        Self::new(provider, config.resolved_model(), tools)
            .with_temperature(config.default_temperature)
            .with_max_steps(settings.max_steps)
            .with_prompt_style(settings.prompt_style)
            .with_history_window(settings.window())
            .with_pacing(Duration::from_millis(settings.pacing_delay_ms))
            .with_backoff(Duration::from_secs(settings.rate_limit_backoff_secs))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the step ceiling. Values below one are raised to one.
    pub fn with_max_steps(mut self, max: u32) -> Self {
        self.max_steps = max.max(1);
        self
    }

    /// Use the built-in prompt for `style`.
    pub fn with_prompt_style(self, style: PromptStyle) -> Self {
        let prompt = system_prompt(style, &self.tools.catalog());
        self.with_system_prompt(prompt)
    }

    /// Replace the system instructions outright.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let window = self.context.window();
        self.context = ContextBuilder::new(prompt).with_window(window);
        self
    }

    pub fn with_history_window(mut self, window: Option<usize>) -> Self {
        self.context = self.context.with_window(window);
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer one user query.
    ///
    /// Appends the query, every raw model reply and every observation to
    /// the session history. Malformed steps, unknown tools and
    /// non-transient provider failures end the query with an error; the
    /// session stays usable for the next query.
    pub async fn run(
        &self,
        session: &mut Session,
        query: &str,
        events: Option<&UnboundedSender<AgentEvent>>,
    ) -> Result<QueryOutcome, Error> {
        session.begin_query(query);

        info!(
            history_id = %session.history().id,
            messages = session.history().len(),
            "Processing query"
        );

        let mut steps = 0u32;
        let mut tool_calls = 0usize;

        while steps < self.max_steps {
            steps += 1;
            debug!(step = steps, max_steps = self.max_steps, "Agent loop iteration");

            let prompt = self.context.build(session.history());
            let request = ModelRequest::new(&self.model, prompt)
                .with_schema(step_response_schema())
                .with_temperature(self.temperature);

            let response = self.call_model(request, events).await?;
            session.push(Message::assistant(&response.text));

            let step = match Step::parse(&response.text) {
                Ok(step) => step,
                Err(e) => {
                    warn!(step = steps, error = %e, "Model returned a malformed step");
                    debug!(raw = %response.text, "Malformed step text");
                    return Err(e.into());
                }
            };

            match step {
                Step::Start { content } => {
                    emit(events, AgentEvent::Start { content });
                }
                Step::Plan { content } => {
                    emit(events, AgentEvent::Plan { content });
                }
                Step::Tool { name, input } => {
                    emit(
                        events,
                        AgentEvent::ToolCall {
                            name: name.clone(),
                            input: input.clone(),
                        },
                    );

                    let output = self.dispatch(&name, &input).await?;
                    tool_calls += 1;

                    emit(
                        events,
                        AgentEvent::ToolResult {
                            name: name.clone(),
                            input: input.clone(),
                            output: output.clone(),
                        },
                    );

                    let observation = Observation::new(name, input, output);
                    session.push(Message::system(observation.to_content()));
                }
                Step::Output { content } => {
                    info!(steps, tool_calls, "Query answered");
                    emit(
                        events,
                        AgentEvent::Answer {
                            content: content.clone(),
                        },
                    );
                    return Ok(QueryOutcome::Answered {
                        answer: content,
                        steps,
                        tool_calls,
                    });
                }
            }
        }

        warn!(steps, tool_calls, "Max steps reached without an answer");
        emit(events, AgentEvent::MaxStepsReached { steps });
        Ok(QueryOutcome::MaxStepsReached { steps, tool_calls })
    }

    /// Send `request`, retrying throttled calls with the same request
    /// until a non-transient result comes back.
    async fn call_model(
        &self,
        request: ModelRequest,
        events: Option<&UnboundedSender<AgentEvent>>,
    ) -> Result<ModelResponse, Error> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            match self.provider.complete(request.clone()).await {
                Ok(response) => {
                    if let Some(usage) = &response.usage {
                        debug!(
                            model = %response.model,
                            tokens = usage.total_tokens,
                            "Model call complete"
                        );
                    }
                    return Ok(response);
                }
                Err(e) if e.is_transient() => {
                    warn!(
                        attempt,
                        backoff_secs = self.backoff.as_secs(),
                        error = %e,
                        "Model call throttled, retrying"
                    );
                    emit(
                        events,
                        AgentEvent::RateLimited {
                            wait_secs: self.backoff.as_secs(),
                            reason: e.to_string(),
                        },
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                Err(e) => {
                    warn!(provider = %self.provider.name(), error = %e, "Model call failed");
                    return Err(e.into());
                }
            }
        }
    }

    /// Invoke a tool. Capability failures become the observation text;
    /// an unregistered name is fatal.
    async fn dispatch(&self, name: &str, input: &str) -> Result<String, Error> {
        let start = Instant::now();
        let result = self.tools.invoke(name, input).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                debug!(tool = %name, duration_ms, "Tool executed");
                Ok(output)
            }
            Err(ToolError::UnknownTool(tool)) => {
                warn!(tool = %tool, "Model requested an unregistered tool");
                Err(ToolError::UnknownTool(tool).into())
            }
            Err(e) => {
                warn!(tool = %name, duration_ms, error = %e, "Tool execution failed");
                Ok(format!("Error: {e}"))
            }
        }
    }
}

fn emit(events: Option<&UnboundedSender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = events {
        // The receiver going away only means nobody is rendering.
        let _ = tx.send(event);
    }
}
