//! Agent-level progress events.
//!
//! The loop sends these over an optional channel while a query runs; the
//! CLI driver renders them as they arrive.

use serde::{Deserialize, Serialize};

/// Events emitted by the agent loop during one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// The model acknowledged the query.
    Start { content: Option<String> },

    /// A reasoning step.
    Plan { content: String },

    /// The agent is calling a tool.
    ToolCall { name: String, input: String },

    /// Tool execution completed; `output` is what the model will observe.
    ToolResult {
        name: String,
        input: String,
        output: String,
    },

    /// The model call was throttled; the same prompt is sent again after
    /// `wait_secs`.
    RateLimited { wait_secs: u64, reason: String },

    /// The final answer.
    Answer { content: String },

    /// The step ceiling was hit without an answer.
    MaxStepsReached { steps: u32 },
}

impl AgentEvent {
    /// Short event name, matching the serialized `type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Plan { .. } => "plan",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::RateLimited { .. } => "rate_limited",
            Self::Answer { .. } => "answer",
            Self::MaxStepsReached { .. } => "max_steps_reached",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_tool_call() {
        let event = AgentEvent::ToolCall {
            name: "get_weather".into(),
            input: "delhi".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"tool_call""#));
        assert!(json.contains(r#""name":"get_weather""#));
    }

    #[test]
    fn event_serialization_rate_limited() {
        let event = AgentEvent::RateLimited {
            wait_secs: 10,
            reason: "quota".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"rate_limited""#));
        assert!(json.contains(r#""wait_secs":10"#));
    }

    #[test]
    fn event_type_matches_tag() {
        let events = [
            AgentEvent::Start { content: None },
            AgentEvent::Plan { content: "p".into() },
            AgentEvent::ToolResult {
                name: "n".into(),
                input: "i".into(),
                output: "o".into(),
            },
            AgentEvent::Answer { content: "a".into() },
            AgentEvent::MaxStepsReached { steps: 10 },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.event_type());
        }
    }

    #[test]
    fn event_deserialization() {
        let json = r#"{"type":"answer","content":"hi"}"#;
        let event: AgentEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, AgentEvent::Answer { content: "hi".into() });
    }
}
