//! The step protocol — one structured unit of model output.
//!
//! The model is asked to reply with exactly one JSON object per call:
//!
//! ```json
//! { "step": "PLAN" | "TOOL" | "OUTPUT" | "START",
//!   "content": "string", "tool": "string", "input": "string" }
//! ```
//!
//! [`Step::parse`] turns that object into a sum type so that a tool step
//! without a tool name (or an output step with a tool name attached) is
//! unrepresentable past the parser.

use serde::{Deserialize, Serialize};

use crate::error::StepError;

/// One parsed step of model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Acknowledgment of the user's input. No side effect.
    Start { content: Option<String> },
    /// A reasoning step.
    Plan { content: String },
    /// A request to invoke a registered capability.
    Tool { name: String, input: String },
    /// The final answer for the current query.
    Output { content: String },
}

/// Wire shape of a step before validation.
#[derive(Debug, Deserialize)]
struct RawStep {
    step: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool: Option<String>,
    #[serde(default)]
    input: Option<String>,
}

impl Step {
    /// Parse raw model text into a validated step.
    ///
    /// Rejects anything that is not exactly one JSON object, unknown step
    /// kinds, and objects missing the fields their kind requires.
    pub fn parse(raw: &str) -> Result<Self, StepError> {
        let trimmed = raw.trim();
        if !trimmed.starts_with('{') {
            return Err(StepError::malformed("expected a single JSON object", raw));
        }

        // `from_str` fails on trailing characters, so `{..}{..}` is rejected here.
        let parsed: RawStep = serde_json::from_str(trimmed)
            .map_err(|e| StepError::malformed(format!("invalid step JSON: {e}"), raw))?;

        match parsed.step.trim().to_ascii_uppercase().as_str() {
            "START" => Ok(Step::Start {
                content: parsed.content,
            }),
            "PLAN" => {
                let content = parsed
                    .content
                    .ok_or_else(|| StepError::malformed("PLAN step is missing 'content'", raw))?;
                Ok(Step::Plan { content })
            }
            "TOOL" => {
                let name = non_blank(parsed.tool)
                    .ok_or_else(|| StepError::malformed("TOOL step is missing 'tool'", raw))?;
                let input = non_blank(parsed.input)
                    .ok_or_else(|| StepError::malformed("TOOL step is missing 'input'", raw))?;
                Ok(Step::Tool { name, input })
            }
            "OUTPUT" => {
                // Blank content is a valid (if unhelpful) answer.
                let content = parsed
                    .content
                    .ok_or_else(|| StepError::malformed("OUTPUT step is missing 'content'", raw))?;
                Ok(Step::Output { content })
            }
            other => Err(StepError::malformed(
                format!("unknown step kind '{other}'"),
                raw,
            )),
        }
    }

    /// Upper-case kind label, as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Step::Start { .. } => "START",
            Step::Plan { .. } => "PLAN",
            Step::Tool { .. } => "TOOL",
            Step::Output { .. } => "OUTPUT",
        }
    }

    /// Whether this step ends the current query.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Step::Output { .. })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// JSON schema of the step object, sent as the required output shape.
///
/// Uses the OpenAPI subset accepted by structured-output endpoints
/// (`STRING`/`OBJECT` type names, `enum` on the discriminator).
pub fn step_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "step": {
                "type": "STRING",
                "enum": ["START", "PLAN", "TOOL", "OUTPUT"],
                "description": "The ID of the step. Example: PLAN, OUTPUT, TOOL"
            },
            "content": {
                "type": "STRING",
                "description": "The optional string content for the step"
            },
            "tool": {
                "type": "STRING",
                "description": "The ID of the tool to call."
            },
            "input": {
                "type": "STRING",
                "description": "The input params for the tool"
            }
        },
        "required": ["step"]
    })
}

/// The record fed back to the model after a tool dispatch.
///
/// Never produced by the model; appended to history as a system message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(rename = "tool")]
    pub tool_name: String,
    #[serde(rename = "input")]
    pub tool_input: String,
    pub output: String,
}

impl Observation {
    pub fn new(
        tool_name: impl Into<String>,
        tool_input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            tool_input: tool_input.into(),
            output: output.into(),
        }
    }

    /// Serialise into the `OBSERVE` envelope the system prompt describes.
    ///
    /// Fields are written in a fixed order: `step`, `tool`, `input`, `output`.
    pub fn to_content(&self) -> String {
        let envelope = ObserveEnvelope {
            step: "OBSERVE",
            tool: &self.tool_name,
            input: &self.tool_input,
            output: &self.output,
        };
        serde_json::to_string(&envelope).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct ObserveEnvelope<'a> {
    step: &'static str,
    tool: &'a str,
    input: &'a str,
    output: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plan() {
        let step = Step::parse(r#"{"step":"PLAN","content":"User wants Delhi weather"}"#).unwrap();
        assert_eq!(
            step,
            Step::Plan {
                content: "User wants Delhi weather".into()
            }
        );
        assert!(!step.is_terminal());
    }

    #[test]
    fn parses_tool_with_surrounding_whitespace() {
        let step =
            Step::parse("\n  {\"step\":\"TOOL\",\"tool\":\"get_weather\",\"input\":\"delhi\"}\n")
                .unwrap();
        assert_eq!(
            step,
            Step::Tool {
                name: "get_weather".into(),
                input: "delhi".into()
            }
        );
    }

    #[test]
    fn step_kind_is_case_insensitive() {
        let step = Step::parse(r#"{"step":"output","content":"done"}"#).unwrap();
        assert!(step.is_terminal());
        assert_eq!(step.kind(), "OUTPUT");
    }

    #[test]
    fn start_content_is_optional() {
        let step = Step::parse(r#"{"step":"START"}"#).unwrap();
        assert_eq!(step, Step::Start { content: None });
    }

    #[test]
    fn blank_output_content_is_accepted() {
        let step = Step::parse(r#"{"step":"OUTPUT","content":"   "}"#).unwrap();
        assert_eq!(
            step,
            Step::Output {
                content: "   ".into()
            }
        );
    }

    #[test]
    fn tool_without_name_is_malformed() {
        let err = Step::parse(r#"{"step":"TOOL","input":"delhi"}"#).unwrap_err();
        assert!(err.to_string().contains("'tool'"));

        let err = Step::parse(r#"{"step":"TOOL","tool":"  ","input":"delhi"}"#).unwrap_err();
        assert!(err.to_string().contains("'tool'"));
    }

    #[test]
    fn tool_without_input_is_malformed() {
        let err = Step::parse(r#"{"step":"TOOL","tool":"get_weather","input":""}"#).unwrap_err();
        assert!(err.to_string().contains("'input'"));
    }

    #[test]
    fn output_without_content_is_malformed() {
        assert!(Step::parse(r#"{"step":"OUTPUT"}"#).is_err());
    }

    #[test]
    fn observe_is_never_accepted_from_the_model() {
        let err = Step::parse(r#"{"step":"OBSERVE","tool":"x","output":"y"}"#).unwrap_err();
        assert!(err.to_string().contains("OBSERVE"));
    }

    #[test]
    fn rejects_multiple_objects() {
        let raw = r#"{"step":"PLAN","content":"a"}{"step":"OUTPUT","content":"b"}"#;
        assert!(Step::parse(raw).is_err());
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(Step::parse("Sure! The weather is nice.").is_err());
        assert!(Step::parse(r#"[{"step":"PLAN","content":"a"}]"#).is_err());
        assert!(Step::parse(r#"{"step":"PLAN","content":"unterminated"#).is_err());
        assert!(Step::parse("").is_err());
    }

    #[test]
    fn null_optional_fields_are_tolerated() {
        let step = Step::parse(r#"{"step":"PLAN","content":"a","tool":null,"input":null}"#).unwrap();
        assert_eq!(step, Step::Plan { content: "a".into() });
    }

    #[test]
    fn malformed_error_keeps_raw_text() {
        let StepError::Malformed { raw, .. } = Step::parse("nope").unwrap_err();
        assert_eq!(raw, "nope");
    }

    #[test]
    fn observation_envelope() {
        let obs = Observation::new("get_weather", "delhi", "The weather in delhi is Sunny +31°C");
        let value: serde_json::Value = serde_json::from_str(&obs.to_content()).unwrap();
        assert_eq!(value["step"], "OBSERVE");
        assert_eq!(value["tool"], "get_weather");
        assert_eq!(value["input"], "delhi");
        assert_eq!(value["output"], "The weather in delhi is Sunny +31°C");
        assert!(obs.to_content().starts_with(r#"{"step":"OBSERVE","tool":"get_weather","input":"delhi""#));
    }

    #[test]
    fn schema_lists_every_step_kind() {
        let schema = step_response_schema();
        let kinds = schema["properties"]["step"]["enum"].as_array().unwrap();
        assert_eq!(kinds.len(), 4);
        assert_eq!(schema["required"][0], "step");
    }
}
