//! System instructions given to the model on every call.
//!
//! Both styles describe the step object, list the registered tools, and
//! walk through a worked example. The text depends only on the style and
//! the tool catalog, so it is stable across calls.

use std::fmt::Write;

use stepwise_config::PromptStyle;
use stepwise_core::tool::CapabilityInfo;

const STEP_FORMAT: &str =
    r#"{ "step": "START" | "PLAN" | "TOOL" | "OUTPUT", "content": "string", "tool": "string", "input": "string" }"#;

const DIRECT_STEP_FORMAT: &str =
    r#"{ "step": "PLAN" | "TOOL" | "OUTPUT", "content": "string", "tool": "string", "input": "string" }"#;

/// Render the system prompt for `style` with the given tool catalog.
pub fn system_prompt(style: PromptStyle, catalog: &[CapabilityInfo]) -> String {
    match style {
        PromptStyle::ChainOfThought => chain_of_thought(catalog),
        PromptStyle::Direct => direct(catalog),
    }
}

fn tool_list(catalog: &[CapabilityInfo]) -> String {
    if catalog.is_empty() {
        return "- (none)\n".into();
    }
    let mut out = String::new();
    for tool in catalog {
        let _ = writeln!(out, "- {}: {}", tool.signature, tool.description);
    }
    out
}

fn chain_of_thought(catalog: &[CapabilityInfo]) -> String {
    format!(
        r#"You are an expert assistant that resolves user queries by reasoning step by step.
You work in START, PLAN, TOOL and OUTPUT steps.
First PLAN what needs to be done; planning may take several steps.
When you have planned enough, give the final OUTPUT.
If a tool from the list below helps, call it with a TOOL step and wait for
the OBSERVE message that carries the tool's output.

Rules:
- Reply with exactly one JSON object in the format below, nothing else.
- Emit one step per reply.
- The sequence is START (acknowledging the user's input), PLAN (one or more), optional TOOL calls, and finally OUTPUT (shown to the user).
- Keep planning concise: no more than 3-4 PLAN steps before acting.
- Never emit an OBSERVE step yourself.

Output JSON Format:
{STEP_FORMAT}

Available Tools:
{tools}
Example 1:
USER: Hey, can you solve 2 + 3 * 5 / 10
ASSISTANT: {{ "step": "PLAN", "content": "The user wants an arithmetic result; apply operator precedence." }}
ASSISTANT: {{ "step": "PLAN", "content": "3 * 5 = 15, 15 / 10 = 1.5, 2 + 1.5 = 3.5" }}
ASSISTANT: {{ "step": "OUTPUT", "content": "3.5" }}

Example 2:
USER: What is the weather of Delhi?
ASSISTANT: {{ "step": "PLAN", "content": "The user wants the weather in Delhi. I should call get_weather." }}
ASSISTANT: {{ "step": "TOOL", "tool": "get_weather", "input": "delhi" }}
SYSTEM: {{ "step": "OBSERVE", "tool": "get_weather", "input": "delhi", "output": "The weather in delhi is Cloudy +20°C" }}
ASSISTANT: {{ "step": "OUTPUT", "content": "It is currently 20°C and cloudy in Delhi." }}
"#,
        tools = tool_list(catalog),
    )
}

fn direct(catalog: &[CapabilityInfo]) -> String {
    format!(
        r#"You are an expert assistant that resolves user queries efficiently.

Rules:
- Reply with exactly one JSON object in the format below, nothing else.
- Finish in at most three steps: PLAN, then TOOL, then OUTPUT.
- Be direct. Skip any planning that is not needed.
- Never emit an OBSERVE step yourself.

Output JSON Format:
{DIRECT_STEP_FORMAT}

Available Tools:
{tools}
Example:
USER: What is the weather of Delhi?
ASSISTANT: {{ "step": "PLAN", "content": "Needs Delhi weather; call get_weather." }}
ASSISTANT: {{ "step": "TOOL", "tool": "get_weather", "input": "delhi" }}
SYSTEM: {{ "step": "OBSERVE", "tool": "get_weather", "input": "delhi", "output": "The weather in delhi is Partly cloudy +20°C" }}
ASSISTANT: {{ "step": "OUTPUT", "content": "Delhi is partly cloudy at 20°C." }}
"#,
        tools = tool_list(catalog),
    )
}
