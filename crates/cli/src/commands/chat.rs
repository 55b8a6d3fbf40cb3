//! `stepwise chat` — Interactive or single-message mode.
//!
//! Reads one query at a time, runs the agent loop to completion and
//! prints each step as it happens. A failed query is reported and the
//! session moves on to the next one.

use std::io::{self, Write};
use std::sync::Arc;

use stepwise_agent::{AgentEvent, AgentLoop, QueryOutcome, Session};
use stepwise_config::AppConfig;
use stepwise_core::Error;
use stepwise_providers::build_from_config;
use stepwise_tools::default_registry;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Shown before each query.
pub const PROMPT: &str = "👉🏻 ";

pub async fn run(config: AppConfig, message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    if !config.has_api_key() {
        warn!(
            provider = %config.default_provider,
            "No API key configured; model calls will likely fail to authenticate"
        );
    }

    let router = build_from_config(&config)?;
    let provider = router.default().ok_or("No default provider configured")?;
    let tools = Arc::new(default_registry(&config.tools));
    let agent = AgentLoop::from_config(&config, provider, tools);
    let mut session = Session::new(config.agent.context_scope);

    info!(
        provider = %agent.provider_name(),
        model = %agent.model(),
        tools = ?agent.tools().names(),
        "Agent ready"
    );

    let mut stdout = io::stdout();

    if let Some(msg) = message {
        return match ask(&agent, &mut session, &msg, &mut stdout).await? {
            Ok(_) => Ok(()),
            Err(e) => Err(e.into()),
        };
    }

    let stdin = BufReader::new(tokio::io::stdin());
    drive(&agent, &mut session, stdin, &mut stdout).await?;
    Ok(())
}

/// The interactive read loop. Ends on `exit`, `quit` or end of input.
pub async fn drive<R, W>(agent: &AgentLoop, session: &mut Session, input: R, out: &mut W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        write!(out, "{PROMPT}")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if is_exit(query) {
            break;
        }

        if let Err(e) = ask(agent, session, query, out).await? {
            writeln!(out, "❌ Error: {e}")?;
        }
    }

    Ok(())
}

fn is_exit(line: &str) -> bool {
    matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q")
}

/// Run one query, rendering events while the loop works.
///
/// The outer `io::Result` is for writing to `out`; the inner result is
/// the query's own outcome.
async fn ask<W: Write>(
    agent: &AgentLoop,
    session: &mut Session,
    query: &str,
    out: &mut W,
) -> io::Result<Result<QueryOutcome, Error>> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let run = async move {
        let result = agent.run(session, query, Some(&tx)).await;
        drop(tx);
        result
    };

    let render_all = async {
        while let Some(event) = rx.recv().await {
            writeln!(out, "{}", render(&event))?;
            out.flush()?;
        }
        Ok::<(), io::Error>(())
    };

    let (result, rendered) = tokio::join!(run, render_all);
    rendered?;
    Ok(result)
}

/// One console line per event.
pub fn render(event: &AgentEvent) -> String {
    match event {
        AgentEvent::Start { content } => match content {
            Some(content) => format!("🔥 {content}"),
            None => "🔥".into(),
        },
        AgentEvent::Plan { content } => format!("🧠 {content}"),
        AgentEvent::ToolCall { name, input } => format!("🛠️: {name} ({input})"),
        AgentEvent::ToolResult {
            name,
            input,
            output,
        } => format!("🛠️: {name} ({input}) = {output}"),
        AgentEvent::RateLimited { wait_secs, .. } => {
            format!("⏳ Rate limit hit. Waiting {wait_secs} seconds...")
        }
        AgentEvent::Answer { content } => format!("🤖 {content}"),
        AgentEvent::MaxStepsReached { steps } => {
            format!("⚠️ Max steps reached ({steps}). Stopping.")
        }
    }
}
