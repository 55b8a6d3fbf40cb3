//! Command capability: run a shell command on the host.
//!
//! The child inherits the terminal, so the user sees its output directly.
//! Only the exit status makes it back into the conversation. There is no
//! allowlist and no sandbox.

use std::process::Stdio;

use async_trait::async_trait;
use stepwise_core::error::ToolError;
use stepwise_core::tool::Capability;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct CommandCapability;

impl CommandCapability {
    pub fn new() -> Self {
        Self
    }

    fn shell(command: &str) -> Command {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        } else {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }
}

#[async_trait]
impl Capability for CommandCapability {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Takes a shell command as input, executes it on the user's machine and returns its exit status."
    }

    fn signature(&self) -> String {
        "run_command(cmd: str)".into()
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        debug!(command = %input, "Executing shell command");

        let status = Self::shell(input)
            .status()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: self.name().into(),
                reason: e.to_string(),
            })?;

        // No code means the child was killed by a signal.
        let code = status.code().unwrap_or(-1);
        if code != 0 {
            warn!(command = %input, exit_code = code, "Command exited with non-zero status");
        }

        Ok(code.to_string())
    }
}
