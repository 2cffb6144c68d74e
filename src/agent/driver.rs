//! Agent subprocess driver.
//!
//! Spawns the agent binary with a rendered prompt, runs three workers
//! concurrently (the subprocess, a stdout parser feeding a bounded
//! event channel, a stderr reader feeding the rate-limit detector and
//! the handler), and returns the exit code only after every worker has
//! drained. Cancellation kills the subprocess and still drains.

use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::events::{parse_event_line, AgentEvent};
use super::rate_limit::RateLimitState;
use crate::error::{Error, Result};

/// Capacity of the channel between the stdout parser and the handler.
/// Bounded so a slow handler applies backpressure to the parser, never
/// to the subprocess pipes directly.
const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Receives parsed events and raw stderr lines during one agent run.
///
/// Events arrive in stdout order; all of them are delivered before
/// [`AgentDriver::run`] returns.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_event(&self, event: AgentEvent);
    async fn on_stderr_line(&self, line: &str);
}

#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub prompt: String,
    pub model: Option<String>,
}

impl AgentRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
        }
    }
}

pub struct AgentDriver {
    binary: String,
    rate_limit: Arc<RateLimitState>,
}

impl AgentDriver {
    pub fn new(binary: impl Into<String>, rate_limit: Arc<RateLimitState>) -> Self {
        Self {
            binary: binary.into(),
            rate_limit,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Run the agent to completion and return its exit code.
    ///
    /// Returns `Err(Error::Cancelled)` when the token fires first; the
    /// subprocess is killed and both stream workers are drained either
    /// way.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        request: &AgentRequest,
        handler: Arc<dyn EventHandler>,
    ) -> Result<i32> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("--dangerously-skip-permissions")
            .arg("--print")
            .arg(&request.prompt)
            .arg("--output-format")
            .arg("stream-json");
        if let Some(model) = &request.model {
            cmd.arg("--model").arg(model);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(binary = %self.binary, "spawning agent");
        let mut child = cmd.spawn().map_err(|source| Error::SpawnFailed {
            binary: self.binary.clone(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("agent stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Internal("agent stderr was not captured".to_string()))?;

        let (event_tx, mut event_rx) = mpsc::channel::<AgentEvent>(EVENT_CHANNEL_CAPACITY);

        let parser = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                for event in parse_event_line(&line) {
                    if event_tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
        });

        let event_handler = handler.clone();
        let dispatcher = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                event_handler.on_event(event).await;
            }
        });

        let rate_limit = self.rate_limit.clone();
        let stderr_handler = handler.clone();
        let stderr_worker = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let check = rate_limit.observe_line(&line);
                if check.is_rate_limit {
                    warn!(line = %check.raw, "agent reported a rate limit");
                }
                stderr_handler.on_stderr_line(&line).await;
            }
        });

        let mut cancelled = false;
        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                cancelled = true;
                debug!("cancellation requested, killing agent");
                let _ = child.start_kill();
                child.wait().await?
            }
        };

        // Every event must reach the handler before the exit code is
        // observable. The parser finishing drops the channel sender,
        // which lets the dispatcher drain to completion.
        for (name, task) in [
            ("stdout parser", parser),
            ("event dispatcher", dispatcher),
            ("stderr reader", stderr_worker),
        ] {
            if let Err(err) = task.await {
                return Err(Error::Internal(format!("agent {name} task failed: {err}")));
            }
        }

        if cancelled {
            return Err(Error::Cancelled);
        }

        Ok(exit_code_of(status))
    }
}

fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if status.success() {
        0
    } else {
        status.code().unwrap_or(1)
    }
}

/// Probe the agent binary with `--version`.
///
/// A missing or broken binary is reported up front instead of failing
/// on the first story.
pub async fn check_agent_available(binary: &str) -> Result<()> {
    let probe = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match probe {
        Ok(status) if status.success() => Ok(()),
        _ => Err(Error::AgentUnavailable {
            binary: binary.to_string(),
        }),
    }
}
