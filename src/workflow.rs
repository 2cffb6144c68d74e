//! Workflow execution: prompt rendering plus one agent invocation.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agent::driver::{AgentDriver, AgentRequest, EventHandler};
use crate::agent::events::AgentEvent;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputSink;

/// Runs one named workflow (or a raw prompt) for a story and reports
/// the agent's exit code unchanged.
#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    async fn run_workflow(
        &self,
        cancel: &CancellationToken,
        workflow: &str,
        story_key: &str,
    ) -> Result<i32>;

    /// Bypass the catalog and send a prompt as-is.
    async fn run_raw(&self, cancel: &CancellationToken, prompt: &str) -> Result<i32>;
}

pub struct AgentWorkflowRunner {
    config: Arc<Config>,
    driver: AgentDriver,
    sink: Arc<dyn OutputSink>,
}

impl AgentWorkflowRunner {
    pub fn new(config: Arc<Config>, driver: AgentDriver, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            config,
            driver,
            sink,
        }
    }

    async fn run_request(&self, cancel: &CancellationToken, request: AgentRequest) -> Result<i32> {
        let handler = Arc::new(SinkEventHandler {
            sink: self.sink.clone(),
        });
        self.driver.run(cancel, &request, handler).await
    }
}

#[async_trait]
impl WorkflowRunner for AgentWorkflowRunner {
    async fn run_workflow(
        &self,
        cancel: &CancellationToken,
        workflow: &str,
        story_key: &str,
    ) -> Result<i32> {
        let spec = self.config.workflow(workflow)?;
        let prompt = self.config.render_prompt(workflow, story_key)?;
        info!(%workflow, %story_key, "invoking agent");
        self.run_request(
            cancel,
            AgentRequest {
                prompt,
                model: spec.model.clone(),
            },
        )
        .await
    }

    async fn run_raw(&self, cancel: &CancellationToken, prompt: &str) -> Result<i32> {
        info!("invoking agent with raw prompt");
        self.run_request(cancel, AgentRequest::new(prompt)).await
    }
}

/// Dispatches stream events to the output sink.
struct SinkEventHandler {
    sink: Arc<dyn OutputSink>,
}

#[async_trait]
impl EventHandler for SinkEventHandler {
    async fn on_event(&self, event: AgentEvent) {
        match event {
            AgentEvent::SessionStart => self.sink.session_start(),
            AgentEvent::Text { content } => self.sink.text(&content),
            AgentEvent::ToolUse(tool) => self.sink.tool_use(&tool),
            AgentEvent::ToolResult { stdout, stderr } => self.sink.tool_result(&stdout, &stderr),
            AgentEvent::SessionComplete => self.sink.session_end(),
        }
    }

    async fn on_stderr_line(&self, line: &str) {
        self.sink.agent_stderr(line);
    }
}
