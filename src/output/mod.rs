//! Output sinks for agent activity and batch progress.
//!
//! A sink is a narrow capability set, deliberately TTY-free: the
//! console sink writes plain lines, the null sink swallows everything,
//! and the buffer sink accumulates formatted records for assertions in
//! tests. Nothing here is a singleton; callers inject whichever sink
//! fits.

use std::sync::{Arc, Mutex};

use crate::agent::events::ToolInvocation;
use crate::router::LifecycleStep;

pub trait OutputSink: Send + Sync {
    fn session_start(&self);
    fn session_end(&self);
    /// Assistant text from the agent stream.
    fn text(&self, content: &str);
    fn tool_use(&self, tool: &ToolInvocation);
    fn tool_result(&self, stdout: &str, stderr: &str);
    /// Raw agent stderr line, forwarded verbatim.
    fn agent_stderr(&self, line: &str);
    /// Announced before each lifecycle step. `step_index` is 0-based.
    fn progress(&self, step_index: usize, total_steps: usize, workflow: &str);
    /// A story was skipped because it is already complete.
    fn story_skipped(&self, story_key: &str);
    /// Planned steps for one story in dry-run mode.
    fn plan(&self, story_key: &str, steps: &[LifecycleStep]);
    /// End-of-batch summary.
    fn batch_summary(&self, completed: usize, skipped: usize);
}

/// Plain line-oriented console sink. Works the same on a TTY, a pipe,
/// or a CI log.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl OutputSink for ConsoleSink {
    fn session_start(&self) {
        println!("🚀 agent session started");
    }

    fn session_end(&self) {
        println!("🏁 agent session complete");
    }

    fn text(&self, content: &str) {
        println!("{content}");
    }

    fn tool_use(&self, tool: &ToolInvocation) {
        let detail = tool
            .command
            .as_deref()
            .or(tool.file_path.as_deref())
            .or(tool.pattern.as_deref())
            .or(tool.query.as_deref())
            .or(tool.url.as_deref())
            .or(tool.description.as_deref());
        match detail {
            Some(detail) => println!("🔧 {} {detail}", tool.name),
            None => println!("🔧 {}", tool.name),
        }
    }

    fn tool_result(&self, stdout: &str, stderr: &str) {
        if !stdout.trim().is_empty() {
            println!("{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            eprintln!("{}", stderr.trim_end());
        }
    }

    fn agent_stderr(&self, line: &str) {
        eprintln!("{line}");
    }

    fn progress(&self, step_index: usize, total_steps: usize, workflow: &str) {
        println!("🔄 [{}/{total_steps}] {workflow}", step_index + 1);
    }

    fn story_skipped(&self, story_key: &str) {
        println!("⏭️  {story_key} already complete");
    }

    fn plan(&self, story_key: &str, steps: &[LifecycleStep]) {
        let names: Vec<&str> = steps.iter().map(|s| s.workflow).collect();
        println!("📋 {story_key}: {}", names.join(" → "));
    }

    fn batch_summary(&self, completed: usize, skipped: usize) {
        println!("✅ {completed} completed, {skipped} skipped");
    }
}

/// Swallows everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn session_start(&self) {}
    fn session_end(&self) {}
    fn text(&self, _content: &str) {}
    fn tool_use(&self, _tool: &ToolInvocation) {}
    fn tool_result(&self, _stdout: &str, _stderr: &str) {}
    fn agent_stderr(&self, _line: &str) {}
    fn progress(&self, _step_index: usize, _total_steps: usize, _workflow: &str) {}
    fn story_skipped(&self, _story_key: &str) {}
    fn plan(&self, _story_key: &str, _steps: &[LifecycleStep]) {}
    fn batch_summary(&self, _completed: usize, _skipped: usize) {}
}

/// Accumulates one formatted record per call, for tests.
#[derive(Debug, Default)]
pub struct BufferSink {
    records: Arc<Mutex<Vec<String>>>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<String> {
        self.records.lock().unwrap().clone()
    }

    fn push(&self, record: String) {
        self.records.lock().unwrap().push(record);
    }
}

impl OutputSink for BufferSink {
    fn session_start(&self) {
        self.push("session_start".to_string());
    }

    fn session_end(&self) {
        self.push("session_end".to_string());
    }

    fn text(&self, content: &str) {
        self.push(format!("text: {content}"));
    }

    fn tool_use(&self, tool: &ToolInvocation) {
        self.push(format!("tool_use: {}", tool.name));
    }

    fn tool_result(&self, stdout: &str, stderr: &str) {
        self.push(format!("tool_result: {stdout}|{stderr}"));
    }

    fn agent_stderr(&self, line: &str) {
        self.push(format!("stderr: {line}"));
    }

    fn progress(&self, step_index: usize, total_steps: usize, workflow: &str) {
        self.push(format!("progress: {step_index}/{total_steps} {workflow}"));
    }

    fn story_skipped(&self, story_key: &str) {
        self.push(format!("skipped: {story_key}"));
    }

    fn plan(&self, story_key: &str, steps: &[LifecycleStep]) {
        let names: Vec<&str> = steps.iter().map(|s| s.workflow).collect();
        self.push(format!("plan: {story_key} {}", names.join(",")));
    }

    fn batch_summary(&self, completed: usize, skipped: usize) {
        self.push(format!("summary: {completed} completed, {skipped} skipped"));
    }
}
