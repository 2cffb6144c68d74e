//! Typed events parsed from the agent's stream-JSON stdout.
//!
//! The stream is newline-delimited JSON with occasional non-JSON
//! chatter mixed in. Anything that does not match a recognized shape
//! is dropped; the stream never fails because of an unknown tool or
//! event type.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    SessionStart,
    Text { content: String },
    ToolUse(ToolInvocation),
    ToolResult { stdout: String, stderr: String },
    SessionComplete,
}

/// A tool invocation with the fields common across tool shapes pulled
/// out for rendering, plus the raw input blob so sinks can format
/// tools we have never seen.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub description: Option<String>,
    pub command: Option<String>,
    pub file_path: Option<String>,
    pub pattern: Option<String>,
    pub query: Option<String>,
    pub url: Option<String>,
    pub input: Value,
}

impl ToolInvocation {
    fn from_raw(name: String, input: Value) -> Self {
        let field = |key: &str| {
            input
                .get(key)
                .and_then(Value::as_str)
                .map(ToString::to_string)
        };
        Self {
            description: field("description"),
            command: field("command"),
            file_path: field("file_path"),
            pattern: field("pattern"),
            query: field("query"),
            url: field("url"),
            name,
            input,
        }
    }
}

/// Parse one stdout line into zero or more events.
///
/// A single `assistant` line can carry several content elements, hence
/// the vec. Unparseable lines and unknown types yield nothing.
pub fn parse_event_line(line: &str) -> Vec<AgentEvent> {
    let json: Value = match serde_json::from_str(line.trim()) {
        Ok(json) => json,
        Err(_) => return Vec::new(),
    };
    let Some(event_type) = json.get("type").and_then(Value::as_str) else {
        return Vec::new();
    };
    match event_type {
        "system" if json.get("subtype").and_then(Value::as_str) == Some("init") => {
            vec![AgentEvent::SessionStart]
        }
        "assistant" => parse_assistant(&json),
        "user" => parse_tool_result(&json).into_iter().collect(),
        "result" => vec![AgentEvent::SessionComplete],
        _ => Vec::new(),
    }
}

fn parse_assistant(json: &Value) -> Vec<AgentEvent> {
    let Some(content) = json
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    content
        .iter()
        .filter_map(|element| {
            match element.get("type").and_then(Value::as_str) {
                Some("text") => element
                    .get("text")
                    .and_then(Value::as_str)
                    .map(|text| AgentEvent::Text {
                        content: text.to_string(),
                    }),
                Some("tool_use") => {
                    let name = element
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string();
                    let input = element.get("input").cloned().unwrap_or(Value::Null);
                    Some(AgentEvent::ToolUse(ToolInvocation::from_raw(name, input)))
                }
                _ => None,
            }
        })
        .collect()
}

fn parse_tool_result(json: &Value) -> Option<AgentEvent> {
    let result = json.get("tool_use_result")?;
    let field = |key: &str| {
        result
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Some(AgentEvent::ToolResult {
        stdout: field("stdout"),
        stderr: field("stderr"),
    })
}
