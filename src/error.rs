use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration file {} could not be loaded: {reason}", .path.display())]
    ConfigLoad { path: PathBuf, reason: String },

    #[error("Story not found: {0}")]
    StoryNotFound(String),

    #[error("Story file for {story_key} is unreadable: {reason}")]
    StatusFileUnreadable { story_key: String, reason: String },

    #[error("No status line in story file for {0}")]
    MissingStatusLine(String),

    #[error("Sprint index at {} is malformed: {reason}", .path.display())]
    MalformedIndex { path: PathBuf, reason: String },

    #[error("Unknown status '{status}' for story {story_key}")]
    UnknownStatus { story_key: String, status: String },

    #[error("No stories found in epic {0}")]
    NoStoriesInEpic(String),

    #[error("Unknown workflow: {0}")]
    WorkflowUnknown(String),

    #[error("Unresolved placeholder '{placeholder}' in prompt template for workflow {workflow}")]
    TemplateExpansion {
        workflow: String,
        placeholder: String,
    },

    #[error("Failed to spawn agent binary '{binary}': {source}")]
    SpawnFailed {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Agent binary '{binary}' is not available. Install the agent CLI, \
         authenticate it, and make sure it is on your PATH (or point the \
         STORYFLOW_AGENT environment variable at it)."
    )]
    AgentUnavailable { binary: String },

    #[error("Story {0} is already complete")]
    AlreadyComplete(String),

    #[error("Agent rate limit hit: {0}")]
    RateLimited(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Workflow {workflow} failed for story {story_key} with exit code {exit_code}")]
    WorkflowFailed {
        workflow: String,
        story_key: String,
        exit_code: i32,
    },

    #[error("Agent exited with code {exit_code}")]
    AgentFailed { exit_code: i32 },

    #[error("Giving up on story {story_key} after {attempts} retries: {reason}")]
    RetriesExhausted {
        story_key: String,
        attempts: u32,
        reason: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
