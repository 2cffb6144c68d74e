//! Configuration: the workflow catalog, the agent binary, and the
//! filesystem layout.
//!
//! Configuration is layered: built-in defaults, then an optional YAML
//! file, then environment overrides. See [`loader::ConfigLoader`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::router;

pub mod loader;

pub use loader::ConfigLoader;

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "STORYFLOW_CONFIG";
/// Environment variable overriding the agent binary path.
pub const AGENT_BIN_ENV: &str = "STORYFLOW_AGENT";

/// Default config file location relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".storyflow/config.yaml";

/// Placeholder substituted with the story key when rendering prompts.
pub const STORY_KEY_PLACEHOLDER: &str = "{story_key}";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[A-Za-z0-9_]+\}").expect("placeholder regex"));

/// Resolved configuration. Always complete: every field has a value
/// after loading, whether it came from defaults, file, or environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub agent: AgentConfig,
    /// Workflow catalog: name to prompt template and optional model.
    pub workflows: BTreeMap<String, WorkflowSpec>,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent binary invoked for every workflow.
    pub binary: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the story files, relative to the working
    /// directory.
    pub stories_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    /// Prompt template containing the `{story_key}` placeholder.
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent: AgentConfig {
                binary: "claude".to_string(),
            },
            workflows: default_catalog(),
            paths: PathsConfig {
                stories_dir: PathBuf::from("stories"),
            },
        }
    }
}

fn default_catalog() -> BTreeMap<String, WorkflowSpec> {
    let mut catalog = BTreeMap::new();
    for name in [
        router::CREATE_STORY,
        router::DEV_STORY,
        router::CODE_REVIEW,
        router::GIT_COMMIT,
    ] {
        catalog.insert(
            name.to_string(),
            WorkflowSpec {
                prompt: format!("/{name} {STORY_KEY_PLACEHOLDER}"),
                model: None,
            },
        );
    }
    catalog
}

impl Config {
    /// Look up a workflow by name.
    pub fn workflow(&self, name: &str) -> Result<&WorkflowSpec> {
        self.workflows
            .get(name)
            .ok_or_else(|| Error::WorkflowUnknown(name.to_string()))
    }

    /// Render a workflow's prompt template for a story key.
    ///
    /// Fails if any `{placeholder}` other than the story key remains
    /// after substitution.
    pub fn render_prompt(&self, workflow: &str, story_key: &str) -> Result<String> {
        let spec = self.workflow(workflow)?;
        let prompt = spec.prompt.replace(STORY_KEY_PLACEHOLDER, story_key);
        if let Some(leftover) = PLACEHOLDER.find(&prompt) {
            return Err(Error::TemplateExpansion {
                workflow: workflow.to_string(),
                placeholder: leftover.as_str().to_string(),
            });
        }
        Ok(prompt)
    }
}
