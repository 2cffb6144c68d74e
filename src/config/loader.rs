//! Configuration loading with defaults, file, and environment layering.
//!
//! Precedence, lowest to highest:
//! 1. Built-in defaults ([`Config::default`]).
//! 2. A YAML config file: the path named by `STORYFLOW_CONFIG` when
//!    set (missing file is then an error), otherwise
//!    `.storyflow/config.yaml` under the working directory when
//!    present.
//! 3. The `STORYFLOW_AGENT` environment variable for the agent binary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::fs;
use tracing::debug;

use super::{Config, WorkflowSpec, AGENT_BIN_ENV, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
use crate::error::{Error, Result};

/// Partial configuration as written in the file; every section is
/// optional and merged over the defaults.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    agent: Option<FileAgentConfig>,
    #[serde(default)]
    workflows: BTreeMap<String, WorkflowSpec>,
    #[serde(default)]
    paths: Option<FilePathsConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileAgentConfig {
    binary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FilePathsConfig {
    stories_dir: Option<PathBuf>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load the effective configuration for a working directory.
    pub async fn load(project_path: &Path) -> Result<Config> {
        let mut config = Config::default();

        match std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from) {
            Some(path) => {
                // An explicit path must exist.
                merge_file(&mut config, &path, true).await?;
            }
            None => {
                let default_path = project_path.join(DEFAULT_CONFIG_PATH);
                merge_file(&mut config, &default_path, false).await?;
            }
        }

        if let Some(binary) = std::env::var_os(AGENT_BIN_ENV) {
            let binary = binary.to_string_lossy().into_owned();
            if !binary.is_empty() {
                debug!(%binary, "agent binary overridden from environment");
                config.agent.binary = binary;
            }
        }

        Ok(config)
    }
}

async fn merge_file(config: &mut Config, path: &Path, required: bool) -> Result<()> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => return Ok(()),
        Err(err) => {
            return Err(Error::ConfigLoad {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })
        }
    };

    let file: FileConfig = serde_yaml::from_str(&content).map_err(|err| Error::ConfigLoad {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;

    debug!(path = %path.display(), "merging configuration file");

    if let Some(agent) = file.agent {
        if let Some(binary) = agent.binary {
            config.agent.binary = binary;
        }
    }
    if let Some(paths) = file.paths {
        if let Some(stories_dir) = paths.stories_dir {
            config.paths.stories_dir = stories_dir;
        }
    }
    // File entries override defaults per workflow name; unknown names
    // extend the catalog.
    for (name, spec) in file.workflows {
        config.workflows.insert(name, spec);
    }

    Ok(())
}
