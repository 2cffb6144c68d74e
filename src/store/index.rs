//! The sprint index: a cached YAML view of story statuses.
//!
//! Never read on the critical path for determining a story's status;
//! story files are. The index exists so other tooling can see sprint
//! state without parsing every story file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{Error, Result};

/// Index location relative to the working directory.
pub const SPRINT_STATUS_RELATIVE: &str = "_bmad-output/implementation-artifacts/sprint-status.yaml";

/// Outcome of a full index rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RebuildReport {
    /// Stories written to the index.
    pub entries: usize,
    /// Story files skipped: missing status line or a value outside the
    /// status enum.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintIndex {
    #[serde(default)]
    pub development_status: BTreeMap<String, String>,
}

impl SprintIndex {
    /// Load the index; a missing file is an empty index.
    pub async fn load_or_default(path: &Path) -> Result<SprintIndex> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SprintIndex::default())
            }
            Err(err) => return Err(err.into()),
        };
        serde_yaml::from_str(&content).map_err(|err| Error::MalformedIndex {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    /// Write the index atomically: temp file in the same directory,
    /// then rename over the target.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let yaml = serde_yaml::to_string(self).map_err(|err| Error::MalformedIndex {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let tmp = temp_sibling(path);
        fs::write(&tmp, yaml).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub fn set(&mut self, story_key: &str, status: &str) {
        self.development_status
            .insert(story_key.to_string(), status.to_string());
    }

    pub fn get(&self, story_key: &str) -> Option<&str> {
        self.development_status.get(story_key).map(String::as_str)
    }
}

pub(crate) fn temp_sibling(path: &Path) -> std::path::PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_an_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let index = SprintIndex::load_or_default(&dir.path().join("absent.yaml"))
            .await
            .unwrap();
        assert!(index.development_status.is_empty());
    }

    #[tokio::test]
    async fn save_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/sprint-status.yaml");

        let mut index = SprintIndex::default();
        index.set("6-1-setup", "backlog");
        index.set("6-2-auth", "ready-for-dev");
        index.save(&path).await.unwrap();

        let loaded = SprintIndex::load_or_default(&path).await.unwrap();
        assert_eq!(loaded, index);
        // No temp file left behind.
        assert!(!temp_sibling(&path).exists());
    }

    #[tokio::test]
    async fn yaml_shape_matches_the_wire_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sprint-status.yaml");
        let mut index = SprintIndex::default();
        index.set("6-1-setup", "done");
        index.save(&path).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(raw.contains("development_status:"));
        assert!(raw.contains("6-1-setup: done"));
    }

    #[tokio::test]
    async fn garbage_yaml_is_malformed_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sprint-status.yaml");
        tokio::fs::write(&path, "development_status: [oops").await.unwrap();
        let result = SprintIndex::load_or_default(&path).await;
        assert!(matches!(result, Err(Error::MalformedIndex { .. })));
    }
}
