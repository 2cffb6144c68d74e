//! Crash-safe persistence of where a lifecycle failed.
//!
//! The record is informational: resume itself falls out of the
//! per-step status writes. Callers decide when to save, load, and
//! clear; this module only provides the atomic primitive.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::Result;

/// Fixed filename inside the working directory.
pub const RESUME_STATE_FILE: &str = ".bmad-state.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub story_key: String,
    /// 0-based index of the step that failed.
    pub step_index: usize,
    pub total_steps: usize,
    /// Raw status the lifecycle started from.
    pub start_status: String,
}

pub struct ResumeStateManager {
    path: PathBuf,
}

impl ResumeStateManager {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(RESUME_STATE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the record atomically: temp file, then rename.
    pub async fn save(&self, record: &ResumeRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        let tmp = self.path.with_file_name(format!("{RESUME_STATE_FILE}.tmp"));
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Load the record; a missing file is `None`.
    pub async fn load(&self) -> Result<Option<ResumeRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Delete the record; a missing file is a no-op.
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }
}
