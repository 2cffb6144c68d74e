//! Authoritative story status storage.
//!
//! Story files are the source of truth; the sprint index is a cached,
//! rebuildable view. Reads and single-story updates go through the
//! [`StatusReader`] and [`StatusWriter`] capability traits so the
//! lifecycle executor can be tested against in-memory doubles.

use async_trait::async_trait;

use crate::error::Result;
use crate::status::Status;

mod file;
mod index;

pub use file::FileStatusStore;
pub use index::{RebuildReport, SprintIndex, SPRINT_STATUS_RELATIVE};

#[async_trait]
pub trait StatusReader: Send + Sync {
    /// Raw status string from the story file.
    ///
    /// Values outside the status enum are returned verbatim so the
    /// router can classify them as unknown and fail cleanly.
    async fn status(&self, story_key: &str) -> Result<String>;

    /// Story keys belonging to an epic, ordered by story ordinal
    /// ascending.
    async fn epic_stories(&self, epic_id: &str) -> Result<Vec<String>>;

    /// All epic ids with at least one story, ordered numerically
    /// ascending.
    async fn all_epics(&self) -> Result<Vec<String>>;
}

#[async_trait]
pub trait StatusWriter: Send + Sync {
    /// Atomically rewrite the story file's status line, then refresh
    /// the cached index entry.
    async fn update(&self, story_key: &str, status: Status) -> Result<()>;
}
