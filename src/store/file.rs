//! File-backed status store.
//!
//! Each story is a text file `<stories_dir>/<story_key>.md` whose
//! status line (`Status: <value>`) is authoritative. Updates rewrite
//! the file through a sibling temp file and a rename, then refresh the
//! sprint index the same way, so observers only ever see a fully old
//! or fully new file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::index::{temp_sibling, RebuildReport, SprintIndex, SPRINT_STATUS_RELATIVE};
use super::{StatusReader, StatusWriter};
use crate::error::{Error, Result};
use crate::status::{self, Status};

pub struct FileStatusStore {
    stories_dir: PathBuf,
    index_path: PathBuf,
}

impl FileStatusStore {
    /// `root` is the working directory; `stories_dir` is resolved
    /// against it, and the sprint index lives at its fixed location
    /// under `root`.
    pub fn new(root: &Path, stories_dir: &Path) -> Self {
        Self {
            stories_dir: root.join(stories_dir),
            index_path: root.join(SPRINT_STATUS_RELATIVE),
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn story_path(&self, story_key: &str) -> PathBuf {
        self.stories_dir.join(format!("{story_key}.md"))
    }

    async fn read_story(&self, story_key: &str) -> Result<String> {
        match fs::read_to_string(self.story_path(story_key)).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::StoryNotFound(story_key.to_string()))
            }
            Err(err) => Err(Error::StatusFileUnreadable {
                story_key: story_key.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    /// Story keys found on disk, in directory order. Callers sort.
    fn scan_story_keys(&self) -> Vec<String> {
        WalkDir::new(&self.stories_dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "md"))
            .filter_map(|entry| {
                entry
                    .path()
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .collect()
    }

    /// Story keys and raw statuses sorted by key, for the read-only
    /// sprint status view. Stories without a status line come back as
    /// `None`.
    pub async fn scan_statuses(&self) -> Result<Vec<(String, Option<String>)>> {
        let mut keys = self.scan_story_keys();
        keys.sort();
        let mut statuses = Vec::with_capacity(keys.len());
        for key in keys {
            let status = match self.read_story(&key).await {
                Ok(content) => extract_status(&content),
                Err(_) => None,
            };
            statuses.push((key, status));
        }
        Ok(statuses)
    }

    /// Rebuild the sprint index by scanning every story file. Files
    /// without a parseable status line or with a value outside the
    /// status enum are skipped and counted.
    pub async fn rebuild_index(&self) -> Result<RebuildReport> {
        let mut index = SprintIndex::default();
        let mut report = RebuildReport::default();

        let mut keys = self.scan_story_keys();
        keys.sort();
        for story_key in keys {
            let raw = match self.read_story(&story_key).await {
                Ok(content) => extract_status(&content),
                Err(err) => {
                    warn!(%story_key, %err, "skipping unreadable story file");
                    report.skipped += 1;
                    continue;
                }
            };
            match raw.as_deref().and_then(Status::parse) {
                Some(status) => {
                    index.set(&story_key, status.as_str());
                    report.entries += 1;
                }
                None => {
                    warn!(%story_key, status = ?raw, "skipping story with invalid status");
                    report.skipped += 1;
                }
            }
        }

        index.save(&self.index_path).await?;
        debug!(entries = report.entries, skipped = report.skipped, "sprint index rebuilt");
        Ok(report)
    }
}

#[async_trait]
impl StatusReader for FileStatusStore {
    async fn status(&self, story_key: &str) -> Result<String> {
        let content = self.read_story(story_key).await?;
        extract_status(&content).ok_or_else(|| Error::MissingStatusLine(story_key.to_string()))
    }

    async fn epic_stories(&self, epic_id: &str) -> Result<Vec<String>> {
        let mut stories: Vec<String> = self
            .scan_story_keys()
            .into_iter()
            .filter(|key| status::belongs_to_epic(key, epic_id))
            .collect();
        if stories.is_empty() {
            return Err(Error::NoStoriesInEpic(epic_id.to_string()));
        }
        stories.sort_by_key(|key| (status::story_ordinal(key), key.clone()));
        Ok(stories)
    }

    async fn all_epics(&self) -> Result<Vec<String>> {
        let mut epics: Vec<u64> = self
            .scan_story_keys()
            .iter()
            .filter(|key| status::story_ordinal(key).is_some())
            .filter_map(|key| status::epic_of(key)?.parse().ok())
            .collect();
        epics.sort_unstable();
        epics.dedup();
        Ok(epics.into_iter().map(|epic| epic.to_string()).collect())
    }
}

#[async_trait]
impl StatusWriter for FileStatusStore {
    async fn update(&self, story_key: &str, status: Status) -> Result<()> {
        let path = self.story_path(story_key);
        let content = self.read_story(story_key).await?;
        let updated = replace_status(&content, status.as_str())
            .ok_or_else(|| Error::MissingStatusLine(story_key.to_string()))?;

        let tmp = temp_sibling(&path);
        fs::write(&tmp, updated).await?;
        fs::rename(&tmp, &path).await?;
        debug!(%story_key, status = %status, "story status updated");

        let mut index = SprintIndex::load_or_default(&self.index_path).await?;
        index.set(story_key, status.as_str());
        index.save(&self.index_path).await
    }
}

/// Value of the first line whose trimmed, lowercased form starts with
/// `status:`, with surrounding whitespace removed.
fn extract_status(content: &str) -> Option<String> {
    content
        .lines()
        .find(|line| is_status_line(line))
        .and_then(|line| line.split_once(':'))
        .map(|(_, value)| value.trim().to_string())
}

fn is_status_line(line: &str) -> bool {
    line.trim().to_lowercase().starts_with("status:")
}

/// Replace the value after the colon on the first status line,
/// preserving everything before the colon (indentation and key case
/// included) and the rest of the file byte for byte.
fn replace_status(content: &str, new_status: &str) -> Option<String> {
    let mut replaced = false;
    let lines: Vec<String> = content
        .split('\n')
        .map(|line| {
            if replaced || !is_status_line(line) {
                return line.to_string();
            }
            match line.split_once(':') {
                Some((before, _)) => {
                    replaced = true;
                    let cr = if line.ends_with('\r') { "\r" } else { "" };
                    format!("{before}: {new_status}{cr}")
                }
                None => line.to_string(),
            }
        })
        .collect();
    replaced.then(|| lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> FileStatusStore {
        FileStatusStore::new(dir, Path::new("stories"))
    }

    async fn write_story(dir: &Path, key: &str, content: &str) {
        let path = dir.join("stories").join(format!("{key}.md"));
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, content).await.unwrap();
    }

    #[test]
    fn extracts_first_status_line_case_insensitively() {
        assert_eq!(extract_status("Status: backlog\n"), Some("backlog".into()));
        assert_eq!(extract_status("  STATUS:   review\n"), Some("review".into()));
        assert_eq!(
            extract_status("# Title\n\nstatus: done\nStatus: backlog\n"),
            Some("done".into())
        );
        assert_eq!(extract_status("# No status here\n"), None);
    }

    #[test]
    fn replace_preserves_surrounding_content() {
        let original = "# Story 6-1\n\n  Status:  backlog\n\nNotes after.\n";
        let updated = replace_status(original, "review").unwrap();
        assert_eq!(updated, "# Story 6-1\n\n  Status: review\n\nNotes after.\n");
    }

    #[test]
    fn replace_touches_only_the_first_status_line() {
        let original = "status: backlog\nstatus: backlog\n";
        let updated = replace_status(original, "done").unwrap();
        assert_eq!(updated, "status: done\nstatus: backlog\n");
    }

    #[test]
    fn replace_fails_without_a_status_line() {
        assert_eq!(replace_status("no such line\n", "done"), None);
    }

    #[tokio::test]
    async fn status_reads_the_story_file() {
        let dir = tempfile::tempdir().unwrap();
        write_story(dir.path(), "6-1-setup", "Status: backlog\n").await;
        let store = store(dir.path());
        assert_eq!(store.status("6-1-setup").await.unwrap(), "backlog");
    }

    #[tokio::test]
    async fn invalid_status_is_returned_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        write_story(dir.path(), "6-1-setup", "Status: Blocked On Review\n").await;
        let store = store(dir.path());
        assert_eq!(store.status("6-1-setup").await.unwrap(), "Blocked On Review");
    }

    #[tokio::test]
    async fn missing_story_is_story_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(matches!(
            store.status("9-9-ghost").await,
            Err(Error::StoryNotFound(key)) if key == "9-9-ghost"
        ));
    }

    #[tokio::test]
    async fn missing_status_line_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_story(dir.path(), "6-1-setup", "# Just a title\n").await;
        let store = store(dir.path());
        assert!(matches!(
            store.status("6-1-setup").await,
            Err(Error::MissingStatusLine(_))
        ));
    }

    #[tokio::test]
    async fn update_mirrors_into_the_index() {
        let dir = tempfile::tempdir().unwrap();
        write_story(dir.path(), "6-1-setup", "# Story\nStatus: backlog\nBody.\n").await;
        let store = store(dir.path());

        store.update("6-1-setup", Status::ReadyForDev).await.unwrap();

        assert_eq!(store.status("6-1-setup").await.unwrap(), "ready-for-dev");
        let content = fs::read_to_string(store.story_path("6-1-setup")).await.unwrap();
        assert_eq!(content, "# Story\nStatus: ready-for-dev\nBody.\n");

        let index = SprintIndex::load_or_default(store.index_path()).await.unwrap();
        assert_eq!(index.get("6-1-setup"), Some("ready-for-dev"));
    }

    #[tokio::test]
    async fn update_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        write_story(dir.path(), "6-1-setup", "Status: backlog\n").await;
        let store = store(dir.path());
        store.update("6-1-setup", Status::Done).await.unwrap();

        let stray: Vec<_> = WalkDir::new(dir.path())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(stray.is_empty());
    }

    #[tokio::test]
    async fn epic_stories_are_numerically_ordered() {
        let dir = tempfile::tempdir().unwrap();
        for key in ["3-1-a", "3-10-j", "3-2-b", "4-1-x", "3-note"] {
            write_story(dir.path(), key, "Status: backlog\n").await;
        }
        let store = store(dir.path());

        let stories = store.epic_stories("3").await.unwrap();
        assert_eq!(stories, vec!["3-1-a", "3-2-b", "3-10-j"]);
    }

    #[tokio::test]
    async fn empty_epic_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_story(dir.path(), "3-1-a", "Status: backlog\n").await;
        let store = store(dir.path());
        assert!(matches!(
            store.epic_stories("7").await,
            Err(Error::NoStoriesInEpic(id)) if id == "7"
        ));
    }

    #[tokio::test]
    async fn all_epics_are_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for key in ["10-1-a", "2-1-b", "2-2-c", "3-1-d"] {
            write_story(dir.path(), key, "Status: backlog\n").await;
        }
        let store = store(dir.path());
        assert_eq!(store.all_epics().await.unwrap(), vec!["2", "3", "10"]);
    }

    #[tokio::test]
    async fn rebuild_skips_invalid_statuses() {
        let dir = tempfile::tempdir().unwrap();
        write_story(dir.path(), "1-1-a", "Status: review\n").await;
        write_story(dir.path(), "1-2-b", "Status: in-progress\n").await;
        write_story(dir.path(), "1-3-c", "Status: garbage\n").await;
        let store = store(dir.path());

        let report = store.rebuild_index().await.unwrap();
        assert_eq!(report, RebuildReport { entries: 2, skipped: 1 });

        let index = SprintIndex::load_or_default(store.index_path()).await.unwrap();
        assert_eq!(index.get("1-1-a"), Some("review"));
        assert_eq!(index.get("1-2-b"), Some("in-progress"));
        assert_eq!(index.get("1-3-c"), None);
    }
}
