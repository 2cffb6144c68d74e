//! Story lifecycle execution.
//!
//! The executor derives the remaining step sequence from the story's
//! current status and drives it with fail-fast semantics: each
//! successful step advances the persisted status, the first failure
//! stops everything with the status left at the last successful
//! transition. That per-step write is what makes resume free: running
//! again recomputes exactly the remaining work.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{Error, Result};
use crate::router::{steps_from, LifecycleStep};
use crate::status::Status;
use crate::store::{StatusReader, StatusWriter};
use crate::workflow::WorkflowRunner;

pub mod retry;

pub use retry::{RetryOptions, RetryingExecutor};

/// `(step_index, total_steps, workflow_name)`, invoked before each step.
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Remaining work for one story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepPlan {
    /// Story is already `done`; callers treat this as complete.
    Terminal,
    Steps(Vec<LifecycleStep>),
}

pub struct LifecycleExecutor {
    reader: Arc<dyn StatusReader>,
    writer: Arc<dyn StatusWriter>,
    runner: Arc<dyn WorkflowRunner>,
    progress: Mutex<Option<ProgressCallback>>,
}

impl LifecycleExecutor {
    pub fn new(
        reader: Arc<dyn StatusReader>,
        writer: Arc<dyn StatusWriter>,
        runner: Arc<dyn WorkflowRunner>,
    ) -> Self {
        Self {
            reader,
            writer,
            runner,
            progress: Mutex::new(None),
        }
    }

    pub fn set_progress_callback(&self, callback: ProgressCallback) {
        *self.progress.lock().unwrap() = Some(callback);
    }

    /// Remaining steps for a story, from its persisted status.
    pub async fn steps(&self, story_key: &str) -> Result<StepPlan> {
        let raw = self.reader.status(story_key).await?;
        match Status::parse(&raw) {
            Some(Status::Done) => Ok(StepPlan::Terminal),
            Some(status) => Ok(StepPlan::Steps(steps_from(status))),
            None => Err(Error::UnknownStatus {
                story_key: story_key.to_string(),
                status: raw,
            }),
        }
    }

    /// Drive a story from its current status to `done`.
    ///
    /// Returns `Err(Error::AlreadyComplete)` for `done` stories so
    /// batch callers can skip without treating it as a failure.
    pub async fn execute(&self, cancel: &CancellationToken, story_key: &str) -> Result<()> {
        let steps = match self.steps(story_key).await? {
            StepPlan::Terminal => return Err(Error::AlreadyComplete(story_key.to_string())),
            StepPlan::Steps(steps) => steps,
        };

        let total = steps.len();
        for (index, step) in steps.iter().enumerate() {
            let callback = self.progress.lock().unwrap().clone();
            if let Some(callback) = callback {
                callback(index, total, step.workflow);
            }
            info!(
                %story_key,
                workflow = step.workflow,
                step = index + 1,
                total,
                "running lifecycle step"
            );

            let exit_code = self
                .runner
                .run_workflow(cancel, step.workflow, story_key)
                .await?;
            if exit_code != 0 {
                return Err(Error::WorkflowFailed {
                    workflow: step.workflow.to_string(),
                    story_key: story_key.to_string(),
                    exit_code,
                });
            }

            self.writer.update(story_key, step.next_status).await?;
        }

        info!(%story_key, "story complete");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, VecDeque};

    /// In-memory status store double.
    #[derive(Debug, Default)]
    pub struct InMemoryStore {
        statuses: Mutex<BTreeMap<String, String>>,
    }

    impl InMemoryStore {
        pub fn with(entries: &[(&str, &str)]) -> Arc<Self> {
            let store = Self::default();
            {
                let mut statuses = store.statuses.lock().unwrap();
                for (key, status) in entries {
                    statuses.insert(key.to_string(), status.to_string());
                }
            }
            Arc::new(store)
        }

        pub fn status_of(&self, story_key: &str) -> Option<String> {
            self.statuses.lock().unwrap().get(story_key).cloned()
        }
    }

    #[async_trait]
    impl StatusReader for InMemoryStore {
        async fn status(&self, story_key: &str) -> Result<String> {
            self.status_of(story_key)
                .ok_or_else(|| Error::StoryNotFound(story_key.to_string()))
        }

        async fn epic_stories(&self, epic_id: &str) -> Result<Vec<String>> {
            let mut stories: Vec<String> = self
                .statuses
                .lock()
                .unwrap()
                .keys()
                .filter(|key| crate::status::belongs_to_epic(key, epic_id))
                .cloned()
                .collect();
            if stories.is_empty() {
                return Err(Error::NoStoriesInEpic(epic_id.to_string()));
            }
            stories.sort_by_key(|key| (crate::status::story_ordinal(key), key.clone()));
            Ok(stories)
        }

        async fn all_epics(&self) -> Result<Vec<String>> {
            let mut epics: Vec<u64> = self
                .statuses
                .lock()
                .unwrap()
                .keys()
                .filter(|key| crate::status::story_ordinal(key).is_some())
                .filter_map(|key| crate::status::epic_of(key)?.parse().ok())
                .collect();
            epics.sort_unstable();
            epics.dedup();
            Ok(epics.into_iter().map(|epic| epic.to_string()).collect())
        }
    }

    #[async_trait]
    impl StatusWriter for InMemoryStore {
        async fn update(&self, story_key: &str, status: Status) -> Result<()> {
            self.statuses
                .lock()
                .unwrap()
                .insert(story_key.to_string(), status.as_str().to_string());
            Ok(())
        }
    }

    /// Workflow runner double: records invocations and pops scripted
    /// exit codes (0 once the script runs dry).
    #[derive(Debug, Default)]
    pub struct ScriptedRunner {
        exit_codes: Mutex<VecDeque<i32>>,
        invocations: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedRunner {
        pub fn succeeding() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn with_exit_codes(codes: &[i32]) -> Arc<Self> {
            let runner = Self::default();
            runner.exit_codes.lock().unwrap().extend(codes.iter().copied());
            Arc::new(runner)
        }

        pub fn invocations(&self) -> Vec<(String, String)> {
            self.invocations.lock().unwrap().clone()
        }

        pub fn invoked_workflows(&self) -> Vec<String> {
            self.invocations()
                .into_iter()
                .map(|(workflow, _)| workflow)
                .collect()
        }
    }

    #[async_trait]
    impl WorkflowRunner for ScriptedRunner {
        async fn run_workflow(
            &self,
            _cancel: &CancellationToken,
            workflow: &str,
            story_key: &str,
        ) -> Result<i32> {
            self.invocations
                .lock()
                .unwrap()
                .push((workflow.to_string(), story_key.to_string()));
            Ok(self.exit_codes.lock().unwrap().pop_front().unwrap_or(0))
        }

        async fn run_raw(&self, _cancel: &CancellationToken, _prompt: &str) -> Result<i32> {
            Ok(self.exit_codes.lock().unwrap().pop_front().unwrap_or(0))
        }
    }
}
