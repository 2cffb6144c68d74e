//! Sequential batch execution over stories and epics.
//!
//! Stories run strictly in order; `done` stories are skipped with a
//! notice; the first real failure aborts the batch and leaves a resume
//! record behind. Dry-run mode only prints each story's planned step
//! sequence.

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::lifecycle::{RetryingExecutor, StepPlan};
use crate::output::OutputSink;
use crate::resume::{ResumeRecord, ResumeStateManager};
use crate::store::StatusReader;

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Explicit story keys, run in the given order.
    Stories(Vec<String>),
    /// Every story of each epic, epics in the given order.
    Epics(Vec<String>),
    /// Every story of every active epic.
    AllEpics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    /// Stories driven to `done` (or, in dry-run, stories with a plan).
    pub completed: usize,
    /// Stories that were already complete.
    pub skipped: usize,
}

pub struct BatchDriver {
    reader: Arc<dyn StatusReader>,
    retrying: RetryingExecutor,
    resume: ResumeStateManager,
    sink: Arc<dyn OutputSink>,
}

impl BatchDriver {
    pub fn new(
        reader: Arc<dyn StatusReader>,
        retrying: RetryingExecutor,
        resume: ResumeStateManager,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            reader,
            retrying,
            resume,
            sink,
        }
    }

    async fn resolve(&self, selection: Selection) -> Result<Vec<String>> {
        match selection {
            Selection::Stories(keys) => Ok(keys),
            Selection::Epics(ids) => {
                let mut stories = Vec::new();
                for epic_id in ids {
                    stories.extend(self.reader.epic_stories(&epic_id).await?);
                }
                Ok(stories)
            }
            Selection::AllEpics => {
                let mut stories = Vec::new();
                for epic_id in self.reader.all_epics().await? {
                    stories.extend(self.reader.epic_stories(&epic_id).await?);
                }
                Ok(stories)
            }
        }
    }

    /// Run every selected story to completion. First failure wins.
    pub async fn run(&self, cancel: &CancellationToken, selection: Selection) -> Result<BatchSummary> {
        let stories = self.resolve(selection).await?;
        if let Some(record) = self.resume.load().await? {
            info!(
                story_key = %record.story_key,
                step = record.step_index + 1,
                total = record.total_steps,
                "previous run left off mid-lifecycle; statuses pick up the remaining steps"
            );
        }

        let mut summary = BatchSummary::default();
        for story_key in &stories {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let start_status = self.reader.status(story_key).await?;

            // Track the last announced step so a failure can be
            // recorded for resume.
            let last_step: Arc<Mutex<(usize, usize)>> = Arc::default();
            {
                let last_step = last_step.clone();
                let sink = self.sink.clone();
                self.retrying.executor().set_progress_callback(Arc::new(
                    move |index, total, workflow| {
                        *last_step.lock().unwrap() = (index, total);
                        sink.progress(index, total, workflow);
                    },
                ));
            }

            match self.retrying.execute(cancel, story_key).await {
                Ok(()) => {
                    self.resume.clear().await?;
                    summary.completed += 1;
                }
                Err(Error::AlreadyComplete(_)) => {
                    self.sink.story_skipped(story_key);
                    summary.skipped += 1;
                }
                Err(err) => {
                    let (step_index, total_steps) = *last_step.lock().unwrap();
                    self.resume
                        .save(&ResumeRecord {
                            story_key: story_key.clone(),
                            step_index,
                            total_steps,
                            start_status,
                        })
                        .await?;
                    error!(%story_key, %err, "batch aborted");
                    return Err(err);
                }
            }
        }

        self.sink.batch_summary(summary.completed, summary.skipped);
        Ok(summary)
    }

    /// Print each story's planned step sequence without executing.
    pub async fn dry_run(&self, selection: Selection) -> Result<BatchSummary> {
        let stories = self.resolve(selection).await?;
        let mut summary = BatchSummary::default();
        for story_key in &stories {
            match self.retrying.executor().steps(story_key).await? {
                StepPlan::Terminal => {
                    self.sink.story_skipped(story_key);
                    summary.skipped += 1;
                }
                StepPlan::Steps(steps) => {
                    self.sink.plan(story_key, &steps);
                    summary.completed += 1;
                }
            }
        }
        self.sink.batch_summary(summary.completed, summary.skipped);
        Ok(summary)
    }
}
