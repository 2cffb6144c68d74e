//! Pure routing from a story's status to its remaining lifecycle steps.
//!
//! Kept free of I/O so the lifecycle executor stays a plain loop and
//! the routing table is auditable at a glance.

use crate::status::Status;

pub const CREATE_STORY: &str = "create-story";
pub const DEV_STORY: &str = "dev-story";
pub const CODE_REVIEW: &str = "code-review";
pub const GIT_COMMIT: &str = "git-commit";

/// One lifecycle step: the workflow to run and the status the story
/// holds after the workflow exits with code 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleStep {
    pub workflow: &'static str,
    pub next_status: Status,
}

/// Routing outcome for a raw status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Next step for a non-terminal known status.
    Step(LifecycleStep),
    /// `done`: nothing left to run.
    Terminal,
    /// Any value outside the status enum. Callers treat this as fatal.
    Unknown(String),
}

/// Classify a raw status string and name its next workflow.
pub fn route_for(raw_status: &str) -> Route {
    match Status::parse(raw_status) {
        Some(Status::Done) => Route::Terminal,
        Some(status) => Route::Step(next_step(status)),
        None => Route::Unknown(raw_status.to_string()),
    }
}

fn next_step(status: Status) -> LifecycleStep {
    match status {
        Status::Backlog => LifecycleStep {
            workflow: CREATE_STORY,
            next_status: Status::ReadyForDev,
        },
        Status::ReadyForDev | Status::InProgress => LifecycleStep {
            workflow: DEV_STORY,
            next_status: Status::Review,
        },
        Status::Review => LifecycleStep {
            workflow: CODE_REVIEW,
            next_status: Status::Done,
        },
        // Terminal; route_for never asks for a step here.
        Status::Done => unreachable!("done has no next step"),
    }
}

/// Full remaining step sequence from `status` to `done`.
///
/// Ends with the `git-commit` step (a no-op status transition; the
/// commit itself is the side effect). Empty for `done`.
pub fn steps_from(status: Status) -> Vec<LifecycleStep> {
    let mut steps = Vec::new();
    let mut current = status;
    while current != Status::Done {
        let step = next_step(current);
        current = step.next_status;
        steps.push(step);
    }
    if !steps.is_empty() {
        steps.push(LifecycleStep {
            workflow: GIT_COMMIT,
            next_status: Status::Done,
        });
    }
    steps
}
