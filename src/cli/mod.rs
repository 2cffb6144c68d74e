//! CLI command dispatch.
//!
//! Thin composition layer: builds the component graph for the
//! requested command and runs it. All real behavior lives in the
//! library modules.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::agent::driver::{check_agent_available, AgentDriver};
use crate::agent::rate_limit::RateLimitState;
use crate::batch::{BatchDriver, Selection};
use crate::config::{Config, ConfigLoader};
use crate::error::{Error, Result};
use crate::lifecycle::{LifecycleExecutor, RetryOptions, RetryingExecutor};
use crate::output::{ConsoleSink, OutputSink};
use crate::resume::ResumeStateManager;
use crate::status::Status;
use crate::store::FileStatusStore;
use crate::workflow::{AgentWorkflowRunner, WorkflowRunner};

pub mod args;

pub use args::{Cli, Commands, RunFlags, SprintCommands};

pub async fn execute_command(command: Commands, root: &Path) -> Result<()> {
    let config = Arc::new(ConfigLoader::load(root).await?);
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(&cancel);

    match command {
        Commands::Story { keys, flags } => {
            run_batch(root, config, &cancel, Selection::Stories(keys), &flags).await
        }
        Commands::Epic { ids, flags } => {
            let selection = if ids.iter().any(|id| id == "all") {
                Selection::AllEpics
            } else {
                Selection::Epics(ids)
            };
            run_batch(root, config, &cancel, selection, &flags).await
        }
        Commands::Workflow { name, key } => {
            check_agent_available(&config.agent.binary).await?;
            let runner = build_runner(config);
            let exit_code = runner.run_workflow(&cancel, &name, &key).await?;
            if exit_code != 0 {
                return Err(Error::WorkflowFailed {
                    workflow: name,
                    story_key: key,
                    exit_code,
                });
            }
            Ok(())
        }
        Commands::Raw { prompt } => {
            check_agent_available(&config.agent.binary).await?;
            let runner = build_runner(config);
            let exit_code = runner.run_raw(&cancel, &prompt).await?;
            if exit_code != 0 {
                return Err(Error::AgentFailed { exit_code });
            }
            Ok(())
        }
        Commands::Sprint { command } => {
            let store = FileStatusStore::new(root, &config.paths.stories_dir);
            match command {
                SprintCommands::Rebuild => {
                    let report = store.rebuild_index().await?;
                    println!(
                        "🔄 sprint index rebuilt: {} entries, {} skipped",
                        report.entries, report.skipped
                    );
                    Ok(())
                }
                SprintCommands::Status => print_sprint_status(&store).await,
            }
        }
        Commands::Version => {
            println!("storyflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn cancel_on_ctrl_c(cancel: &CancellationToken) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            cancel.cancel();
        }
    });
}

fn build_runner(config: Arc<Config>) -> AgentWorkflowRunner {
    let sink: Arc<dyn OutputSink> = Arc::new(ConsoleSink::new());
    let driver = AgentDriver::new(
        config.agent.binary.clone(),
        Arc::new(RateLimitState::new()),
    );
    AgentWorkflowRunner::new(config, driver, sink)
}

async fn run_batch(
    root: &Path,
    config: Arc<Config>,
    cancel: &CancellationToken,
    selection: Selection,
    flags: &RunFlags,
) -> Result<()> {
    let store = Arc::new(FileStatusStore::new(root, &config.paths.stories_dir));
    let sink: Arc<dyn OutputSink> = Arc::new(ConsoleSink::new());
    let rate_limit = Arc::new(RateLimitState::new());
    let driver = AgentDriver::new(config.agent.binary.clone(), rate_limit.clone());
    let runner = Arc::new(AgentWorkflowRunner::new(config.clone(), driver, sink.clone()));
    let executor = Arc::new(LifecycleExecutor::new(store.clone(), store.clone(), runner));
    let retrying = RetryingExecutor::new(
        executor,
        rate_limit,
        RetryOptions {
            enabled: flags.auto_retry,
            max_retries: flags.max_retries,
            ..RetryOptions::default()
        },
    );
    let batch = BatchDriver::new(store, retrying, ResumeStateManager::new(root), sink);

    if flags.dry_run {
        batch.dry_run(selection).await?;
        return Ok(());
    }

    check_agent_available(&config.agent.binary).await?;
    batch.run(cancel, selection).await?;
    Ok(())
}

async fn print_sprint_status(store: &FileStatusStore) -> Result<()> {
    let statuses = store.scan_statuses().await?;
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (key, status) in &statuses {
        match status.as_deref() {
            Some(value) => {
                println!("{key}: {value}");
                if let Some(status) = Status::parse(value) {
                    *counts.entry(status.as_str()).or_default() += 1;
                }
            }
            None => println!("{key}: (no status line)"),
        }
    }
    let total = statuses.len();
    let summary: Vec<String> = counts
        .iter()
        .map(|(status, count)| format!("{count} {status}"))
        .collect();
    println!("📊 {total} stories: {}", summary.join(", "));
    Ok(())
}
