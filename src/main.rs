//! storyflow CLI entry point.
//!
//! Thin composition layer: parse arguments, initialize logging, run
//! the command, map the error to a process exit code. An agent's
//! non-zero exit propagates as this process's exit code.

use std::path::PathBuf;

use clap::Parser;

use storyflow::cli::{execute_command, Cli};
use storyflow::error::Error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    storyflow::logging::init(cli.verbose);

    let root = cli.path.clone().unwrap_or_else(|| PathBuf::from("."));
    if let Err(err) = execute_command(cli.command, &root).await {
        eprintln!("❌ {err}");
        std::process::exit(exit_code_for(&err));
    }
}

fn exit_code_for(err: &Error) -> i32 {
    match err {
        Error::WorkflowFailed { exit_code, .. } | Error::AgentFailed { exit_code }
            if *exit_code > 0 =>
        {
            *exit_code
        }
        _ => 1,
    }
}
