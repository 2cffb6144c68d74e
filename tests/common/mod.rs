//! Shared fixtures for the integration tests.
//!
//! Each test gets a temp working directory with a stories tree and a
//! stub agent shell script. The stub speaks just enough stream-JSON to
//! exercise the pipeline, appends every received prompt to a log file,
//! and fails (exit 1) whenever the prompt contains a configured
//! pattern.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

pub struct Workspace {
    pub dir: TempDir,
    pub agent: PathBuf,
    prompt_log: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_failures(&[])
    }

    /// `fail_patterns`: prompts containing any of these substrings make
    /// the stub agent exit 1.
    pub fn with_failures(fail_patterns: &[&str]) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let prompt_log = dir.path().join("prompts.log");
        let agent = dir.path().join("stub-agent.sh");

        let fail_case = fail_patterns
            .iter()
            .map(|pattern| format!("  *{pattern}*) exit 1 ;;\n"))
            .collect::<String>();
        let script = format!(
            r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "stub-agent 0.0.0"
  exit 0
fi
prompt="$3"
echo "$prompt" >> "{log}"
echo '{{"type":"system","subtype":"init"}}'
echo '{{"type":"assistant","message":{{"content":[{{"type":"text","text":"working"}}]}}}}'
echo '{{"type":"result"}}'
case "$prompt" in
{fail_case}  *) : ;;
esac
exit 0
"#,
            log = prompt_log.display(),
        );
        std::fs::write(&agent, script).expect("write stub agent");
        let mut perms = std::fs::metadata(&agent).expect("stat stub agent").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&agent, perms).expect("chmod stub agent");

        Self {
            dir,
            agent,
            prompt_log,
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn add_story(&self, key: &str, status: &str) {
        let stories = self.root().join("stories");
        std::fs::create_dir_all(&stories).expect("create stories dir");
        std::fs::write(
            stories.join(format!("{key}.md")),
            format!("# Story {key}\n\nStatus: {status}\n\nAcceptance criteria go here.\n"),
        )
        .expect("write story");
    }

    pub fn story_status(&self, key: &str) -> String {
        let content = std::fs::read_to_string(self.root().join("stories").join(format!("{key}.md")))
            .expect("read story");
        content
            .lines()
            .find(|line| line.trim().to_lowercase().starts_with("status:"))
            .and_then(|line| line.split_once(':'))
            .map(|(_, value)| value.trim().to_string())
            .expect("status line")
    }

    /// Prompts received by the stub agent, one per invocation, in order.
    pub fn prompts(&self) -> Vec<String> {
        match std::fs::read_to_string(&self.prompt_log) {
            Ok(content) => content.lines().map(str::to_string).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn index_yaml(&self) -> String {
        std::fs::read_to_string(
            self.root()
                .join("_bmad-output/implementation-artifacts/sprint-status.yaml"),
        )
        .unwrap_or_default()
    }

    pub fn resume_record(&self) -> Option<serde_json::Value> {
        let content = std::fs::read_to_string(self.root().join(".bmad-state.json")).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// A storyflow command running in this workspace against the stub
    /// agent.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("storyflow").expect("binary");
        cmd.current_dir(self.root())
            .env("STORYFLOW_AGENT", &self.agent)
            .env_remove("STORYFLOW_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }
}
