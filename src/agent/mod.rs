//! Agent subprocess integration.
//!
//! The agent is an external CLI that takes a prompt and emits
//! newline-delimited JSON events on stdout; stderr carries free-form
//! human text. This module spawns it, parses the event stream, watches
//! stderr for rate-limit messages, and tears the process down cleanly.

pub mod driver;
pub mod events;
pub mod rate_limit;

pub use driver::{check_agent_available, AgentDriver, AgentRequest, EventHandler};
pub use events::{parse_event_line, AgentEvent, ToolInvocation};
pub use rate_limit::{check_line, wait_after, RateLimitCheck, RateLimitState};
