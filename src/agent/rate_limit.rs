//! Rate-limit detection on the agent's stderr stream.
//!
//! The agent reports usage limits as human text, sometimes with a
//! clock time ("Your limit will reset at 1pm"). Detection is
//! per-line; a shared [`RateLimitState`] accumulates what the stderr
//! worker saw so the retry wrapper can decide how long to wait.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// Margin added on top of the reported reset time.
pub const RESET_GRACE: Duration = Duration::from_secs(30);
/// Fallback wait when a rate limit carries no reset time.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5 * 60);

const TRIGGERS: [&str; 3] = ["usage limit reached", "rate limit", "quota exceeded"];

// Accepts "3pm", "3 pm", "3:04pm", "3:04 pm", and "15:04".
static RESET_AT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)reset at\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?").expect("reset regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitCheck {
    pub is_rate_limit: bool,
    /// Best-effort reset time, resolved against today's local date.
    pub reset_time: Option<DateTime<Local>>,
    pub raw: String,
}

/// Classify one stderr line.
pub fn check_line(line: &str) -> RateLimitCheck {
    let lower = line.to_lowercase();
    let is_rate_limit = TRIGGERS.iter().any(|trigger| lower.contains(trigger));
    let reset_time = if is_rate_limit {
        parse_reset_time(line, Local::now())
    } else {
        None
    };
    RateLimitCheck {
        is_rate_limit,
        reset_time,
        raw: line.to_string(),
    }
}

fn parse_reset_time(line: &str, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let caps = RESET_AT.captures(line)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    match caps.get(3).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(meridiem) if meridiem == "pm" && hour < 12 => hour += 12,
        Some(meridiem) if meridiem == "am" && hour == 12 => hour = 0,
        _ => {}
    }
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    now.date_naive()
        .and_time(time)
        .and_local_timezone(Local)
        .earliest()
}

/// Wait to apply after a positive check: time until reset plus grace,
/// or the default when no reset time was parsed.
pub fn wait_after(check: &RateLimitCheck, now: DateTime<Local>) -> Duration {
    match check.reset_time {
        Some(reset) => (reset - now).to_std().unwrap_or(Duration::ZERO) + RESET_GRACE,
        None => DEFAULT_WAIT,
    }
}

#[derive(Debug, Clone, Default)]
struct StateInner {
    detected: bool,
    reset_time: Option<DateTime<Local>>,
    last_error: Option<String>,
}

/// Thread-safe record of the most recent rate-limit observation,
/// shared between the agent driver's stderr worker and the retry
/// wrapper.
#[derive(Debug, Default)]
pub struct RateLimitState {
    inner: Mutex<StateInner>,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the detector on a line and record a positive result.
    pub fn observe_line(&self, line: &str) -> RateLimitCheck {
        let check = check_line(line);
        if check.is_rate_limit {
            let mut inner = self.inner.lock().unwrap();
            inner.detected = true;
            if check.reset_time.is_some() {
                inner.reset_time = check.reset_time;
            }
            inner.last_error = Some(check.raw.clone());
        }
        check
    }

    pub fn detected(&self) -> bool {
        self.inner.lock().unwrap().detected
    }

    pub fn reset_time(&self) -> Option<DateTime<Local>> {
        self.inner.lock().unwrap().reset_time
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.lock().unwrap().last_error.clone()
    }

    pub fn clear(&self) {
        *self.inner.lock().unwrap() = StateInner::default();
    }

    /// Time until the recorded reset plus grace, while the reset is
    /// still in the future; zero otherwise.
    pub fn wait_time(&self) -> Duration {
        let reset = match self.inner.lock().unwrap().reset_time {
            Some(reset) => reset,
            None => return Duration::ZERO,
        };
        let now = Local::now();
        if reset > now {
            (reset - now).to_std().unwrap_or(Duration::ZERO) + RESET_GRACE
        } else {
            Duration::ZERO
        }
    }
}
