//! Story statuses and story-key helpers.
//!
//! A story key follows the `{epic}-{n}-{slug}` convention: the first
//! dash-separated segment is the epic id, the second is the story's
//! ordinal within that epic. Both parse as base-10 integers.

use std::fmt;

/// The closed set of story statuses. `Done` is terminal.
///
/// Values are parsed case-sensitively; anything outside the five
/// canonical strings is preserved by the store but rejected by the
/// router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    Backlog,
    ReadyForDev,
    InProgress,
    Review,
    Done,
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Backlog,
        Status::ReadyForDev,
        Status::InProgress,
        Status::Review,
        Status::Done,
    ];

    pub fn parse(value: &str) -> Option<Status> {
        match value {
            "backlog" => Some(Status::Backlog),
            "ready-for-dev" => Some(Status::ReadyForDev),
            "in-progress" => Some(Status::InProgress),
            "review" => Some(Status::Review),
            "done" => Some(Status::Done),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Backlog => "backlog",
            Status::ReadyForDev => "ready-for-dev",
            Status::InProgress => "in-progress",
            Status::Review => "review",
            Status::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Done)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Epic id of a story key: its first dash-separated segment.
pub fn epic_of(story_key: &str) -> Option<&str> {
    story_key.split('-').next().filter(|s| !s.is_empty())
}

/// Ordinal of a story within its epic: the second dash-separated
/// segment, when it parses as an integer.
pub fn story_ordinal(story_key: &str) -> Option<u32> {
    story_key.split('-').nth(1)?.parse().ok()
}

/// Whether `story_key` belongs to `epic_id`: first segment matches and
/// the second segment is a valid ordinal.
pub fn belongs_to_epic(story_key: &str, epic_id: &str) -> bool {
    epic_of(story_key) == Some(epic_id) && story_ordinal(story_key).is_some()
}
