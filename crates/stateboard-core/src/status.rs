//! Canonical lifecycle statuses.
//!
//! Stored entities carry a free-form `status` string; these are the values
//! the webhook normalizer produces and the board columns expect.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed vocabulary, in board order (backlog → done).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Backlog,
    Triage,
    Todo,
    InProgress,
    CodeReview,
    Testing,
    Staging,
    Done,
}

impl CanonicalStatus {
    pub const ALL: [CanonicalStatus; 8] = [
        CanonicalStatus::Backlog,
        CanonicalStatus::Triage,
        CanonicalStatus::Todo,
        CanonicalStatus::InProgress,
        CanonicalStatus::CodeReview,
        CanonicalStatus::Testing,
        CanonicalStatus::Staging,
        CanonicalStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Backlog => "backlog",
            CanonicalStatus::Triage => "triage",
            CanonicalStatus::Todo => "todo",
            CanonicalStatus::InProgress => "in_progress",
            CanonicalStatus::CodeReview => "code_review",
            CanonicalStatus::Testing => "testing",
            CanonicalStatus::Staging => "staging",
            CanonicalStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
