//! The event routing table.
//!
//! Each recognized GitHub event has one [`EventRoute`]: which payload
//! object identifies the record, how the key is built, and an ordered list
//! of status arms evaluated against the delivery's `action` and subject.
//! The first matching arm wins; otherwise the route's fallback applies.

use serde_json::{Map, Value, json};
use stateboard_core::CanonicalStatus;

/// A predicate over one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// `action` equals the given value.
    Action(&'static str),
    /// `action` matches and the subject's boolean `flag` equals `value`.
    /// A missing flag reads as `false`.
    ActionWithFlag {
        action: &'static str,
        flag: &'static str,
        value: bool,
    },
    /// The subject's string `field` equals `equals`.
    SubjectField {
        field: &'static str,
        equals: &'static str,
    },
}

impl Condition {
    pub fn matches(&self, action: Option<&str>, subject: &Value) -> bool {
        match *self {
            Condition::Action(expected) => action == Some(expected),
            Condition::ActionWithFlag {
                action: expected,
                flag,
                value,
            } => {
                action == Some(expected)
                    && subject.get(flag).and_then(Value::as_bool).unwrap_or(false) == value
            }
            Condition::SubjectField { field, equals } => {
                subject.get(field).and_then(Value::as_str) == Some(equals)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StatusArm {
    pub when: Condition,
    pub status: CanonicalStatus,
}

/// Display fields pulled from a delivery alongside the status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Details {
    pub name: Option<String>,
    pub github_ref: Option<String>,
    pub metadata: Map<String, Value>,
}

/// Builds [`Details`] from `(payload, subject)`.
pub type Describe = fn(&Value, &Value) -> Details;

#[derive(Clone, Copy)]
pub struct EventRoute {
    /// Value of the `X-GitHub-Event` header.
    pub event: &'static str,
    /// Top-level payload object describing the record.
    pub subject: &'static str,
    /// Field of the subject that identifies it.
    pub id_field: &'static str,
    pub entity_type: &'static str,
    pub id_prefix: &'static str,
    pub arms: &'static [StatusArm],
    pub fallback: CanonicalStatus,
    pub describe: Describe,
}

impl EventRoute {
    pub fn status_for(&self, action: Option<&str>, subject: &Value) -> CanonicalStatus {
        self.arms
            .iter()
            .find(|arm| arm.when.matches(action, subject))
            .map(|arm| arm.status)
            .unwrap_or(self.fallback)
    }
}

pub static ROUTES: &[EventRoute] = &[
    EventRoute {
        event: "issues",
        subject: "issue",
        id_field: "number",
        entity_type: "task",
        id_prefix: "issue-",
        arms: &[StatusArm {
            when: Condition::Action("closed"),
            status: CanonicalStatus::Done,
        }],
        fallback: CanonicalStatus::Todo,
        describe: describe_issue,
    },
    EventRoute {
        event: "pull_request",
        subject: "pull_request",
        id_field: "number",
        entity_type: "task",
        id_prefix: "pr-",
        arms: &[
            StatusArm {
                when: Condition::Action("opened"),
                status: CanonicalStatus::CodeReview,
            },
            StatusArm {
                when: Condition::Action("review_requested"),
                status: CanonicalStatus::CodeReview,
            },
            StatusArm {
                when: Condition::ActionWithFlag {
                    action: "closed",
                    flag: "merged",
                    value: true,
                },
                status: CanonicalStatus::Done,
            },
            StatusArm {
                when: Condition::ActionWithFlag {
                    action: "closed",
                    flag: "merged",
                    value: false,
                },
                status: CanonicalStatus::Backlog,
            },
        ],
        fallback: CanonicalStatus::InProgress,
        describe: describe_pull_request,
    },
    EventRoute {
        event: "deployment",
        subject: "deployment",
        id_field: "id",
        entity_type: "deployment",
        id_prefix: "deploy-",
        arms: &[StatusArm {
            when: Condition::SubjectField {
                field: "task",
                equals: "deploy",
            },
            status: CanonicalStatus::Staging,
        }],
        fallback: CanonicalStatus::Done,
        describe: describe_deployment,
    },
];

pub fn route_for(event: &str) -> Option<&'static EventRoute> {
    ROUTES.iter().find(|route| route.event == event)
}

fn str_field(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

fn login(value: &Value, field: &str) -> Value {
    value
        .get(field)
        .and_then(|user| user.get("login"))
        .cloned()
        .unwrap_or(Value::Null)
}

fn common_metadata(payload: &Value) -> Map<String, Value> {
    let mut metadata = Map::new();
    if let Some(action) = payload.get("action") {
        metadata.insert("action".into(), action.clone());
    }
    if let Some(repo) = payload.get("repository").and_then(|r| r.get("full_name")) {
        metadata.insert("repository".into(), repo.clone());
    }
    metadata
}

fn number_ref(subject: &Value) -> Option<String> {
    subject
        .get("number")
        .and_then(Value::as_u64)
        .map(|n| format!("#{n}"))
}

fn describe_issue(payload: &Value, issue: &Value) -> Details {
    let labels: Vec<Value> = issue
        .get("labels")
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|label| label.get("name").cloned())
                .collect()
        })
        .unwrap_or_default();

    let mut metadata = common_metadata(payload);
    metadata.insert("labels".into(), Value::Array(labels));
    metadata.insert("assignee".into(), login(issue, "assignee"));
    metadata.insert("url".into(), json!(str_field(issue, "html_url")));

    Details {
        name: str_field(issue, "title"),
        github_ref: number_ref(issue),
        metadata,
    }
}

fn describe_pull_request(payload: &Value, pr: &Value) -> Details {
    let flag = |field: &str| pr.get(field).and_then(Value::as_bool).unwrap_or(false);

    let mut metadata = common_metadata(payload);
    metadata.insert("draft".into(), Value::Bool(flag("draft")));
    metadata.insert("merged".into(), Value::Bool(flag("merged")));
    metadata.insert("author".into(), login(pr, "user"));
    metadata.insert("url".into(), json!(str_field(pr, "html_url")));

    Details {
        name: str_field(pr, "title"),
        github_ref: number_ref(pr),
        metadata,
    }
}

fn describe_deployment(payload: &Value, deployment: &Value) -> Details {
    let environment = str_field(deployment, "environment");

    let mut metadata = common_metadata(payload);
    metadata.insert("environment".into(), json!(environment));
    metadata.insert("ref".into(), json!(str_field(deployment, "ref")));
    metadata.insert("task".into(), json!(str_field(deployment, "task")));

    let name = str_field(deployment, "description")
        .filter(|d| !d.is_empty())
        .or_else(|| environment.map(|env| format!("deploy to {env}")));

    Details {
        name,
        github_ref: str_field(deployment, "sha"),
        metadata,
    }
}
