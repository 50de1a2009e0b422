//! stateboard-webhook: normalizes GitHub webhook deliveries.
//!
//! Maps issue, pull-request, and deployment events onto canonical entity
//! records through a static routing table. Anything else is acknowledged
//! without producing a record.
//!
//! # Mapping
//!
//! | Event | Key | Status |
//! |---|---|---|
//! | `issues` | `task:issue-<number>` | `done` when closed, else `todo` |
//! | `pull_request` | `task:pr-<number>` | opened/review_requested → `code_review`; closed+merged → `done`; closed → `backlog`; else `in_progress` |
//! | `deployment` | `deployment:deploy-<id>` | `staging` when task is `deploy`, else `done` |
//!
//! The normalizer is pure: persisting the record is the caller's job.

pub mod normalize;
pub mod routes;

pub use normalize::{NormalizedRecord, Outcome, normalize};
pub use routes::{Condition, EventRoute, ROUTES, StatusArm, route_for};
