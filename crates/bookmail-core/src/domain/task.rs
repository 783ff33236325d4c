//! Task names and the envelope the queue stores for each submission.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TaskId;

/// Task name, `{family}.{subject}.{action}.v{major}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskType(String);

impl TaskType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading segment, e.g. `bookings` or `payments`.
    pub fn family(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    /// Major version from a trailing `.vN` segment, if there is one.
    pub fn version(&self) -> Option<u32> {
        self.0.rsplit('.').next()?.strip_prefix('v')?.parse().ok()
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One submission: id, name, JSON payload and when the queue accepted it.
///
/// Retries reuse the envelope unchanged, so every attempt of a task sees the
/// same payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    task_id: TaskId,
    task_type: TaskType,
    payload: serde_json::Value,
    submitted_at: DateTime<Utc>,
}

impl TaskEnvelope {
    pub fn new(
        task_id: TaskId,
        task_type: TaskType,
        payload: serde_json::Value,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            task_type,
            payload,
            submitted_at,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn task_type(&self) -> &TaskType {
        &self.task_type
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("bookings.confirmation.send.v1", "bookings", Some(1))]
    #[case("payments.confirmation.send.v12", "payments", Some(12))]
    #[case("adhoc", "adhoc", None)]
    #[case("bookings.pending.check.vnext", "bookings", None)]
    fn family_and_version(#[case] name: &str, #[case] family: &str, #[case] version: Option<u32>) {
        let task_type = TaskType::new(name);
        assert_eq!(task_type.family(), family);
        assert_eq!(task_type.version(), version);
    }

    #[test]
    fn serializes_as_a_plain_string() {
        let s = serde_json::to_string(&TaskType::new("bookings.confirmation.send.v1")).unwrap();
        assert_eq!(s, "\"bookings.confirmation.send.v1\"");
    }
}
