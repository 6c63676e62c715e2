//! Work item definition and state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use shivai_protocols::{Failure, Intent, Outcome};

/// Dispatch priority. Lower level dispatches first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical = 0,
    High = 1,
    Normal = 2,
    Low = 3,
    Background = 4,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Critical,
        Priority::High,
        Priority::Normal,
        Priority::Low,
        Priority::Background,
    ];

    /// Numeric level, 0 (highest) to 4 (lowest).
    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(level as usize).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::Background => "background",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(level) = s.parse::<u8>() {
            return Self::from_level(level).ok_or_else(|| format!("priority level out of range: {}", s));
        }
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown priority: {}", s))
    }
}

/// Where a work item is in its life.
///
/// `Queued -> Running -> {Succeeded, Failed, TimedOut}`; a failed or timed
/// out attempt goes back to `Queued` while attempts remain, otherwise the
/// item ends `Failed`. `Cancelled` is reachable from every non-terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkState {
    Queued,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl WorkState {
    pub fn can_transition_to(self, next: WorkState) -> bool {
        use WorkState::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, TimedOut)
                | (Failed, Queued)
                | (TimedOut, Queued)
                | (TimedOut, Failed)
                | (Queued, Cancelled)
                | (Running, Cancelled)
                | (Failed, Cancelled)
                | (TimedOut, Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkState::Queued => "queued",
            WorkState::Running => "running",
            WorkState::Succeeded => "succeeded",
            WorkState::Failed => "failed",
            WorkState::TimedOut => "timed_out",
            WorkState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque reference to a submitted work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkHandle(Uuid);

impl WorkHandle {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for WorkHandle {
    fn from(id: Uuid) -> Self {
        WorkHandle(id)
    }
}

impl fmt::Display for WorkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(WorkHandle)
    }
}

/// One unit of work: an intent bound for a capability.
///
/// The scheduler owns the live item; callers only ever see clones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    pub intent: Intent,
    pub priority: Priority,
    pub target_capability: String,
    pub created_at: DateTime<Utc>,
    /// Attempts started so far.
    pub attempt_count: u32,
    pub max_attempts: u32,
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
    pub state: WorkState,
    /// Every state the item has been in, oldest first.
    #[serde(default)]
    pub transitions: Vec<WorkState>,
    /// Error of the most recent failed attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<Failure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Scheduler clock reading from which the item may be dispatched.
    #[serde(skip)]
    pub(crate) eligible_at: Duration,
}

impl WorkItem {
    pub fn new(intent: Intent, target_capability: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            intent,
            priority: Priority::Normal,
            target_capability: target_capability.into(),
            created_at: Utc::now(),
            attempt_count: 0,
            max_attempts: 3,
            timeout: Duration::from_secs(30),
            state: WorkState::Queued,
            transitions: vec![WorkState::Queued],
            last_error: None,
            outcome: None,
            finished_at: None,
            eligible_at: Duration::ZERO,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// At least one attempt is always allowed.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn handle(&self) -> WorkHandle {
        WorkHandle(self.id)
    }

    /// Whether the item has reached its final outcome.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempt_count)
    }

    pub(crate) fn transition(&mut self, next: WorkState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal work item transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
        self.transitions.push(next);
    }

    pub(crate) fn finish(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
        self.finished_at = Some(Utc::now());
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
