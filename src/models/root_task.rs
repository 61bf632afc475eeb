//! Root Task Models
//!
//! One row per root plan recording the externally requested lifecycle
//! intent. This is a desired-state record, not an execution-state machine:
//! any state may follow any other.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::error::AppError;

/// Requested lifecycle intent for a root plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesiredTaskState {
    Start,
    Stop,
    Cancel,
    Pause,
    Resume,
}

impl DesiredTaskState {
    pub const ALL: [DesiredTaskState; 5] = [
        DesiredTaskState::Start,
        DesiredTaskState::Stop,
        DesiredTaskState::Cancel,
        DesiredTaskState::Pause,
        DesiredTaskState::Resume,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DesiredTaskState::Start => "START",
            DesiredTaskState::Stop => "STOP",
            DesiredTaskState::Cancel => "CANCEL",
            DesiredTaskState::Pause => "PAUSE",
            DesiredTaskState::Resume => "RESUME",
        }
    }

    /// STOP, CANCEL and PAUSE ask a running plan to halt at the next step boundary.
    pub fn is_interrupting(&self) -> bool {
        matches!(
            self,
            DesiredTaskState::Stop | DesiredTaskState::Cancel | DesiredTaskState::Pause
        )
    }

    pub fn is_running(&self) -> bool {
        matches!(self, DesiredTaskState::Start | DesiredTaskState::Resume)
    }
}

impl fmt::Display for DesiredTaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DesiredTaskState {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DesiredTaskState::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::validation(format!("Unknown desired task state: {}", s)))
    }
}

/// Persisted desired-state row for a root plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootTask {
    pub root_plan_id: String,
    pub desired_state: DesiredTaskState,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
    pub task_result: Option<String>,
}

impl RootTask {
    /// Create a row as if `state` had just been requested.
    pub fn new(root_plan_id: impl Into<String>, state: DesiredTaskState, now: DateTime<Utc>) -> Self {
        let mut task = Self {
            root_plan_id: root_plan_id.into(),
            desired_state: state,
            start_time: None,
            end_time: None,
            last_updated: now,
            task_result: None,
        };
        task.apply_transition(state, now);
        task
    }

    /// Record a requested transition.
    ///
    /// START stamps `start_time` once and clears `end_time`; STOP, CANCEL and
    /// PAUSE stamp `end_time` once; RESUME clears `end_time`.
    pub fn apply_transition(&mut self, state: DesiredTaskState, now: DateTime<Utc>) {
        self.desired_state = state;
        self.last_updated = now;
        match state {
            DesiredTaskState::Start => {
                self.start_time.get_or_insert(now);
                self.end_time = None;
            }
            DesiredTaskState::Stop | DesiredTaskState::Cancel | DesiredTaskState::Pause => {
                self.end_time.get_or_insert(now);
            }
            DesiredTaskState::Resume => {
                self.end_time = None;
            }
        }
    }

    pub fn should_interrupt(&self) -> bool {
        self.desired_state.is_interrupting()
    }

    pub fn is_running(&self) -> bool {
        self.desired_state.is_running()
    }
}
