use std::fmt;

use super::Stage;

/// Lifecycle of a job as derived from the marker files in its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running(Stage),
    Done,
    Failed(String),
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "QUEUED",
            JobState::Running(_) => "RUNNING",
            JobState::Done => "DONE",
            JobState::Failed(_) => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed(_))
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            JobState::Running(stage) => Some(*stage),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            JobState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running(stage) => write!(f, "{}({})", self.as_str(), stage),
            _ => write!(f, "{}", self.as_str()),
        }
    }
}
