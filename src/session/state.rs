use serde::{Deserialize, Serialize};

use crate::recognizer::TaskState;

/// Externally visible session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Inactive,
    Starting,
    Recognizing,
    Stopping,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Inactive => "inactive",
            SessionState::Starting => "starting",
            SessionState::Recognizing => "recognizing",
            SessionState::Stopping => "stopping",
        }
    }
}

impl From<TaskState> for SessionState {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Starting => SessionState::Starting,
            TaskState::Running => SessionState::Recognizing,
            TaskState::Finishing | TaskState::Canceling => SessionState::Stopping,
            TaskState::Completed => SessionState::Inactive,
        }
    }
}
