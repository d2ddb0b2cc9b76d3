use crate::model::error::database::DatabaseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupState {
    Idle,
    Running,
    Waiting,
    Sending,
    Finished,
    RemovedLocal,
    ErrorRunning,
    ErrorSending,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobEvent {
    StartCapture,
    CaptureSucceeded,
    CaptureFailed,
    StartTransfer,
    TransferSucceeded,
    TransferFailed,
    RemoveLocal,
    Retry,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: BackupState,
    pub to: BackupState,
}

/// Every legal (state, event) pair. Anything missing is rejected.
const TRANSITIONS: &[(BackupState, JobEvent, BackupState)] = &[
    (BackupState::Idle, JobEvent::StartCapture, BackupState::Running),
    (BackupState::Running, JobEvent::CaptureSucceeded, BackupState::Waiting),
    (BackupState::Running, JobEvent::CaptureFailed, BackupState::ErrorRunning),
    (BackupState::Running, JobEvent::Interrupted, BackupState::Idle),
    (BackupState::ErrorRunning, JobEvent::Retry, BackupState::Idle),
    (BackupState::Waiting, JobEvent::StartTransfer, BackupState::Sending),
    (BackupState::Sending, JobEvent::TransferSucceeded, BackupState::Finished),
    (BackupState::Sending, JobEvent::TransferFailed, BackupState::ErrorSending),
    (BackupState::Sending, JobEvent::Interrupted, BackupState::Waiting),
    (BackupState::ErrorSending, JobEvent::Retry, BackupState::Waiting),
    (BackupState::Finished, JobEvent::RemoveLocal, BackupState::RemovedLocal),
];

impl BackupState {
    pub const ALL: [BackupState; 8] = [
        Self::Idle,
        Self::Running,
        Self::Waiting,
        Self::Sending,
        Self::Finished,
        Self::RemovedLocal,
        Self::ErrorRunning,
        Self::ErrorSending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Running => "RUNNING",
            Self::Waiting => "WAITING",
            Self::Sending => "SENDING",
            Self::Finished => "FINISHED",
            Self::RemovedLocal => "REMOVED_LOCAL",
            Self::ErrorRunning => "ERROR_RUNNING",
            Self::ErrorSending => "ERROR_SENDING",
        }
    }

    /// Next state on the success path. Error states and the terminal state
    /// have none.
    pub fn successor(&self) -> Option<BackupState> {
        match self {
            Self::Idle => Some(Self::Running),
            Self::Running => Some(Self::Waiting),
            Self::Waiting => Some(Self::Sending),
            Self::Sending => Some(Self::Finished),
            Self::Finished => Some(Self::RemovedLocal),
            Self::RemovedLocal | Self::ErrorRunning | Self::ErrorSending => None,
        }
    }

    pub fn on(&self, event: JobEvent) -> Option<BackupState> {
        TRANSITIONS
            .iter()
            .find(|(from, trigger, _)| from == self && *trigger == event)
            .map(|(_, _, to)| *to)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::ErrorRunning | Self::ErrorSending)
    }
}

impl FromStr for BackupState {
    type Err = DatabaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == value)
            .ok_or_else(|| DatabaseError::DataCorrupted("state"))
    }
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
