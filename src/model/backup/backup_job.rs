use crate::model::backup::job_state::{BackupState, JobEvent, Transition};
use crate::model::context::OriginContext;
use crate::model::error::Error;
use crate::model::error::database::DatabaseError;
use crate::model::error::task::TaskError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobKind {
    Scheduled,
    Extraordinary,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Extraordinary => "EXTRAORDINARY",
        }
    }
}

impl FromStr for JobKind {
    type Err = DatabaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "SCHEDULED" => Ok(Self::Scheduled),
            "EXTRAORDINARY" => Ok(Self::Extraordinary),
            _ => Err(DatabaseError::DataCorrupted("kind")),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobErrorKind {
    Configuration,
    TransientTransport,
    Integrity,
    Unexpected,
}

/// What went wrong on the last failed step of a job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct JobError {
    pub kind: JobErrorKind,
    pub message: String,
    pub trace: String,
}

impl From<&Error> for JobError {
    fn from(error: &Error) -> Self {
        let message = match error.cause() {
            Some(cause) => format!("{error}: {cause}"),
            None => error.to_string(),
        };
        Self {
            kind: error.kind(),
            message,
            trace: format!("{error:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupJob {
    pub uuid: Uuid,
    pub schedule_uuid: Uuid,
    pub time: DateTime<Utc>,
    pub local_file: Option<PathBuf>,
    pub size: Option<u64>,
    pub destination_name: String,
    pub kind: JobKind,
    pub state: BackupState,
    pub last_error: Option<JobError>,
    pub remote_id: Option<i64>,
}

impl BackupJob {
    fn create(
        schedule_uuid: Uuid,
        time: DateTime<Utc>,
        destination_name: impl Into<String>,
        kind: JobKind,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            schedule_uuid,
            time,
            local_file: None,
            size: None,
            destination_name: destination_name.into(),
            kind,
            state: BackupState::Idle,
            last_error: None,
            remote_id: None,
        }
    }

    pub fn scheduled(
        schedule_uuid: Uuid,
        time: DateTime<Utc>,
        destination_name: impl Into<String>,
    ) -> Self {
        Self::create(schedule_uuid, time, destination_name, JobKind::Scheduled)
    }

    pub fn extraordinary(
        schedule_uuid: Uuid,
        time: DateTime<Utc>,
        destination_name: impl Into<String>,
    ) -> Self {
        Self::create(schedule_uuid, time, destination_name, JobKind::Extraordinary)
    }

    /// Moves one step along the success path; error states stay put.
    pub fn advance_state(&mut self) -> Option<Transition> {
        let to = self.state.successor()?;
        let transition = Transition {
            from: self.state,
            to,
        };
        self.state = to;
        Some(transition)
    }

    pub fn apply(&mut self, event: JobEvent) -> Result<Transition, TaskError> {
        let to = self
            .state
            .on(event)
            .ok_or_else(|| TaskError::IllegalTransition(self.state.as_str(), event.to_string()))?;
        let transition = Transition {
            from: self.state,
            to,
        };
        self.state = to;
        Ok(transition)
    }

    pub fn update_error(&mut self, error: &Error) {
        self.last_error = Some(JobError::from(error));
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// `{destination}/{origin}_{yyyymmddHHMM}_{job}.db.gz`, relative to the
    /// dump directory. `{job}` is the first eight hex digits of the job uuid.
    pub fn artifact_name(&self, origin: &OriginContext) -> PathBuf {
        let uuid = self.uuid.simple().to_string();
        let filename = format!(
            "{}_{}_{}.db.gz",
            origin.name,
            self.time.format("%Y%m%d%H%M"),
            &uuid[..8]
        );
        PathBuf::from(&self.destination_name).join(filename)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.time <= now
    }
}
