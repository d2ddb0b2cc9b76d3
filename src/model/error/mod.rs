pub mod database;
pub mod integrity;
pub mod io;
pub mod misc;
pub mod schedule;
pub mod system;
pub mod task;
pub mod transport;

use crate::model::backup::backup_job::JobErrorKind;
use crate::model::error::database::DatabaseError;
use crate::model::error::integrity::IntegrityError;
use crate::model::error::io::IOError;
use crate::model::error::misc::MiscError;
use crate::model::error::schedule::ScheduleError;
use crate::model::error::system::SystemError;
use crate::model::error::task::TaskError;
use crate::model::error::transport::TransportError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum Error {
    #[error(transparent)]
    Database(DatabaseError),
    #[error(transparent)]
    Integrity(IntegrityError),
    #[error(transparent)]
    IO(IOError),
    #[error(transparent)]
    Misc(MiscError),
    #[error(transparent)]
    Schedule(ScheduleError),
    #[error(transparent)]
    System(SystemError),
    #[error(transparent)]
    Task(TaskError),
    #[error(transparent)]
    Transport(TransportError),
}

impl Error {
    pub fn level(&self) -> tracing::Level {
        match self {
            Self::Database(error) => error.level(),
            Self::Integrity(error) => error.level(),
            Self::IO(error) => error.level(),
            Self::Misc(error) => error.level(),
            Self::Schedule(error) => error.level(),
            Self::System(error) => error.level(),
            Self::Task(error) => error.level(),
            Self::Transport(error) => error.level(),
        }
    }

    pub fn cause(&self) -> Option<&str> {
        match self {
            Self::Database(error) => error.cause(),
            Self::Integrity(error) => error.cause(),
            Self::IO(error) => error.cause(),
            Self::Misc(error) => error.cause(),
            Self::Schedule(error) => error.cause(),
            Self::System(error) => error.cause(),
            Self::Task(error) => error.cause(),
            Self::Transport(error) => error.cause(),
        }
    }

    /// Retry class recorded on a backup job.
    pub fn kind(&self) -> JobErrorKind {
        match self {
            Self::Schedule(_) => JobErrorKind::Configuration,
            Self::Transport(_) => JobErrorKind::TransientTransport,
            Self::Integrity(_) => JobErrorKind::Integrity,
            _ => JobErrorKind::Unexpected,
        }
    }
}

impl From<DatabaseError> for Error {
    fn from(error: DatabaseError) -> Self {
        Self::Database(error)
    }
}

impl From<IntegrityError> for Error {
    fn from(error: IntegrityError) -> Self {
        Self::Integrity(error)
    }
}

impl From<IOError> for Error {
    fn from(error: IOError) -> Self {
        Self::IO(error)
    }
}

impl From<MiscError> for Error {
    fn from(error: MiscError) -> Self {
        Self::Misc(error)
    }
}

impl From<ScheduleError> for Error {
    fn from(error: ScheduleError) -> Self {
        Self::Schedule(error)
    }
}

impl From<SystemError> for Error {
    fn from(error: SystemError) -> Self {
        Self::System(error)
    }
}

impl From<TaskError> for Error {
    fn from(error: TaskError) -> Self {
        Self::Task(error)
    }
}

impl From<TransportError> for Error {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}
