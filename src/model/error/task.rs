use macros::traceable;
use uuid::Uuid;

traceable! {
    TaskError {
        #[no_source]
        #[error("Schedule not found: {uuid}")]
        ScheduleNotFound { uuid: Uuid } => tracing::Level::ERROR,

        #[no_source]
        #[error("Backup job not found: {uuid}")]
        JobNotFound { uuid: Uuid } => tracing::Level::ERROR,

        #[no_source]
        #[error("Schedule {uuid} has no destination")]
        MissingDestination { uuid: Uuid } => tracing::Level::WARN,

        #[no_source]
        #[error("Illegal transition: {event} in state {state}")]
        IllegalTransition { state: String, event: String } => tracing::Level::ERROR,

        #[no_source]
        #[error("Backup job {uuid} has no local artifact")]
        MissingArtifact { uuid: Uuid } => tracing::Level::ERROR,
    }
}
