use macros::loggable;
use uuid::Uuid;

loggable! {
    ScheduleLog {
        #[error("Skipping malformed recurrence parameter: {entry}")]
        MalformedParameter { entry: String } => tracing::Level::WARN,

        #[error("Skipping schedule {uuid} with unusable recurrence rule")]
        UnusableRule { uuid: Uuid } => tracing::Level::ERROR,

        #[error("Admitted occurrence {time} of schedule {uuid}")]
        OccurrenceAdmitted { uuid: Uuid, time: String } => tracing::Level::INFO,

        #[error("Scheduled next occurrence {time} of schedule {uuid}")]
        NextOccurrenceScheduled { uuid: Uuid, time: String } => tracing::Level::INFO,

        #[error("Schedule {uuid} has no destination, skipping")]
        NoDestination { uuid: Uuid } => tracing::Level::WARN,

        #[error("Removed schedule {uuid} no longer in configuration")]
        ScheduleRemoved { uuid: Uuid } => tracing::Level::INFO,

        #[error("Seeded {saved} schedules from configuration, removed {removed}, pruned {pruned} rules")]
        SchedulesSeeded { saved: usize, removed: usize, pruned: u64 } => tracing::Level::INFO,
    }
}
