use macros::loggable;
use uuid::Uuid;

loggable! {
    TaskLog {
        #[error("Backup job {uuid}: {from} -> {to}")]
        Transition { uuid: Uuid, from: String, to: String } => tracing::Level::DEBUG,

        #[error("Backup job {uuid} captured to {path}")]
        CaptureCompleted { uuid: Uuid, path: String } => tracing::Level::INFO,

        #[error("Backup job {uuid} failed to capture")]
        CaptureFailed { uuid: Uuid } => tracing::Level::WARN,

        #[error("Backup job {uuid} transferred")]
        TransferCompleted { uuid: Uuid } => tracing::Level::INFO,

        #[error("Backup job {uuid} failed to transfer")]
        TransferFailed { uuid: Uuid } => tracing::Level::WARN,

        #[error("Backup job {uuid} transfer cancelled")]
        TransferCancelled { uuid: Uuid } => tracing::Level::INFO,

        #[error("Backup job {uuid} local copy removed")]
        LocalCopyRemoved { uuid: Uuid } => tracing::Level::INFO,

        #[error("Recovered {count} interrupted backup jobs")]
        JobsRecovered { count: usize } => tracing::Level::INFO,

        #[error("Backup job {uuid} is already in flight")]
        JobBusy { uuid: Uuid } => tracing::Level::DEBUG,
    }
}
