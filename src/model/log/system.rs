use macros::loggable;
use uuid::Uuid;

loggable! {
    SystemLog {
        #[error("Initializing")]
        Initializing => tracing::Level::INFO,

        #[error("Initialization completed")]
        InitializeComplete => tracing::Level::INFO,

        #[error("Online")]
        Online => tracing::Level::INFO,

        #[error("Extraordinary run {uuid} of {name} requested, now {state}")]
        ExtraordinaryRequested { name: String, uuid: Uuid, state: String } => tracing::Level::INFO,

        #[error("Shutdown requested")]
        ShutdownRequested => tracing::Level::INFO,

        #[error("Termination in process")]
        Terminating => tracing::Level::INFO,

        #[error("Termination completed")]
        TerminateComplete => tracing::Level::INFO,
    }
}
