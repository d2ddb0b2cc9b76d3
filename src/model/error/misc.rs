use macros::traceable;

traceable! {
    MiscError {
        #[error("Failed to serialize value")]
        SerializeError => tracing::Level::ERROR,

        #[error("Failed to deserialize value")]
        DeserializeError => tracing::Level::ERROR,

        #[error("Background task failed")]
        JoinFailed => tracing::Level::ERROR,

        #[no_source]
        #[error("Semaphore has been closed")]
        SemaphoreClosed => tracing::Level::ERROR,
    }
}
