use macros::traceable;

traceable! {
    SystemError {
        #[error("Configuration not found")]
        ConfigNotFound => tracing::Level::ERROR,

        #[error("Invalid configuration")]
        InvalidConfig => tracing::Level::ERROR,

        #[no_source]
        #[error("Invalid configuration value: {field}")]
        InvalidConfigValue { field: String } => tracing::Level::ERROR,

        #[no_source]
        #[error("No schedule named {name} in configuration")]
        UnknownSchedule { name: String } => tracing::Level::ERROR,

        #[error("Failed to initialize logging")]
        LoggingInitFailed => tracing::Level::ERROR,

        #[error("Failed to listen for shutdown signal")]
        SignalListenFailed => tracing::Level::ERROR,

        #[no_source]
        #[error("Failed to send shutdown signal")]
        ShutdownSignalFailed => tracing::Level::ERROR,

        #[error("Worker thread panicked")]
        ThreadPanic => tracing::Level::ERROR,
    }
}
