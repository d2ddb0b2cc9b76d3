use macros::traceable;

traceable! {
    TransportError {
        #[error("Failed to reach the backup server")]
        ConnectionFailed => tracing::Level::WARN,

        #[no_source]
        #[error("Backup server did not answer within {seconds}s")]
        Timeout { seconds: u64 } => tracing::Level::WARN,

        #[no_source]
        #[error("Backup server answered with status {status}")]
        UnexpectedStatus { status: u16 } => tracing::Level::WARN,

        #[error("Failed to decode the backup server response")]
        InvalidResponse => tracing::Level::WARN,

        #[error("Failed to build the HTTP client")]
        ClientBuildFailed => tracing::Level::ERROR,
    }
}
