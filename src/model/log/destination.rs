use macros::loggable;

loggable! {
    DestinationLog {
        #[error("Destinations synced: {added} added, {removed} removed")]
        DestinationsSynced { added: usize, removed: usize } => tracing::Level::INFO,

        #[error("Backup server unreachable, keeping known destinations")]
        RemoteUnavailable => tracing::Level::WARN,
    }
}
