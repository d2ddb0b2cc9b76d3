use macros::traceable;

traceable! {
    DatabaseError {
        #[error("Failed to open database")]
        DatabaseConnectFailed => tracing::Level::ERROR,

        #[error("Failed to execute SQL statement")]
        StatementExecutionFailed => tracing::Level::ERROR,

        #[error("Failed to begin or commit transaction")]
        TransactionFailed => tracing::Level::ERROR,

        #[no_source]
        #[error("Corrupted value in column {column}")]
        DataCorrupted { column: String } => tracing::Level::ERROR,
    }
}
