use macros::traceable;

traceable! {
    IntegrityError {
        #[no_source]
        #[error("Backup server did not accept {filename}")]
        UploadRefused { filename: String } => tracing::Level::WARN,

        #[no_source]
        #[error("Checksum mismatch: sent {expected}, server computed {actual}")]
        ChecksumMismatch { expected: String, actual: String } => tracing::Level::ERROR,
    }
}
