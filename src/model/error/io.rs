use macros::traceable;

traceable! {
    IOError {
        #[error("Failed to create directory: {path}")]
        CreateDirectoryFailed { path: String } => tracing::Level::ERROR,

        #[error("Failed to read file: {path}")]
        ReadFileFailed { path: String } => tracing::Level::ERROR,

        #[error("Failed to write file: {path}")]
        WriteFileFailed { path: String } => tracing::Level::ERROR,

        #[error("Failed to delete file: {path}")]
        DeleteFileFailed { path: String } => tracing::Level::ERROR,

        #[error("Failed to get file metadata: {path}")]
        GetMetadataFailed { path: String } => tracing::Level::ERROR,
    }
}
