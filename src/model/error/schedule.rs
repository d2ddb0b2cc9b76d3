use macros::traceable;

traceable! {
    ScheduleError {
        #[no_source]
        #[error("Unknown recurrence frequency: {frequency}")]
        UnknownFrequency { frequency: String } => tracing::Level::ERROR,

        #[no_source]
        #[error("Unknown recurrence parameter: {key}")]
        UnknownParameter { key: String } => tracing::Level::ERROR,

        #[error("Recurrence parameter {key} is not a list of integers")]
        InvalidParameterValue { key: String } => tracing::Level::ERROR,

        #[no_source]
        #[error("Recurrence parameter {key} out of range: {value}")]
        ParameterOutOfRange { key: String, value: i32 } => tracing::Level::ERROR,

        #[no_source]
        #[error("Recurrence parameter {key} takes a single value")]
        ScalarExpected { key: String } => tracing::Level::ERROR,

        #[no_source]
        #[error("Recurrence parameters given without a frequency")]
        ParamsWithoutFrequency => tracing::Level::ERROR,
    }
}
