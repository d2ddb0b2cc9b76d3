pub mod backup;
pub mod config;
pub mod context;
pub mod destination;
pub mod error;
pub mod log;
pub mod schedule;
