pub mod database;
pub mod destination;
pub mod schedule;
pub mod system;
pub mod task;
