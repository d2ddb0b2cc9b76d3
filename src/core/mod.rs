pub mod backup;
pub mod destination;
pub mod infrastructure;
pub mod remote;
pub mod schedule;
pub mod system;
