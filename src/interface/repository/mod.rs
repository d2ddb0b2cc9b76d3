pub mod backup_job;
pub mod destination;
pub mod recurrence_rule;
pub mod schedule;
