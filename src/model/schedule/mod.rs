pub mod recurrence;
pub mod recurrence_rule;
pub mod schedule;
