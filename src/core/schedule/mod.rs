pub mod schedule_seed;
pub mod schedule_timer;
