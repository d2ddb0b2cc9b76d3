pub mod backup_job;
pub mod job_state;
