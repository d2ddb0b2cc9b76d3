pub mod backup_driver;
pub mod job_runner;
pub mod local_capture;
