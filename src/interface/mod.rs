pub mod core;
pub mod remote_backup_service;
pub mod repository;
