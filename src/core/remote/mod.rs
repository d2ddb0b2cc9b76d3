pub mod http_backup_service;
