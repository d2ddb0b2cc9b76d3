pub mod file_hash;
pub mod time;
