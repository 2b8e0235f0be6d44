pub mod config;
pub mod database_validator;
pub mod due_date_monitor;
pub mod file_storage;
pub mod notification;
pub mod seed;
