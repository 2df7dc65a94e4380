pub mod config;
pub mod datetime;
pub mod error;
pub mod init;
pub mod loader;
pub mod model;
pub mod report;
pub mod results;
pub mod schedule;
pub mod session;
pub mod students;
