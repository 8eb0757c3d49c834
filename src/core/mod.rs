// src/core/mod.rs
//! Shared infrastructure: configuration, database and outbound HTTP

pub mod config_manager;
pub mod database;
pub mod service_client;

pub use config_manager::ConfigManager;
pub use database::Database;
pub use service_client::ServiceClient;
