pub mod cli;
pub mod core;
pub mod environment;
pub mod pipeline;
pub mod providers;
pub mod store;
pub mod types;
pub mod utils;
pub mod web;

pub use web::start_web_server;
