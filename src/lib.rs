pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod notify;
pub mod scan;
pub mod sources;
pub mod utils;
