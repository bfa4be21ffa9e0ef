pub mod alerts;
pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod subscribers;
pub mod types;
