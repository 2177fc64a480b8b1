pub mod api;
pub mod commands;
pub mod config;
pub mod http;
pub mod runtime;
