pub mod cache;
pub mod cli;
pub mod config;
pub mod navigation;
pub mod redirect;
pub mod server;
pub mod stats;
