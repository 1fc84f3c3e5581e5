//! Rate-limit reset monitor: polls a status endpoint for per-bucket reset
//! instants and notifies (email/webhook) when a reset arrives.

pub mod cli;
pub mod config;
pub mod http;
pub mod monitor;
pub mod notify;
pub mod parser;
