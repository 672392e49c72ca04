pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod grafana;
pub mod handlers;
pub mod middleware;
pub mod monitoring;
pub mod services;
pub mod state;
pub mod types;

#[cfg(test)]
pub mod testing;
