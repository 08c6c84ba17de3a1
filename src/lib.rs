pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod types;
pub mod validation;

#[cfg(test)]
pub mod testing;

pub use app::app;
pub use state::AppState;
