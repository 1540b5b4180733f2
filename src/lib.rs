// Core modules
pub mod backtest;
pub mod config;
pub mod context;
pub mod exchange;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod persistence;
pub mod strategy;

// Re-export commonly used types
pub use context::ExecutionContext;
pub use exchange::ExchangeClient;
pub use models::*;
pub use strategy::Strategy;

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
