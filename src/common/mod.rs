// Common module - shared types and utilities across all modules

pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod state;

// Re-export commonly used types for convenience
pub use error::ApiError;
pub use helpers::safe_token_log;
pub use state::AppState;
