// src/services/mod.rs
//
// Shared services used across the domain modules

pub mod encryption;
pub mod monitoring;

// Re-export commonly used types for convenience
pub use encryption::EncryptionService;
