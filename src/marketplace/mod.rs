//! # Marketplace Module
//!
//! Storefront catalog sourced from the marketplace:
//! - Read-only API client (listings, shop, taxonomy, properties)
//! - Heuristic category classifier
//! - Product/shop endpoints

pub mod classifier;
pub mod client;
pub mod handlers;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

pub use client::MarketplaceClient;
pub use routes::marketplace_routes;
