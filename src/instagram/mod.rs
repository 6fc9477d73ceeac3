//! # Instagram Module
//!
//! Recent posts for the homepage feed, read from the Instagram Graph API
//! with a built-in fallback so the section never renders empty.

pub mod client;
pub mod handlers;
pub mod models;
pub mod routes;


pub use client::InstagramClient;
pub use routes::instagram_routes;
