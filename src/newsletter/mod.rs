//! # Newsletter Module
//!
//! Homepage newsletter sign-up backed by a Mailchimp audience:
//! - Double opt-in subscription (`status: pending`)
//! - Visitor-facing Dutch result messages

pub mod client;
pub mod handlers;
pub mod models;
pub mod routes;

#[cfg(test)]
mod tests;

pub use client::NewsletterClient;
pub use routes::newsletter_routes;
