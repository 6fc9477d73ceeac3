//! # OAuth Module
//!
//! One-time admin connection to the marketplace account:
//! - Authorization code flow with PKCE (S256) and a CSRF state parameter
//! - Token exchange and refresh
//! - Status/logout endpoints and the operator-facing result pages

pub mod errors;
pub mod flow;
pub mod handlers;
pub mod models;
pub mod pkce;
pub mod routes;


pub use flow::OAuthService;
pub use routes::oauth_routes;
