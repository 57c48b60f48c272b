//! Core library for Watchflix: REST client, session management, token
//! storage, and the catalog models.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthOutcome, SessionManager};
pub use config::Config;
