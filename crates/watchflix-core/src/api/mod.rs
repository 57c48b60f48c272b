//! REST API layer for the Watchflix service.
//!
//! This module provides:
//! - `Transport`: the seam between the session layer and the network,
//!   with `HttpTransport` as the `reqwest` implementation
//! - `ApiClient`: typed calls for catalog, reviews, ratings,
//!   recommendations, profiles and admin operations
//!
//! Authenticated calls carry a JWT bearer token obtained from the
//! `/token/` endpoint and managed by `auth::SessionManager`.

pub mod client;
pub mod error;
pub mod transport;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{ApiClient, Landing, SearchBy};
pub use error::{ApiError, FieldErrors, RefreshError, TransportError};
pub use transport::{ApiResponse, HttpTransport, PendingRequest, Transport};
