//! Authentication: who is logged in and how their tokens stay valid.
//!
//! This module provides:
//! - `SessionManager`: login, logout, request decoration and token refresh
//! - `TokenStore`: persistence of the username and token slots
//!   (`FileTokenStore`, `KeyringTokenStore`, `MemoryTokenStore`)
//! - `AuthOutcome`: display-ready result of login and registration
//!
//! Access tokens are short-lived. A 401 triggers one refresh and one
//! resubmission; a background task also refreshes on a fixed interval.

pub mod credentials;
pub mod outcome;
pub mod session;
pub mod store;

pub use credentials::{Credential, KeyringTokenStore, Slot};
pub use outcome::{AuthOutcome, LoginFailure, RegisterFailure};
pub use session::{
    Attempt, BackgroundRefresh, SessionManager, SessionOptions, SessionState, SessionStatus,
    DEFAULT_REFRESH_INTERVAL,
};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
