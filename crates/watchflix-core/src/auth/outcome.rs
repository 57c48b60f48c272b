use std::fmt;

use reqwest::StatusCode;
use serde::Serialize;

use crate::api::FieldErrors;

/// Result of a credential-bearing action, ready for display.
/// `message` is empty on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: String,
}

impl AuthOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            message: String::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFailure {
    NoResponse,
    MissingCredentials,
    WrongCredentials,
    Other,
}

impl LoginFailure {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => LoginFailure::MissingCredentials,
            StatusCode::UNAUTHORIZED => LoginFailure::WrongCredentials,
            _ => LoginFailure::Other,
        }
    }
}

impl fmt::Display for LoginFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginFailure::NoResponse => write!(f, "No server response"),
            LoginFailure::MissingCredentials => write!(f, "Missing username or password"),
            LoginFailure::WrongCredentials => write!(f, "Wrong username or password"),
            LoginFailure::Other => write!(f, "Login failed"),
        }
    }
}

impl From<LoginFailure> for AuthOutcome {
    fn from(failure: LoginFailure) -> Self {
        AuthOutcome::failure(failure.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterFailure {
    NoResponse,
    UsernameTaken,
    EmailTaken,
    Other,
}

impl RegisterFailure {
    /// Classify a rejected registration. Only a 400 carries field detail;
    /// a username collision wins over an email collision.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        if status != StatusCode::BAD_REQUEST {
            return RegisterFailure::Other;
        }
        match FieldErrors::parse(body) {
            Some(fields) if fields.has_field("username") => RegisterFailure::UsernameTaken,
            Some(fields) if fields.has_field("email") => RegisterFailure::EmailTaken,
            _ => RegisterFailure::Other,
        }
    }
}

impl fmt::Display for RegisterFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterFailure::NoResponse => write!(f, "No server response"),
            RegisterFailure::UsernameTaken => write!(f, "Username already exists"),
            RegisterFailure::EmailTaken => write!(f, "Email already exists"),
            RegisterFailure::Other => write!(f, "Registration failed"),
        }
    }
}

impl From<RegisterFailure> for AuthOutcome {
    fn from(failure: RegisterFailure) -> Self {
        AuthOutcome::failure(failure.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_classification() {
        assert_eq!(
            LoginFailure::from_status(StatusCode::BAD_REQUEST),
            LoginFailure::MissingCredentials
        );
        assert_eq!(
            LoginFailure::from_status(StatusCode::UNAUTHORIZED),
            LoginFailure::WrongCredentials
        );
        assert_eq!(
            LoginFailure::from_status(StatusCode::INTERNAL_SERVER_ERROR),
            LoginFailure::Other
        );
        assert_eq!(
            AuthOutcome::from(LoginFailure::WrongCredentials),
            AuthOutcome::failure("Wrong username or password")
        );
    }

    #[test]
    fn test_register_classification() {
        let bad = StatusCode::BAD_REQUEST;
        assert_eq!(
            RegisterFailure::from_response(bad, r#"{"username": ["taken"]}"#),
            RegisterFailure::UsernameTaken
        );
        assert_eq!(
            RegisterFailure::from_response(bad, r#"{"email": ["taken"]}"#),
            RegisterFailure::EmailTaken
        );
        assert_eq!(
            RegisterFailure::from_response(bad, r#"{"email": ["x"], "username": ["y"]}"#),
            RegisterFailure::UsernameTaken
        );
        assert_eq!(
            RegisterFailure::from_response(bad, r#"{"birth_date": ["required"]}"#),
            RegisterFailure::Other
        );
        assert_eq!(
            RegisterFailure::from_response(StatusCode::CONFLICT, r#"{"username": ["taken"]}"#),
            RegisterFailure::Other
        );
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = AuthOutcome::success();
        assert!(ok.success);
        assert!(ok.message.is_empty());

        let failed = AuthOutcome::from(RegisterFailure::NoResponse);
        assert!(!failed.success);
        assert_eq!(failed.message, "No server response");
    }
}
