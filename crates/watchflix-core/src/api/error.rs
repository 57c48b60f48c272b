use std::collections::BTreeMap;
use std::fmt;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// The request never produced an HTTP response.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("server unreachable: {0}")]
    Unreachable(String),
}

/// Failure of the token refresh protocol.
///
/// Cloneable because a single in-flight refresh is awaited by every
/// concurrent caller and each of them receives its own copy of the outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("no refresh token available")]
    NoCredential,

    #[error("no server response during token refresh: {0}")]
    NoResponse(String),

    #[error("token refresh rejected with status {0}")]
    Rejected(u16),

    #[error("invalid token refresh response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No server response: {0}")]
    NoResponse(#[from] TransportError),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Session expired: {0}")]
    Refresh(#[from] RefreshError),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            400 => match FieldErrors::parse(body) {
                Some(fields) => ApiError::Validation(fields),
                None => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
            },
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// True when the caller has to log in again before retrying.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::Refresh(_))
    }
}

/// Per-field validation messages from a 400 response body,
/// e.g. `{"username": ["A user with that username already exists."]}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, serde_json::Value>);

impl FieldErrors {
    /// Parse a JSON object body. Returns `None` for anything that isn't a
    /// non-empty object.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str::<FieldErrors>(body)
            .ok()
            .filter(|errors| !errors.0.is_empty())
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Messages reported for a field, whether the server sent a single
    /// string or a list of them.
    pub fn messages(&self, field: &str) -> Vec<String> {
        match self.0.get(field) {
            Some(serde_json::Value::String(s)) => vec![s.clone()],
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(other) => vec![other.to_string()],
            None => Vec::new(),
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields()
            .map(|field| format!("{}: {}", field, self.messages(field).join(" ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, ""),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, "{\"detail\":\"Not found.\"}"),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, ""),
            ApiError::AccessDenied(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream"),
            ApiError::ServerError(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ApiError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_bad_request_with_field_detail() {
        let body = r#"{"email": ["Enter a valid email address."], "username": "taken"}"#;
        match ApiError::from_status(StatusCode::BAD_REQUEST, body) {
            ApiError::Validation(fields) => {
                assert!(fields.has_field("email"));
                assert!(fields.has_field("username"));
                assert_eq!(fields.messages("email"), vec!["Enter a valid email address."]);
                assert_eq!(fields.messages("username"), vec!["taken"]);
                assert!(fields.messages("password").is_empty());
                assert_eq!(
                    fields.to_string(),
                    "email: Enter a valid email address.; username: taken"
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        // Not an object: no field detail to report
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "Bad Request"),
            ApiError::InvalidResponse(_)
        ));
        assert!(FieldErrors::parse("{}").is_none());
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(MAX_ERROR_BODY_LENGTH)));
        assert!(truncated.ends_with(&format!("(truncated, {} total bytes)", long.len())));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_requires_login() {
        assert!(ApiError::Unauthorized.requires_login());
        assert!(ApiError::Refresh(RefreshError::Rejected(401)).requires_login());
        assert!(!ApiError::NotFound(String::new()).requires_login());
    }
}
