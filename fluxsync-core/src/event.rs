//! Change events and the error taxonomy they carry

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable error classes shared by every store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed local payload, caught before any network call
    Validation,
    /// Credential rejected remotely
    Auth,
    /// Server returned a structured error
    Api,
    /// Transport failure (connectivity, timeout)
    Network,
    /// Anything unclassified
    Generic,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Auth => "auth",
            ErrorKind::Api => "api",
            ErrorKind::Network => "network",
            ErrorKind::Generic => "generic",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error descriptor attached to a failed [`ChangeEvent`]
///
/// `code` is the domain-specific type (e.g. `"unknown_post"`,
/// `"invalid_response"`) and `message` is meant for people.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind} error ({code}): {message}")]
pub struct ChangeError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
}

impl ChangeError {
    pub fn new(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, code, message)
    }

    pub fn generic(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, code, message)
    }

    /// Replace the code, keeping kind and message
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }
}

/// Failure reported by a network collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("api error {code}: {message}")]
    Api { code: String, message: String },

    #[error("network failure: {0}")]
    GenericNetwork(String),

    #[error("request timed out")]
    Timeout,
}

impl NetworkError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        NetworkError::Api {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<NetworkError> for ChangeError {
    fn from(error: NetworkError) -> Self {
        let message = error.to_string();
        match error {
            NetworkError::Auth(_) => {
                ChangeError::new(ErrorKind::Auth, "authorization_required", message)
            }
            NetworkError::Api { code, message } => ChangeError::new(ErrorKind::Api, code, message),
            NetworkError::GenericNetwork(_) => {
                ChangeError::new(ErrorKind::Network, "generic_network", message)
            }
            NetworkError::Timeout => ChangeError::new(ErrorKind::Network, "timeout", message),
        }
    }
}

/// Notification published after a store finishes processing an action
///
/// `cause` is the type of the action that produced the event. Absence of
/// `error` means success. Events are delivered once and not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent<T, D> {
    pub cause: T,
    pub error: Option<ChangeError>,
    pub data: Option<D>,
}

impl<T, D> ChangeEvent<T, D> {
    /// Successful event with no data
    pub fn new(cause: T) -> Self {
        Self {
            cause,
            error: None,
            data: None,
        }
    }

    /// Successful event carrying `data`
    pub fn ok(cause: T, data: D) -> Self {
        Self {
            cause,
            error: None,
            data: Some(data),
        }
    }

    /// Failed event
    pub fn failed(cause: T, error: impl Into<ChangeError>) -> Self {
        Self {
            cause,
            error: Some(error.into()),
            data: None,
        }
    }

    pub fn with_data(mut self, data: D) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_error(mut self, error: impl Into<ChangeError>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Convert cause and data, e.g. from a domain type to the application type
    pub fn map<U, E>(self, cause: impl FnOnce(T) -> U, data: impl FnOnce(D) -> E) -> ChangeEvent<U, E> {
        ChangeEvent {
            cause: cause(self.cause),
            error: self.error,
            data: self.data.map(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_mapping() {
        let auth: ChangeError = NetworkError::Auth("bad token".into()).into();
        assert_eq!(auth.kind, ErrorKind::Auth);

        let api: ChangeError = NetworkError::api("unknown_post", "Post not found").into();
        assert_eq!(api.kind, ErrorKind::Api);
        assert_eq!(api.code, "unknown_post");
        assert_eq!(api.message, "Post not found");

        let timeout: ChangeError = NetworkError::Timeout.into();
        assert_eq!(timeout.kind, ErrorKind::Network);
        assert_eq!(timeout.code, "timeout");

        let offline: ChangeError = NetworkError::GenericNetwork("offline".into()).into();
        assert_eq!(offline.kind, ErrorKind::Network);
    }

    #[test]
    fn test_change_event_map() {
        let event: ChangeEvent<u8, u16> = ChangeEvent::ok(1, 2);
        let mapped = event.map(|c| c as u32 * 10, |d| d.to_string());
        assert_eq!(mapped.cause, 10);
        assert_eq!(mapped.data.as_deref(), Some("2"));
        assert!(!mapped.is_error());
    }

    #[test]
    fn test_change_error_display() {
        let err = ChangeError::validation("empty_content", "Comment content is empty");
        assert_eq!(
            err.to_string(),
            "validation error (empty_content): Comment content is empty"
        );
    }
}
