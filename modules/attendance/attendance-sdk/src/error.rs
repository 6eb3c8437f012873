//! Attendance client error types.
//!
//! Every people/attendance operation fails with a single [`ApiError`]
//! carrying a short machine-readable [`ErrorCode`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Host could not be reached (connect, TLS or timeout failure).
    NetworkError,
    /// Non-2xx response; the status is carried on the error.
    HttpError,
    /// Payload has the wrong shape, e.g. an object where a list was expected.
    InvalidResponse,
    /// A person in a list is missing its id, surname or name.
    InvalidPersonData,
    /// Anything else, including bodies that are not valid JSON.
    UnknownError,
}

impl ErrorCode {
    #[must_use]
    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::HttpError => "HTTP_ERROR",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::InvalidPersonData => "INVALID_PERSON_DATA",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`PeopleApi`](crate::PeopleApi) and
/// [`AttendanceApi`](crate::AttendanceApi).
///
/// `status` is `Some(0)` for failures that never produced an HTTP status
/// and the numeric status for `HTTP_ERROR`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
    pub code: ErrorCode,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            code,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message).with_status(0)
    }

    pub fn http(status: u16, reason: &str) -> Self {
        let message = if reason.is_empty() {
            format!("HTTP Error: {status}")
        } else {
            format!("HTTP Error: {status} {reason}")
        };
        Self::new(ErrorCode::HttpError, message).with_status(status)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message).with_status(0)
    }

    #[must_use]
    pub fn invalid_person_data(index: usize) -> Self {
        Self::new(
            ErrorCode::InvalidPersonData,
            format!("Invalid person data at index {index}: Missing required fields"),
        )
        .with_status(0)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnknownError, message).with_status(0)
    }
}
