//! User-facing wording for client and identity-provider failures.

use attendance_sdk::{ApiError, ErrorCode};
use rollcall_auth::ProviderError;

const UNEXPECTED: &str = "An unexpected error occurred. Please try again.";

pub fn api_error(err: &ApiError) -> String {
    match err.code {
        ErrorCode::NetworkError => "Unable to connect to the server. Please check your internet connection and try again.".to_owned(),
        ErrorCode::HttpError => format!(
            "Server error ({}). Please try again later.",
            err.status.unwrap_or_default()
        ),
        ErrorCode::InvalidResponse | ErrorCode::InvalidPersonData => {
            "Received invalid data from server. Please contact support.".to_owned()
        }
        ErrorCode::UnknownError if err.message.is_empty() => UNEXPECTED.to_owned(),
        ErrorCode::UnknownError => err.message.clone(),
    }
}

pub fn provider_error(err: &ProviderError) -> String {
    match err.code() {
        Some("INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND") => {
            "Login failed. Please check your credentials.".to_owned()
        }
        Some("INVALID_EMAIL") => "The email address is badly formatted.".to_owned(),
        Some("USER_DISABLED") => "This account has been disabled.".to_owned(),
        Some(code) if code.starts_with("TOO_MANY_ATTEMPTS") => {
            "Too many failed attempts. Please try again later.".to_owned()
        }
        _ => match err {
            ProviderError::Transport(_) => {
                "Unable to reach the sign-in service. Please check your internet connection."
                    .to_owned()
            }
            ProviderError::NotSignedIn => "You are not signed in.".to_owned(),
            other => format!("Login failed: {other}"),
        },
    }
}
