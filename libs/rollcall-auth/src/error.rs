use thiserror::Error;

/// Error reported by an [`IdentityProvider`](crate::IdentityProvider).
///
/// [`SessionManager::sign_in`](crate::SessionManager::sign_in) returns it
/// unchanged so callers can map [`code`](ProviderError::code) to a message.
/// None of the variants carry credentials or tokens.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// The provider understood the request and refused it.
    ///
    /// `code` is the provider's machine-readable reason, for example
    /// `INVALID_LOGIN_CREDENTIALS` or `TOO_MANY_ATTEMPTS_TRY_LATER`.
    #[error("identity provider rejected the request: {message}")]
    Rejected { code: String, message: String },

    /// The provider answered with an error status and no readable reason.
    #[error("identity provider returned HTTP {0}")]
    Status(u16),

    /// The provider could not be reached. Produced by
    /// [`format_http_error`](crate::format_http_error).
    #[error("{0}")]
    Transport(String),

    #[error("invalid identity provider response: {0}")]
    InvalidResponse(String),

    /// A token was requested while nobody is signed in.
    #[error("no user is signed in")]
    NotSignedIn,
}

impl ProviderError {
    /// Machine-readable code for `Rejected` errors.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            ProviderError::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Durable storage failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("storage I/O failed for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stored value for key '{key}' is malformed: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of an explicit [`SessionManager::refresh_token`](crate::SessionManager::refresh_token).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RefreshError {
    #[error("no authenticated session to refresh")]
    NotAuthenticated,

    /// The session changed hands while the refresh was in flight; the new
    /// token was discarded.
    #[error("session identity changed during refresh")]
    IdentityChanged,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to persist refreshed token: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn rejected_exposes_code() {
        let e = ProviderError::Rejected {
            code: "TOO_MANY_ATTEMPTS_TRY_LATER".into(),
            message: "TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled".into(),
        };
        assert_eq!(e.code(), Some("TOO_MANY_ATTEMPTS_TRY_LATER"));
        assert_eq!(
            e.to_string(),
            "identity provider rejected the request: TOO_MANY_ATTEMPTS_TRY_LATER : Access disabled"
        );
    }

    #[test]
    fn other_variants_have_no_code() {
        assert_eq!(ProviderError::NotSignedIn.code(), None);
        assert_eq!(ProviderError::Status(500).code(), None);
        assert_eq!(
            ProviderError::Status(502).to_string(),
            "identity provider returned HTTP 502"
        );
    }

    #[test]
    fn refresh_error_wraps_provider_transparently() {
        let e = RefreshError::from(ProviderError::Transport("identity provider transport error: reset".into()));
        assert_eq!(e.to_string(), "identity provider transport error: reset");
    }
}
