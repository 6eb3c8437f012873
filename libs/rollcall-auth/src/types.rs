use serde::{Deserialize, Serialize};

/// A signed-in principal as persisted under [`USER_KEY`](crate::USER_KEY).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

/// Lifecycle of a [`SessionManager`](crate::SessionManager).
///
/// ```text
/// Loading -> Unauthenticated -> Authenticating -> Authenticated <-> Refreshing
///                  ^                                   |
///                  +------------- sign out ------------+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Storage has not been read yet
    Loading,
    Unauthenticated,
    /// A password sign-in is in flight
    Authenticating,
    Authenticated(Identity),
    /// A forced token refresh is in flight; the session stays usable
    Refreshing(Identity),
}

impl SessionState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(
            self,
            SessionState::Authenticated(_) | SessionState::Refreshing(_)
        )
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(identity) | SessionState::Refreshing(identity) => {
                Some(identity)
            }
            _ => None,
        }
    }
}
