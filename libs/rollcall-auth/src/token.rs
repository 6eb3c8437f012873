use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use rollcall_utils::SecretString;

/// Read-only view of the session's current bearer token.
///
/// Reads are lock-free. Only the [`SessionManager`](crate::SessionManager)
/// that handed out the handle can change the token.
#[derive(Clone, Default)]
pub struct TokenHandle {
    inner: Arc<ArcSwapOption<SecretString>>,
}

impl fmt::Debug for TokenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenHandle")
            .field("present", &self.is_present())
            .finish()
    }
}

impl TokenHandle {
    /// A handle that always yields `token`, for callers that obtained a
    /// token outside of a session.
    #[must_use]
    pub fn fixed(token: SecretString) -> Self {
        let handle = Self::default();
        handle.set(Some(token));
        handle
    }

    /// Current token, if a session holds one.
    #[must_use]
    pub fn get(&self) -> Option<SecretString> {
        self.inner.load_full().map(|token| (*token).clone())
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.inner.load().is_some()
    }

    pub(crate) fn set(&self, token: Option<SecretString>) {
        self.inner.store(token.map(Arc::new));
    }
}
