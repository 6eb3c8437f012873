use async_trait::async_trait;
use rollcall_utils::SecretString;
use tokio::sync::broadcast;

use crate::error::ProviderError;
use crate::types::Identity;

/// Change in who the identity provider considers signed in.
#[derive(Debug, Clone)]
pub enum AuthStateChange {
    SignedIn {
        identity: Identity,
        id_token: SecretString,
    },
    SignedOut,
}

/// Hosted identity service consumed by the [`SessionManager`](crate::SessionManager).
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate with email and password.
    ///
    /// A successful sign-in is also announced to subscribers as
    /// [`AuthStateChange::SignedIn`].
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError>;

    /// End the provider-side session and announce [`AuthStateChange::SignedOut`].
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Stream of state changes, starting from the moment of the call.
    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange>;

    /// Current ID token. `force_refresh` bypasses any cached token.
    async fn id_token(&self, force_refresh: bool) -> Result<SecretString, ProviderError>;
}
