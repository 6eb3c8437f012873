#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Authentication session management for rollcall.
//!
//! [`SessionManager`] owns the signed-in identity and its bearer token. It
//! persists both to a [`KeyValueStore`], hydrates them on start, follows the
//! [`IdentityProvider`]'s state changes and refreshes the token on a timer.
//! API clients read the token through a [`TokenHandle`], usually via
//! [`BearerAuthLayer`] installed with [`HttpClientBuilderExt::with_bearer_auth`].

mod builder_ext;
pub mod error;
mod http_error;
mod layer;
pub mod providers;
mod provider;
mod session;
mod store;
mod token;
mod types;

pub use builder_ext::HttpClientBuilderExt;
pub use error::{ProviderError, RefreshError, StoreError};
pub use http_error::format_http_error;
pub use layer::{BearerAuthLayer, BearerAuthService};
pub use provider::{AuthStateChange, IdentityProvider};
pub use session::{SessionConfig, SessionManager, TOKEN_KEY, USER_KEY};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use token::TokenHandle;
pub use types::{Identity, SessionState};
