//! Concrete [`IdentityProvider`](crate::IdentityProvider) implementations.

pub mod firebase;

pub use firebase::{FirebaseConfig, FirebaseProvider};
