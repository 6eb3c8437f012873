//! HTTP clients for the attendance backend.
//!
//! The backend dispatches on a `param` query parameter against a single
//! base URL. [`ApiTransport`] owns that URL and the shared
//! [`rollcall_http::HttpClient`]; [`PeopleClient`] and [`AttendanceClient`]
//! implement the `attendance-sdk` traits on top of it.
//!
//! Bearer authentication is configured on the `HttpClient` itself (see
//! `rollcall_auth::HttpClientBuilderExt`), so the clients never touch session
//! state.
//!
//! ```ignore
//! let http = HttpClientBuilder::new().with_bearer_auth(session.token_handle()).build()?;
//! let transport = ApiTransport::new(http, Url::parse("http://localhost/Laborne/api.php")?);
//! let people = PeopleClient::new(transport.clone());
//! ```

#![forbid(unsafe_code)]

mod attendance;
mod error;
mod people;
mod transport;

pub use attendance::AttendanceClient;
pub use error::classify;
pub use people::PeopleClient;
pub use transport::{ApiTransport, DEFAULT_BASE_URL};
