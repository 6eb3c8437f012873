#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP client infrastructure for rollcall
//!
//! A hyper-based client assembled from tower layers:
//! - TLS via rustls (HTTPS only unless insecure HTTP is explicitly allowed)
//! - Connection pooling
//! - Optional per-request timeout (none by default)
//! - User-Agent header injection
//! - Transparent response decompression (gzip, brotli, deflate)
//! - A pluggable auth layer, used to attach bearer tokens
//!
//! There are no retries: a failed call is reported once, as-is.
//!
//! # Example
//!
//! ```ignore
//! use rollcall_http::HttpClient;
//!
//! let client = HttpClient::builder()
//!     .user_agent("rollcall/1.0")
//!     .build()?;
//!
//! let people: serde_json::Value = client
//!     .get("https://attendance.example.com/api.php?param=people")
//!     .send()
//!     .await?
//!     .json()
//!     .await?;
//! ```

mod builder;
mod client;
mod config;
mod error;
mod layers;
mod request;
mod response;
mod tls;

pub use builder::{HttpClientBuilder, InnerService};
pub use client::HttpClient;
pub use config::{DEFAULT_USER_AGENT, HttpClientConfig, TlsRootConfig, TransportSecurity};
pub use error::{HttpError, InvalidUriKind};
pub use request::RequestBuilder;
pub use response::{HttpResponse, ResponseBody};
