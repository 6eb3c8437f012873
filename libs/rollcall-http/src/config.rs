use std::time::Duration;

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("rollcall-http/", env!("CARGO_PKG_VERSION"));

/// Default maximum response body size (10 MiB)
const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Transport security mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportSecurity {
    /// Only `https://` URLs are accepted
    #[default]
    TlsOnly,
    /// Plain `http://` URLs are accepted as well.
    ///
    /// Needed for backends that are only reachable over plain HTTP, such as
    /// an attendance server on a local network, and for mock servers in tests.
    AllowInsecureHttp,
}

/// Source of trusted root certificates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsRootConfig {
    /// Mozilla roots compiled into the binary
    #[default]
    WebPki,
    /// Roots from the operating system certificate store
    Native,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout. `None` means a request may wait indefinitely.
    pub request_timeout: Option<Duration>,

    /// User-Agent header value
    pub user_agent: String,

    /// Maximum decompressed response body size in bytes
    pub max_body_size: usize,

    pub transport: TransportSecurity,

    pub tls_roots: TlsRootConfig,

    /// Number of requests that may queue in front of the connection pool
    pub buffer_capacity: usize,

    /// Idle connections are closed after this long. `None` keeps them forever.
    pub pool_idle_timeout: Option<Duration>,

    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::WebPki,
            buffer_capacity: 1024,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpClientConfig {
    /// Configuration for talking to local mock servers in tests.
    ///
    /// Plain HTTP is allowed and requests time out after 5 seconds so a
    /// broken mock cannot hang the test suite.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(5)),
            transport: TransportSecurity::AllowInsecureHttp,
            ..Default::default()
        }
    }
}
