use std::sync::Arc;

use anyhow::{Context, Result};
use attendance_client::{ApiTransport, AttendanceClient, PeopleClient};
use rollcall_auth::providers::{FirebaseConfig, FirebaseProvider};
use rollcall_auth::{FileStore, HttpClientBuilderExt, SessionConfig, SessionManager, TokenHandle};
use rollcall_http::{HttpClient, HttpClientBuilder, HttpClientConfig, TransportSecurity};
use rollcall_utils::SecretString;
use url::Url;

use crate::config::{ApiConfig, AppConfig, AuthConfig};

/// Everything a command needs: the hydrated session and the API clients
/// that read its token.
pub struct AppContext {
    pub session: Arc<SessionManager>,
    pub people: PeopleClient,
    pub attendance: AttendanceClient,
}

impl AppContext {
    /// Build the session manager, hydrate it from storage and wire the
    /// clients to its token.
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let provider = FirebaseProvider::new(firebase_config(&config.auth, &config.api)?)
            .context("failed to initialize identity provider")?;
        let store = FileStore::new(&config.storage.dir);
        let session = SessionManager::new(
            Arc::new(provider),
            Arc::new(store),
            SessionConfig {
                refresh_interval: config.auth.refresh_interval,
            },
        );
        session.start().await;

        let http = api_http_client(&config.api, session.token_handle())?;
        let base_url = Url::parse(&config.api.base_url)
            .with_context(|| format!("invalid api.base_url '{}'", config.api.base_url))?;
        let transport = ApiTransport::new(http, base_url);

        Ok(Self {
            session,
            people: PeopleClient::new(transport.clone()),
            attendance: AttendanceClient::new(transport),
        })
    }

    /// Stop background session work. Also happens on drop.
    pub fn close(&self) {
        self.session.shutdown();
    }
}

fn api_http_client(api: &ApiConfig, token: TokenHandle) -> Result<HttpClient> {
    let mut builder = HttpClientBuilder::new().user_agent(api.user_agent.clone());
    if let Some(timeout) = api.request_timeout {
        builder = builder.timeout(timeout);
    }
    if api.allow_insecure_http {
        builder = builder.transport(TransportSecurity::AllowInsecureHttp);
    }
    builder
        .with_bearer_auth(token)
        .build()
        .context("failed to build API client")
}

fn firebase_config(auth: &AuthConfig, api: &ApiConfig) -> Result<FirebaseConfig> {
    // Commands other than `login` never call the provider before exiting
    let api_key = auth
        .api_key
        .clone()
        .unwrap_or_else(|| SecretString::new(""));
    let identity_url = Url::parse(&auth.identity_url)
        .with_context(|| format!("invalid auth.identity_url '{}'", auth.identity_url))?;
    let token_url = Url::parse(&auth.token_url)
        .with_context(|| format!("invalid auth.token_url '{}'", auth.token_url))?;

    let plain_http = identity_url.scheme() == "http" || token_url.scheme() == "http";
    let http_config = HttpClientConfig {
        request_timeout: api.request_timeout,
        user_agent: api.user_agent.clone(),
        transport: if plain_http {
            TransportSecurity::AllowInsecureHttp
        } else {
            TransportSecurity::TlsOnly
        },
        ..HttpClientConfig::default()
    };

    Ok(FirebaseConfig {
        api_key,
        identity_url,
        token_url,
        http_config,
    })
}
