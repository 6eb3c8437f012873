//! Firebase Authentication over its public REST API.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rollcall_http::{HttpClient, HttpClientBuilder, HttpClientConfig, HttpError, HttpResponse};
use rollcall_utils::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use url::Url;

use crate::error::ProviderError;
use crate::http_error::format_http_error;
use crate::provider::{AuthStateChange, IdentityProvider};
use crate::types::Identity;

pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

/// Lifetime assumed when the provider omits `expiresIn`
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);
/// A cached token this close to expiry is refreshed before use
const EXPIRY_MARGIN: Duration = Duration::from_secs(5 * 60);
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    /// Web API key of the Firebase project
    pub api_key: SecretString,
    pub identity_url: Url,
    pub token_url: Url,
    pub http_config: HttpClientConfig,
}

impl FirebaseConfig {
    /// Configuration for the public Google endpoints.
    ///
    /// # Errors
    /// Never fails for the built-in URLs; the `Result` covers custom ones.
    pub fn new(api_key: SecretString) -> Result<Self, url::ParseError> {
        Ok(Self {
            api_key,
            identity_url: Url::parse(DEFAULT_IDENTITY_URL)?,
            token_url: Url::parse(DEFAULT_TOKEN_URL)?,
            http_config: HttpClientConfig::default(),
        })
    }
}

/// Provider-side session: what Firebase's client SDK keeps for the current user.
struct ProviderSession {
    identity: Identity,
    id_token: SecretString,
    refresh_token: SecretString,
    expires_at: Instant,
}

/// [`IdentityProvider`] backed by Firebase Authentication.
///
/// The refresh token lives only in memory, so after a restart a hydrated
/// session cannot be refreshed until the user signs in again.
pub struct FirebaseProvider {
    client: HttpClient,
    config: FirebaseConfig,
    session: Mutex<Option<ProviderSession>>,
    events: broadcast::Sender<AuthStateChange>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    photo_url: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}

/// The token endpoint answers in snake_case, unlike the identity toolkit
#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseProvider {
    /// # Errors
    /// Returns `ProviderError::Transport` if the HTTP client cannot be built.
    pub fn new(config: FirebaseConfig) -> Result<Self, ProviderError> {
        let client = HttpClientBuilder::with_config(config.http_config.clone())
            .build()
            .map_err(|e| ProviderError::Transport(format_http_error(&e, "identity provider")))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            client,
            config,
            session: Mutex::new(None),
            events,
        })
    }

    /// `{base}/{method}?key=<api key>`
    fn endpoint(&self, base: &Url, method: &str) -> Url {
        let mut url = base.clone();
        let path = format!("{}/{method}", url.path().trim_end_matches('/'));
        url.set_path(&path);
        url.query_pairs_mut()
            .append_pair("key", self.config.api_key.expose());
        url
    }

    async fn lookup(&self, id_token: &SecretString) -> Result<LookupUser, ProviderError> {
        let url = self.endpoint(&self.config.identity_url, "accounts:lookup");
        let body = serde_json::json!({ "idToken": id_token.expose() });
        let response = send(self.client.post(url.as_str()).json(&body)).await?;
        let lookup: LookupResponse = parse(response).await?;
        lookup
            .users
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("lookup returned no users".to_owned()))
    }

    async fn exchange_refresh_token(
        &self,
        refresh_token: &SecretString,
    ) -> Result<RefreshResponse, ProviderError> {
        let url = self.endpoint(&self.config.token_url, "token");
        let request = self
            .client
            .post(url.as_str())
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token.expose())]);
        let response = send(request).await?;
        parse(response).await
    }
}

#[async_trait]
impl IdentityProvider for FirebaseProvider {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError> {
        let url = self.endpoint(&self.config.identity_url, "accounts:signInWithPassword");
        let body = SignInRequest {
            email,
            password: password.expose(),
            return_secure_token: true,
        };
        let response = send(self.client.post(url.as_str()).json(&body)).await?;
        let signed_in: SignInResponse = parse(response).await?;

        let id_token = SecretString::new(signed_in.id_token);
        // The sign-in response lacks the verification flag and photo
        let profile = match self.lookup(&id_token).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "profile lookup failed after sign-in");
                None
            }
        };

        let identity = Identity {
            uid: signed_in.local_id,
            email: signed_in.email.or_else(|| Some(email.to_owned())),
            display_name: signed_in
                .display_name
                .filter(|name| !name.is_empty())
                .or_else(|| profile.as_ref().and_then(|p| p.display_name.clone())),
            photo_url: profile.as_ref().and_then(|p| p.photo_url.clone()),
            email_verified: profile.as_ref().is_some_and(|p| p.email_verified),
        };

        *self.session.lock() = Some(ProviderSession {
            identity: identity.clone(),
            id_token: id_token.clone(),
            refresh_token: SecretString::new(signed_in.refresh_token),
            expires_at: Instant::now() + ttl(signed_in.expires_in.as_deref()),
        });

        // No receivers is fine
        let _ = self.events.send(AuthStateChange::SignedIn {
            identity: identity.clone(),
            id_token,
        });
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let had_session = self.session.lock().take().is_some();
        if had_session {
            let _ = self.events.send(AuthStateChange::SignedOut);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.events.subscribe()
    }

    async fn id_token(&self, force_refresh: bool) -> Result<SecretString, ProviderError> {
        let (uid, refresh_token) = {
            let guard = self.session.lock();
            let session = guard.as_ref().ok_or(ProviderError::NotSignedIn)?;
            if !force_refresh && Instant::now() + EXPIRY_MARGIN < session.expires_at {
                return Ok(session.id_token.clone());
            }
            (session.identity.uid.clone(), session.refresh_token.clone())
        };

        let refreshed = self.exchange_refresh_token(&refresh_token).await?;
        let id_token = SecretString::new(refreshed.id_token);

        let mut guard = self.session.lock();
        if let Some(session) = guard.as_mut()
            && session.identity.uid == uid
        {
            session.id_token = id_token.clone();
            session.refresh_token = SecretString::new(refreshed.refresh_token);
            session.expires_at = Instant::now() + ttl(refreshed.expires_in.as_deref());
        }
        Ok(id_token)
    }
}

fn ttl(expires_in: Option<&str>) -> Duration {
    expires_in
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map_or(DEFAULT_TOKEN_TTL, Duration::from_secs)
}

async fn send(
    request: Result<rollcall_http::RequestBuilder, HttpError>,
) -> Result<HttpResponse, ProviderError> {
    let transport = |e: HttpError| ProviderError::Transport(format_http_error(&e, "identity provider"));
    request.map_err(transport)?.send().await.map_err(transport)
}

/// Decode a success body, or turn an error body into `ProviderError`.
async fn parse<T: serde::de::DeserializeOwned>(response: HttpResponse) -> Result<T, ProviderError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| ProviderError::Transport(format_http_error(&e, "identity provider")))?;

    if !status.is_success() {
        return Err(rejection(status.as_u16(), &body));
    }
    serde_json::from_slice(&body).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}

/// Firebase reports failures as `{"error": {"message": "CODE : detail"}}`.
fn rejection(status: u16, body: &[u8]) -> ProviderError {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope.error.message;
            let code = message
                .split(" : ")
                .next()
                .unwrap_or_default()
                .trim()
                .to_owned();
            ProviderError::Rejected { code, message }
        }
        Err(_) => ProviderError::Status(status),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn provider(server: &MockServer) -> FirebaseProvider {
        let config = FirebaseConfig {
            api_key: SecretString::new("test-key"),
            identity_url: Url::parse(&server.url("/v1")).unwrap(),
            token_url: Url::parse(&server.url("/secure/v1")).unwrap(),
            http_config: HttpClientConfig::for_testing(),
        };
        FirebaseProvider::new(config).unwrap()
    }

    fn mock_sign_in(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/accounts:signInWithPassword")
                .query_param("key", "test-key")
                .json_body(json!({
                    "email": "ana@example.com",
                    "password": "pw",
                    "returnSecureToken": true
                }));
            then.status(200).json_body(json!({
                "localId": "uid-1",
                "email": "ana@example.com",
                "displayName": "",
                "idToken": "id-1",
                "refreshToken": "refresh-1",
                "expiresIn": "3600",
                "registered": true
            }));
        })
    }

    fn mock_lookup(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1/accounts:lookup")
                .json_body(json!({"idToken": "id-1"}));
            then.status(200).json_body(json!({
                "users": [{
                    "localId": "uid-1",
                    "emailVerified": true,
                    "photoUrl": "https://example.com/a.png",
                    "displayName": "Ana"
                }]
            }));
        })
    }

    #[tokio::test]
    async fn sign_in_builds_identity_and_announces_it() {
        let server = MockServer::start();
        let sign_in = mock_sign_in(&server);
        let lookup = mock_lookup(&server);
        let provider = provider(&server);
        let mut events = provider.subscribe();

        let identity = provider
            .sign_in_with_password("ana@example.com", &SecretString::new("pw"))
            .await
            .unwrap();

        sign_in.assert();
        lookup.assert();
        assert_eq!(identity.uid, "uid-1");
        assert_eq!(identity.display_name.as_deref(), Some("Ana"));
        assert_eq!(identity.photo_url.as_deref(), Some("https://example.com/a.png"));
        assert!(identity.email_verified);

        match events.recv().await.unwrap() {
            AuthStateChange::SignedIn { identity, id_token } => {
                assert_eq!(identity.uid, "uid-1");
                assert_eq!(id_token.expose(), "id-1");
            }
            AuthStateChange::SignedOut => panic!("expected sign-in"),
        }

        // Fresh token is served from cache
        assert_eq!(provider.id_token(false).await.unwrap().expose(), "id-1");
    }

    #[tokio::test]
    async fn rejected_credentials_carry_code() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(400).json_body(json!({
                "error": {
                    "code": 400,
                    "message": "INVALID_LOGIN_CREDENTIALS",
                    "errors": [{"message": "INVALID_LOGIN_CREDENTIALS", "reason": "invalid"}]
                }
            }));
        });
        let provider = provider(&server);

        let err = provider
            .sign_in_with_password("ana@example.com", &SecretString::new("wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("INVALID_LOGIN_CREDENTIALS"));
    }

    #[tokio::test]
    async fn too_many_attempts_code_is_split_from_detail() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(400).json_body(json!({
                "error": {
                    "code": 400,
                    "message": "TOO_MANY_ATTEMPTS_TRY_LATER : Access to this account has been temporarily disabled."
                }
            }));
        });
        let provider = provider(&server);

        let err = provider
            .sign_in_with_password("ana@example.com", &SecretString::new("pw"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("TOO_MANY_ATTEMPTS_TRY_LATER"));
    }

    #[tokio::test]
    async fn unreadable_error_body_keeps_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/accounts:signInWithPassword");
            then.status(503).body("<html>unavailable</html>");
        });
        let provider = provider(&server);

        let err = provider
            .sign_in_with_password("ana@example.com", &SecretString::new("pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Status(503)));
    }

    #[tokio::test]
    async fn forced_refresh_uses_token_endpoint() {
        let server = MockServer::start();
        mock_sign_in(&server);
        mock_lookup(&server);
        let refresh = server.mock(|when, then| {
            when.method(POST)
                .path("/secure/v1/token")
                .query_param("key", "test-key")
                .header("content-type", "application/x-www-form-urlencoded")
                .body("grant_type=refresh_token&refresh_token=refresh-1");
            then.status(200).json_body(json!({
                "id_token": "id-2",
                "refresh_token": "refresh-2",
                "expires_in": "3600",
                "token_type": "Bearer",
                "user_id": "uid-1"
            }));
        });
        let provider = provider(&server);
        provider
            .sign_in_with_password("ana@example.com", &SecretString::new("pw"))
            .await
            .unwrap();

        let token = provider.id_token(true).await.unwrap();
        assert_eq!(token.expose(), "id-2");
        refresh.assert();
        assert_eq!(provider.id_token(false).await.unwrap().expose(), "id-2");
    }

    #[tokio::test]
    async fn id_token_without_session_fails() {
        let server = MockServer::start();
        let provider = provider(&server);
        assert!(matches!(
            provider.id_token(true).await,
            Err(ProviderError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn sign_out_announces_only_when_signed_in() {
        let server = MockServer::start();
        mock_sign_in(&server);
        mock_lookup(&server);
        let provider = provider(&server);
        let mut events = provider.subscribe();

        provider.sign_out().await.unwrap();
        assert!(events.try_recv().is_err());

        provider
            .sign_in_with_password("ana@example.com", &SecretString::new("pw"))
            .await
            .unwrap();
        provider.sign_out().await.unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            AuthStateChange::SignedIn { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            AuthStateChange::SignedOut
        ));
        assert!(matches!(
            provider.id_token(false).await,
            Err(ProviderError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn unreachable_provider_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = FirebaseConfig {
            api_key: SecretString::new("test-key"),
            identity_url: Url::parse(&format!("http://127.0.0.1:{port}/v1")).unwrap(),
            token_url: Url::parse(&format!("http://127.0.0.1:{port}/v1")).unwrap(),
            http_config: HttpClientConfig::for_testing(),
        };
        let provider = FirebaseProvider::new(config).unwrap();

        let err = provider
            .sign_in_with_password("ana@example.com", &SecretString::new("pw"))
            .await
            .unwrap_err();
        match err {
            ProviderError::Transport(msg) => {
                assert!(msg.starts_with("identity provider"));
                assert!(!msg.contains("test-key"));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn ttl_parsing() {
        assert_eq!(ttl(Some("120")), Duration::from_secs(120));
        assert_eq!(ttl(Some("junk")), DEFAULT_TOKEN_TTL);
        assert_eq!(ttl(None), DEFAULT_TOKEN_TTL);
    }

    #[tokio::test]
    async fn endpoint_appends_method_and_key() {
        let config = FirebaseConfig::new(SecretString::new("k")).unwrap();
        let (events, _) = broadcast::channel(1);
        let provider = FirebaseProvider {
            client: HttpClient::builder().build().unwrap(),
            config,
            session: Mutex::new(None),
            events,
        };
        let url = provider.endpoint(&provider.config.identity_url, "accounts:lookup");
        assert_eq!(
            url.as_str(),
            "https://identitytoolkit.googleapis.com/v1/accounts:lookup?key=k"
        );
    }
}
