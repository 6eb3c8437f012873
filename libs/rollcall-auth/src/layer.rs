use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::header::{AUTHORIZATION, HeaderName};
use http::{HeaderValue, Request, Response};
use rollcall_http::HttpError;
use tower::{Layer, Service};

use crate::token::TokenHandle;

/// Tower layer that adds `Authorization: Bearer <token>` to outbound requests.
///
/// The token is read from a [`TokenHandle`] on every request, so a refresh
/// takes effect immediately. Requests go out without the header while no
/// token is held.
///
/// ```ignore
/// let token = session.token_handle();
/// let client = HttpClient::builder()
///     .with_auth_layer(move |svc| {
///         BoxCloneService::new(BearerAuthLayer::new(token).layer(svc))
///     })
///     .build()?;
/// ```
#[derive(Clone, Debug)]
pub struct BearerAuthLayer {
    token: TokenHandle,
    header_name: HeaderName,
}

impl BearerAuthLayer {
    #[must_use]
    pub fn new(token: TokenHandle) -> Self {
        Self {
            token,
            header_name: AUTHORIZATION,
        }
    }

    #[must_use]
    pub fn with_header_name(token: TokenHandle, header_name: HeaderName) -> Self {
        Self { token, header_name }
    }
}

impl<S> Layer<S> for BearerAuthLayer {
    type Service = BearerAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService {
            inner,
            token: self.token.clone(),
            header_name: self.header_name.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BearerAuthService<S> {
    inner: S,
    token: TokenHandle,
    header_name: HeaderName,
}

impl<S, B, ResBody> Service<Request<B>> for BearerAuthService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>, Error = HttpError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
    B: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = HttpError;
    type Future = Pin<Box<dyn Future<Output = Result<Response<ResBody>, HttpError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        if let Some(secret) = self.token.get() {
            let raw = zeroize::Zeroizing::new(format!("Bearer {}", secret.expose()));
            let mut value = match HeaderValue::from_str(&raw) {
                Ok(v) => v,
                Err(e) => return Box::pin(async { Err(HttpError::InvalidHeaderValue(e)) }),
            };
            value.set_sensitive(true);
            req.headers_mut().insert(self.header_name.clone(), value);
        }

        // The clone that was driven to readiness handles this call
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move { inner.call(req).await })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;
    use rollcall_utils::SecretString;
    use tower::ServiceExt;

    /// Responds with the received Authorization header, or "<none>"
    #[derive(Clone)]
    struct EchoAuth;

    impl Service<Request<Full<Bytes>>> for EchoAuth {
        type Response = Response<String>;
        type Error = HttpError;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, HttpError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
            let seen = req
                .headers()
                .get(AUTHORIZATION)
                .map(|v| {
                    assert!(v.is_sensitive());
                    v.to_str().unwrap().to_owned()
                })
                .unwrap_or_else(|| "<none>".to_owned());
            Box::pin(async move { Ok(Response::new(seen)) })
        }
    }

    fn request() -> Request<Full<Bytes>> {
        Request::builder()
            .uri("http://localhost/api.php")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn injects_bearer_when_token_present() {
        let svc = BearerAuthLayer::new(TokenHandle::fixed(SecretString::new("tok-1"))).layer(EchoAuth);
        let resp = svc.oneshot(request()).await.unwrap();
        assert_eq!(resp.body(), "Bearer tok-1");
    }

    #[tokio::test]
    async fn omits_header_without_token() {
        let svc = BearerAuthLayer::new(TokenHandle::default()).layer(EchoAuth);
        let resp = svc.oneshot(request()).await.unwrap();
        assert_eq!(resp.body(), "<none>");
    }

    #[tokio::test]
    async fn picks_up_token_changes() {
        let handle = TokenHandle::default();
        let mut svc = BearerAuthLayer::new(handle.clone()).layer(EchoAuth);

        let resp = ServiceExt::<Request<Full<Bytes>>>::ready(&mut svc)
            .await
            .unwrap()
            .call(request()).await.unwrap();
        assert_eq!(resp.body(), "<none>");

        handle.set(Some(SecretString::new("tok-2")));
        let resp = ServiceExt::<Request<Full<Bytes>>>::ready(&mut svc)
            .await
            .unwrap()
            .call(request()).await.unwrap();
        assert_eq!(resp.body(), "Bearer tok-2");
    }

    #[tokio::test]
    async fn custom_header_name() {
        let name = HeaderName::from_static("x-auth");
        let svc = BearerAuthLayer::with_header_name(
            TokenHandle::fixed(SecretString::new("t")),
            name,
        )
        .layer(EchoAuth);
        // EchoAuth only looks at Authorization
        let resp = svc.oneshot(request()).await.unwrap();
        assert_eq!(resp.body(), "<none>");
    }

    #[tokio::test]
    async fn invalid_token_is_rejected() {
        let svc = BearerAuthLayer::new(TokenHandle::fixed(SecretString::new("bad\ntoken")))
            .layer(EchoAuth);
        let err = svc.oneshot(request()).await.unwrap_err();
        assert!(matches!(err, HttpError::InvalidHeaderValue(_)));
    }
}
