use http::header::HeaderName;
use tower::ServiceExt;

use crate::layer::BearerAuthLayer;
use crate::token::TokenHandle;

/// Bearer token injection for [`rollcall_http::HttpClientBuilder`].
///
/// ```ignore
/// use rollcall_auth::HttpClientBuilderExt;
///
/// let client = HttpClientBuilder::new()
///     .with_bearer_auth(session.token_handle())
///     .build()?;
/// ```
pub trait HttpClientBuilderExt {
    /// Send `Authorization: Bearer <token>` whenever the handle holds a token.
    #[must_use]
    fn with_bearer_auth(self, token: TokenHandle) -> Self;

    #[must_use]
    fn with_bearer_auth_header(self, token: TokenHandle, header_name: HeaderName) -> Self;
}

impl HttpClientBuilderExt for rollcall_http::HttpClientBuilder {
    fn with_bearer_auth(self, token: TokenHandle) -> Self {
        let layer = BearerAuthLayer::new(token);
        self.with_auth_layer(move |svc| {
            tower::ServiceBuilder::new()
                .layer(layer)
                .service(svc)
                .boxed_clone()
        })
    }

    fn with_bearer_auth_header(self, token: TokenHandle, header_name: HeaderName) -> Self {
        let layer = BearerAuthLayer::with_header_name(token, header_name);
        self.with_auth_layer(move |svc| {
            tower::ServiceBuilder::new()
                .layer(layer)
                .service(svc)
                .boxed_clone()
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use rollcall_utils::SecretString;

    #[tokio::test]
    async fn custom_header_is_sent() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api.php")
                .header("x-api-token", "Bearer tok");
            then.status(200);
        });

        let client = rollcall_http::HttpClientBuilder::new()
            .allow_insecure_http()
            .with_bearer_auth_header(
                TokenHandle::fixed(SecretString::new("tok")),
                HeaderName::from_static("x-api-token"),
            )
            .build()
            .unwrap();

        client.get(&server.url("/api.php")).send().await.unwrap();
        mock.assert();
    }
}
