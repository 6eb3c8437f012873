use attendance_sdk::ApiError;
use http::StatusCode;
use rollcall_http::{HttpClient, HttpError, HttpResponse, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::classify;

/// Backend location used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost/Laborne/api.php";

const JSON: &str = "application/json";

/// Shared request wrapper for the attendance backend.
///
/// Every request carries `Content-Type: application/json`. Failures come
/// back already classified as [`ApiError`]. Cloning shares the underlying
/// connection pool.
#[derive(Clone)]
pub struct ApiTransport {
    http: HttpClient,
    base_url: Url,
}

/// A 2xx reply whose body the caller wants to inspect before parsing.
#[derive(Debug)]
pub(crate) struct TextReply {
    pub(crate) status: StatusCode,
    pub(crate) body: String,
}

impl ApiTransport {
    #[must_use]
    pub fn new(http: HttpClient, base_url: Url) -> Self {
        Self { http, base_url }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `base_url?param=<param>&<extra...>`, keeping any query the base
    /// URL already carries.
    pub(crate) fn endpoint(&self, param: &str, extra: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("param", param);
            for (key, value) in extra {
                query.append_pair(key, value);
            }
        }
        url
    }

    /// GET `url` and decode the body as JSON.
    ///
    /// # Errors
    /// `NETWORK_ERROR`, `HTTP_ERROR`, or `UNKNOWN_ERROR` for bodies that are
    /// not JSON.
    pub(crate) async fn get_json(&self, url: &Url) -> Result<Value, ApiError> {
        let response = send(self.http.get(url.as_str()).header("content-type", JSON)).await?;
        response.json().await.map_err(classify)
    }

    /// POST `body` as JSON and decode the reply as JSON.
    ///
    /// # Errors
    /// Same as [`get_json`](Self::get_json).
    pub(crate) async fn post_json<B>(&self, url: &Url, body: &B) -> Result<Value, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.http.post(url.as_str()).json(body).map_err(classify)?;
        let response = send(request).await?;
        response.json().await.map_err(classify)
    }

    /// POST `body` as JSON and return the raw reply text.
    ///
    /// Only the status is checked; the caller decides how lenient to be
    /// about the body.
    pub(crate) async fn post_for_text<B>(&self, url: &Url, body: &B) -> Result<TextReply, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let request = self.http.post(url.as_str()).json(body).map_err(classify)?;
        let response = send(request)
            .await?
            .error_for_status()
            .map_err(classify)?;
        let status = response.status();
        let body = response.text_lossy().await.map_err(classify)?;
        Ok(TextReply { status, body })
    }
}

async fn send(request: RequestBuilder) -> Result<HttpResponse, ApiError> {
    request.send().await.map_err(|e: HttpError| {
        tracing::debug!(error = %e, "attendance backend request failed");
        classify(e)
    })
}
