use crate::client::{BufferedService, map_buffer_error};
use crate::config::TransportSecurity;
use crate::error::{HttpError, InvalidUriKind};
use crate::response::HttpResponse;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Method, Request, Uri};
use http_body_util::Full;
use serde::Serialize;
use tower::{Service, ServiceExt};

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// Encoded body and the content type it is sent with when the caller set none.
struct EncodedBody {
    bytes: Bytes,
    content_type: &'static str,
}

/// Request under construction.
///
/// A bad header is remembered and reported by the next fallible call
/// ([`json`](Self::json), [`form`](Self::form) or [`send`](Self::send)), so
/// headers chain without `?`.
#[must_use = "RequestBuilder does nothing until .send() is called"]
pub struct RequestBuilder {
    service: BufferedService,
    max_body_size: usize,
    transport_security: TransportSecurity,
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<EncodedBody>,
    error: Option<HttpError>,
}

impl RequestBuilder {
    pub(crate) fn new(
        service: BufferedService,
        max_body_size: usize,
        transport_security: TransportSecurity,
        method: Method,
        url: String,
    ) -> Self {
        Self {
            service,
            max_body_size,
            transport_security,
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_none() {
            match parse_header(name, value) {
                Ok((name, value)) => {
                    self.headers.append(name, value);
                }
                Err(e) => self.error = Some(e),
            }
        }
        self
    }

    /// Serialize `body` as the JSON payload.
    ///
    /// # Errors
    /// Returns a pending header error, or `HttpError::Json` if serialization fails.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, HttpError> {
        let bytes = serde_json::to_vec(body).map_err(HttpError::from);
        self.with_body(bytes.map(Bytes::from), JSON)
    }

    /// URL-encode `fields` as the payload.
    ///
    /// # Errors
    /// Returns a pending header error, or `HttpError::FormEncode` if encoding fails.
    pub fn form(self, fields: &[(&str, &str)]) -> Result<Self, HttpError> {
        let encoded = serde_urlencoded::to_string(fields).map_err(HttpError::from);
        self.with_body(encoded.map(Bytes::from), FORM)
    }

    fn with_body(
        mut self,
        bytes: Result<Bytes, HttpError>,
        content_type: &'static str,
    ) -> Result<Self, HttpError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.body = Some(EncodedBody {
            bytes: bytes?,
            content_type,
        });
        Ok(self)
    }

    /// Send the request.
    ///
    /// Resolves to `Ok` for any HTTP status; the caller decides what a
    /// non-2xx status means through [`HttpResponse::error_for_status`] or
    /// [`HttpResponse::json`].
    ///
    /// # Errors
    /// Returns `HttpError` for a bad header or URL, a scheme the transport
    /// mode rejects, transport and TLS failures, and timeouts.
    pub async fn send(mut self) -> Result<HttpResponse, HttpError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        let uri = parse_target(&self.url, self.transport_security)?;

        let body = match self.body {
            Some(body) => {
                if !self.headers.contains_key(CONTENT_TYPE) {
                    self.headers
                        .insert(CONTENT_TYPE, HeaderValue::from_static(body.content_type));
                }
                body.bytes
            }
            None => Bytes::new(),
        };

        let mut request = Request::builder()
            .method(self.method)
            .uri(uri)
            .body(Full::new(body))?;
        *request.headers_mut() = self.headers;

        let inner = ServiceExt::<Request<Full<Bytes>>>::ready(&mut self.service)
            .await
            .map_err(map_buffer_error)?
            .call(request)
            .await
            .map_err(map_buffer_error)?;

        Ok(HttpResponse {
            inner,
            max_body_size: self.max_body_size,
        })
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), HttpError> {
    Ok((HeaderName::try_from(name)?, HeaderValue::try_from(value)?))
}

/// Parse an absolute URL and check its scheme against the transport mode.
fn parse_target(url: &str, transport: TransportSecurity) -> Result<Uri, HttpError> {
    let invalid = |kind, reason: String| HttpError::InvalidUri {
        url: url.to_owned(),
        kind,
        reason,
    };

    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| invalid(InvalidUriKind::ParseError, e.to_string()))?;
    if uri.authority().is_none() {
        return Err(invalid(
            InvalidUriKind::MissingAuthority,
            "missing host/authority".to_owned(),
        ));
    }

    match (uri.scheme_str(), transport) {
        (Some("https"), _) | (Some("http"), TransportSecurity::AllowInsecureHttp) => Ok(uri),
        (Some("http"), TransportSecurity::TlsOnly) => Err(HttpError::InvalidScheme {
            scheme: "http".to_owned(),
            reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
        }),
        (Some(scheme), _) => Err(HttpError::InvalidScheme {
            scheme: scheme.to_owned(),
            reason: "only http:// and https:// schemes are supported".to_owned(),
        }),
        (None, _) => Err(invalid(
            InvalidUriKind::MissingScheme,
            "missing scheme".to_owned(),
        )),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn https_is_always_accepted() {
        let uri = parse_target("https://example.com/api.php?param=people", TransportSecurity::TlsOnly)
            .unwrap();
        assert_eq!(uri.host(), Some("example.com"));
    }

    #[test]
    fn plain_http_depends_on_transport_mode() {
        assert!(parse_target("http://localhost/api.php", TransportSecurity::AllowInsecureHttp).is_ok());
        assert!(matches!(
            parse_target("http://localhost/api.php", TransportSecurity::TlsOnly),
            Err(HttpError::InvalidScheme { .. })
        ));
    }

    #[test]
    fn relative_and_foreign_urls_are_rejected() {
        assert!(matches!(
            parse_target("/api.php", TransportSecurity::AllowInsecureHttp),
            Err(HttpError::InvalidUri {
                kind: InvalidUriKind::MissingAuthority,
                ..
            })
        ));
        assert!(matches!(
            parse_target("ftp://localhost/file", TransportSecurity::AllowInsecureHttp),
            Err(HttpError::InvalidScheme { ref scheme, .. }) if scheme == "ftp"
        ));
    }

    #[test]
    fn bad_header_is_reported() {
        assert!(matches!(
            parse_header("bad header", "x"),
            Err(HttpError::InvalidHeaderName(_))
        ));
        assert!(matches!(
            parse_header("x-token", "line\nbreak"),
            Err(HttpError::InvalidHeaderValue(_))
        ));
    }
}
