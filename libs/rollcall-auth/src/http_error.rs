use rollcall_http::HttpError;

/// Render an [`HttpError`] as a one-line message prefixed with its context.
///
/// `HttpStatus` errors include only the status: response bodies may echo
/// request data and are kept out of messages and logs.
#[must_use]
pub fn format_http_error(e: &HttpError, prefix: &str) -> String {
    match e {
        HttpError::HttpStatus { status, .. } => format!("{prefix} HTTP {status}"),
        HttpError::Json(err) => format!("{prefix} JSON parse failed: {err}"),
        HttpError::Timeout(duration) => format!("{prefix} request timed out after {duration:?}"),
        HttpError::Transport(err) => format!("{prefix} transport error: {err}"),
        HttpError::Tls(err) => format!("{prefix} TLS error: {err}"),
        HttpError::BodyTooLarge { limit, actual } => {
            format!("{prefix} response too large: limit {limit} bytes, got {actual} bytes")
        }
        HttpError::RequestBuild(err) => format!("{prefix} request build failed: {err}"),
        HttpError::InvalidHeaderName(err) => format!("{prefix} invalid header name: {err}"),
        HttpError::InvalidHeaderValue(err) => format!("{prefix} invalid header value: {err}"),
        HttpError::FormEncode(err) => format!("{prefix} form encode error: {err}"),
        HttpError::ServiceClosed => format!("{prefix} service unavailable"),
        // The URL may carry an API key in its query string
        HttpError::InvalidUri { kind, .. } => format!("{prefix} invalid URL ({kind:?})"),
        HttpError::InvalidScheme { scheme, reason } => {
            format!("{prefix} invalid scheme '{scheme}': {reason}")
        }
        _ => format!("{prefix} request failed"),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_excludes_body() {
        let err = HttpError::HttpStatus {
            status: http::StatusCode::INTERNAL_SERVER_ERROR,
            body_preview: "password=hunter2".into(),
            content_type: None,
        };
        let msg = format_http_error(&err, "identity provider");
        assert_eq!(msg, "identity provider HTTP 500 Internal Server Error");
        assert!(!msg.contains("hunter2"));
    }

    #[test]
    fn invalid_uri_excludes_url() {
        let err = HttpError::InvalidUri {
            url: "https://x?key=secret".into(),
            kind: rollcall_http::InvalidUriKind::ParseError,
            reason: "bad".into(),
        };
        assert!(!format_http_error(&err, "CTX").contains("secret"));
    }

    #[test]
    fn prefix_is_applied() {
        for err in [
            HttpError::ServiceClosed,
            HttpError::Timeout(Duration::from_secs(1)),
        ] {
            assert!(format_http_error(&err, "CTX").starts_with("CTX "));
        }
    }
}
