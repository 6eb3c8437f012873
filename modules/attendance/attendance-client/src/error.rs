use attendance_sdk::ApiError;
use rollcall_http::HttpError;

/// Map a transport-level failure onto the client error taxonomy.
///
/// Unreachable hosts become `NETWORK_ERROR` with status 0, non-2xx replies
/// become `HTTP_ERROR` with their status, and everything else (including
/// undecodable JSON) is `UNKNOWN_ERROR`.
#[must_use]
pub fn classify(err: HttpError) -> ApiError {
    if err.is_unreachable() {
        return ApiError::network(format!(
            "Network error: Unable to connect to the server ({err})"
        ));
    }
    match err {
        HttpError::HttpStatus { status, .. } => {
            ApiError::http(status.as_u16(), status.canonical_reason().unwrap_or(""))
        }
        other => ApiError::unknown(format!("Request failed: {other}")),
    }
}
