// Error types for the HTTP layer.
//
// Every non-success response goes through `classify`, which is the only
// place that knows how status codes map onto error kinds.

use reqwest::StatusCode;
use thiserror::Error;

/// Category of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    TooManyResults,
    TransportFailure,
    Unauthorized,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::TransportFailure, message)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::transport(format!("request failed: {}", err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::transport(format!("i/o error: {}", err))
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Map a non-success response for `target` (a remote path or operation
/// name) to an error. `body` is included for statuses without a
/// dedicated kind.
pub fn classify(status: StatusCode, target: &str, body: &str) -> ApiError {
    let body = body.trim();
    match status.as_u16() {
        401 => ApiError::new(
            ErrorKind::Unauthorized,
            "access token rejected; run `dbox setup` to authorize again",
        ),
        400 | 404 => ApiError::new(ErrorKind::NotFound, format!("{} not found", target)),
        403 | 409 => ApiError::new(
            ErrorKind::Conflict,
            format!("{} conflicts with an existing entry", target),
        ),
        406 => ApiError::new(
            ErrorKind::TooManyResults,
            format!("too many entries to return for {}", target),
        ),
        _ if body.is_empty() => ApiError::transport(format!("{}: {}", target, status)),
        _ => ApiError::transport(format!("{}: {} - {}", target, status, body)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_map_to_kinds() {
        let cases = [
            (401, ErrorKind::Unauthorized),
            (400, ErrorKind::NotFound),
            (404, ErrorKind::NotFound),
            (403, ErrorKind::Conflict),
            (409, ErrorKind::Conflict),
            (406, ErrorKind::TooManyResults),
            (500, ErrorKind::TransportFailure),
            (503, ErrorKind::TransportFailure),
        ];
        for (code, kind) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(classify(status, "/x", "").kind, kind, "status {}", code);
        }
    }

    #[test]
    fn not_found_names_the_target() {
        let err = classify(StatusCode::NOT_FOUND, "/Photos/a.jpg", "");
        assert_eq!(err.to_string(), "/Photos/a.jpg not found");
    }

    #[test]
    fn unknown_status_keeps_body() {
        let err = classify(StatusCode::BAD_GATEWAY, "copy", " upstream down\n");
        assert_eq!(err.kind, ErrorKind::TransportFailure);
        assert_eq!(err.to_string(), "copy: 502 Bad Gateway - upstream down");
    }
}
