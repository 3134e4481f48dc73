use serde::Deserialize;
use thiserror::Error;

/// Every failure the client can report.
///
/// The type is `Clone` so that results can travel inside UI events and be
/// rendered more than once.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Local configuration is missing something a request needs.
    #[error("configuration error: {0}")]
    Config(String),
    /// The long-lived secret could not be read.
    #[error("secret unavailable: {0}")]
    Secret(String),
    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("transport error: {0}")]
    Transport(String),
    /// The server answered with a non-success status.
    #[error("{}", status_message(.status, .code.as_deref(), .message.as_deref()))]
    Status {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },
    /// The response body did not match the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401, .. })
    }

    /// Builds a [`ApiError::Status`] from a raw response, keeping whatever the
    /// server said about the failure.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let parsed = serde_json::from_slice::<ErrorBody>(body).ok();
        let (code, message) = match parsed {
            Some(b) => (b.code, b.message.or(b.error)),
            None => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                (None, (!text.is_empty()).then_some(text))
            }
        };
        ApiError::Status {
            status,
            code,
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn status_message(status: &u16, code: Option<&str>, message: Option<&str>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => format!("HTTP {status} [{code}]: {message}"),
        (None, Some(message)) => format!("HTTP {status}: {message}"),
        (Some(code), None) => format!("HTTP {status} [{code}]"),
        (None, None) => format!("HTTP {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_error_body_is_preserved() {
        let err = ApiError::from_status(400, br#"{"code":"INVALID_QTY","message":"quantity too small"}"#);
        assert_eq!(
            err,
            ApiError::Status {
                status: 400,
                code: Some("INVALID_QTY".into()),
                message: Some("quantity too small".into()),
            }
        );
        assert_eq!(err.to_string(), "HTTP 400 [INVALID_QTY]: quantity too small");
    }

    #[test]
    fn plain_text_body_becomes_message() {
        let err = ApiError::from_status(502, b"Bad Gateway\n");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn empty_body_only_shows_status() {
        let err = ApiError::from_status(401, b"");
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "HTTP 401");
    }
}
