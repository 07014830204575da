use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid index schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid query request: {0}")]
    InvalidRequest(String),

    #[error("Authorization failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Throttled by service: {0}")]
    Throttled(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Request rejected ({status}): {message}")]
    Malformed { status: u16, message: String },

    #[error(
        "Batch rejected: {count} of {total} documents failed ({keys})",
        count = .failed.len(),
        keys = .failed.join(", ")
    )]
    PartialBatch { total: usize, failed: Vec<String> },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ServiceError,
}

#[derive(Deserialize)]
struct ServiceError {
    code: Option<String>,
    message: Option<String>,
}

impl Error {
    /// Maps a non-2xx response from either service onto the taxonomy.
    pub fn from_status(code: u16, body: &str) -> Self {
        let message = service_message(body);
        match code {
            401 | 403 => Error::Auth { status: code, message },
            404 => Error::NotFound(message),
            429 => Error::Throttled(message),
            503 if message.to_ascii_lowercase().contains("throttl") => Error::Throttled(message),
            500..=599 => Error::Transient(format!("server error ({code}): {message}")),
            _ => Error::Malformed { status: code, message },
        }
    }

    /// True for failures a caller could reasonably retry later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Throttled(_) | Error::Transient(_))
    }
}

/// `{"error": {"code", "message"}}` when present, the raw body otherwise.
fn service_message(body: &str) -> String {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    match parsed {
        Some(ServiceError { code: Some(code), message: Some(message) }) => {
            format!("{code}: {message}")
        }
        Some(ServiceError { message: Some(message), .. }) => message,
        _ if body.trim().is_empty() => "no response body".to_string(),
        _ => body.trim().to_string(),
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_status_codes_to_taxonomy() {
        assert!(matches!(Error::from_status(401, ""), Error::Auth { status: 401, .. }));
        assert!(matches!(Error::from_status(403, ""), Error::Auth { status: 403, .. }));
        assert!(matches!(Error::from_status(404, ""), Error::NotFound(_)));
        assert!(matches!(Error::from_status(429, ""), Error::Throttled(_)));
        assert!(matches!(Error::from_status(503, "Request throttled"), Error::Throttled(_)));
        assert!(matches!(Error::from_status(503, ""), Error::Transient(_)));
        assert!(matches!(Error::from_status(502, ""), Error::Transient(_)));
        assert!(Error::from_status(502, "").is_transient());
        assert!(matches!(Error::from_status(400, ""), Error::Malformed { status: 400, .. }));
    }

    #[test]
    fn extracts_service_message() {
        let body = serde_json::json!({"error": {
            "code": "OperationNotAllowed",
            "message": "Existing field 'Rating' cannot be changed."
        }});
        match Error::from_status(400, &body.to_string()) {
            Error::Malformed { message, .. } => {
                assert_eq!(
                    message,
                    "OperationNotAllowed: Existing field 'Rating' cannot be changed."
                );
            }
            other => panic!("unexpected {other:?}"),
        }
        match Error::from_status(404, r#"{"error":{"message":"Resource not found"}}"#) {
            Error::NotFound(message) => assert_eq!(message, "Resource not found"),
            other => panic!("unexpected {other:?}"),
        }
        match Error::from_status(500, "  boom \n") {
            Error::Transient(message) => assert_eq!(message, "server error (500): boom"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn service_message_falls_back_to_body() {
        assert_eq!(service_message("  plain text "), "plain text");
        assert_eq!(service_message(""), "no response body");
    }

    #[test]
    fn partial_batch_names_failed_keys() {
        let err = Error::PartialBatch { total: 3, failed: vec!["2".into(), "3".into()] };
        assert_eq!(err.to_string(), "Batch rejected: 2 of 3 documents failed (2, 3)");
    }
}
