// ── Core error types ──
//
// User-facing errors from carewatch-core. Consumers never see raw HTTP
// or WebSocket failures; `From<carewatch_api::Error>` translates them
// into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Alert not found: {id}")]
    AlertNotFound { id: String },

    #[error("Operation rejected by server: {message}")]
    Rejected { message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<carewatch_api::Error> for CoreError {
    fn from(err: carewatch_api::Error) -> Self {
        match err {
            carewatch_api::Error::Http(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_ms: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            carewatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            carewatch_api::Error::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            carewatch_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            carewatch_api::Error::Rejected { message } => CoreError::Rejected { message },
            carewatch_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason,
            },
            carewatch_api::Error::WebSocket(reason) => CoreError::Api {
                message: format!("WebSocket error: {reason}"),
                status: None,
            },
            carewatch_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_is_preserved() {
        let err: CoreError = carewatch_api::Error::Api {
            status: 503,
            message: "busy".into(),
        }
        .into();
        assert!(matches!(
            err,
            CoreError::Api {
                status: Some(503),
                ..
            }
        ));
    }

    #[test]
    fn rejection_keeps_server_message() {
        let err: CoreError = carewatch_api::Error::Rejected {
            message: "already acknowledged".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Operation rejected by server: already acknowledged"
        );
    }
}
