use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the shortener API.
///
/// Transport failures, HTTP error statuses and unreadable bodies stay distinct so
/// callers can decide what to do (`Unauthenticated` and `Forbidden` mean the
/// session is gone, see [`ApiError::invalidates_session`]).
///
/// Every 4xx variant keeps the server's own message when the body carried one.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authenticated")]
    Unauthenticated { message: Option<String> },

    #[error("forbidden")]
    Forbidden { message: Option<String> },

    #[error("not found")]
    NotFound { message: Option<String> },

    #[error("request rejected ({status})")]
    Rejected {
        status: u16,
        message: Option<String>,
    },

    #[error("upstream server error ({status})")]
    ServerError { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response body: {0}")]
    MalformedBody(String),
}

impl ApiError {
    /// Classify a non-success status, pulling a human message out of the body when present
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            401 => ApiError::Unauthenticated {
                message: extract_message(body),
            },
            403 => ApiError::Forbidden {
                message: extract_message(body),
            },
            404 => ApiError::NotFound {
                message: extract_message(body),
            },
            code @ 400..=499 => ApiError::Rejected {
                status: code,
                message: extract_message(body),
            },
            code => ApiError::ServerError { status: code },
        }
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated { .. } => "unauthenticated",
            ApiError::Forbidden { .. } => "forbidden",
            ApiError::NotFound { .. } => "not_found",
            ApiError::Rejected { .. } => "rejected",
            ApiError::ServerError { .. } => "server_error",
            ApiError::Network(_) => "network_error",
            ApiError::MalformedBody(_) => "malformed_body",
        }
    }

    /// True when the stored token should be dropped
    pub fn invalidates_session(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthenticated { .. } | ApiError::Forbidden { .. }
        )
    }

    /// The server's own wording, for any 4xx that carried one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthenticated { message }
            | ApiError::Forbidden { message }
            | ApiError::NotFound { message }
            | ApiError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Message for the user: the server's own wording when present, else the fallback
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message().unwrap_or(fallback).to_string()
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::MalformedBody(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Find the first human-readable message in an error body.
///
/// Accepts `{"message": ..}`, `{"detail": ..}`, `{"error": ..}` and
/// field-error maps such as `{"slug": ["already taken"]}`.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;

    for key in ["message", "detail", "error"] {
        if let Some(text) = object.get(key).and_then(|v| v.as_str()) {
            if !text.trim().is_empty() {
                return Some(text.to_string());
            }
        }
    }

    object.values().find_map(|v| {
        v.as_array()
            .and_then(|items| items.first())
            .and_then(|first| first.as_str())
            .map(str::to_string)
    })
}
