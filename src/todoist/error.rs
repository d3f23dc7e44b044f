use thiserror::Error;

/// Failures surfaced by a [`TaskService`](super::TaskService).
///
/// Nothing here is retried; the sync layer hands these straight to the UI.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No credential has been set, so no client exists to talk to.
    #[error("task service not initialized: no API token configured")]
    NotInitialized,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: the API token was rejected")]
    Unauthorized,

    #[error("task service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ServiceError {
    /// Map a non-success HTTP status to the matching variant.
    pub fn from_status(status: u16, what: &str, body: &str) -> Self {
        match status {
            401 | 403 => ServiceError::Unauthorized,
            404 => ServiceError::NotFound(what.to_string()),
            _ => {
                let message = body.trim();
                ServiceError::Api {
                    status,
                    message: if message.is_empty() {
                        "no response body".to_string()
                    } else {
                        message.chars().take(200).collect()
                    },
                }
            }
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(
            ServiceError::from_status(401, "tasks", ""),
            ServiceError::Unauthorized
        ));
        assert!(matches!(
            ServiceError::from_status(403, "tasks", ""),
            ServiceError::Unauthorized
        ));
        match ServiceError::from_status(404, "task 42", "") {
            ServiceError::NotFound(what) => assert_eq!(what, "task 42"),
            other => panic!("unexpected: {other:?}"),
        }
        match ServiceError::from_status(500, "tasks", "  boom \n") {
            ServiceError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_body_gets_placeholder() {
        let err = ServiceError::from_status(502, "projects", "");
        assert_eq!(
            err.to_string(),
            "task service returned 502: no response body"
        );
    }
}
