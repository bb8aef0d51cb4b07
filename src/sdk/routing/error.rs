use serde::Deserialize;
use thiserror::Error;

// Every Google web-service payload carries a status and, on failure, an error_message
#[derive(Deserialize, Debug)]
pub struct ApiStatus {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("No result for the requested place or route")]
    NotFound,

    // Structured failure reported by the API itself
    #[error("API Error ({status}): {message}")]
    ApiError { status: String, message: String },

    // Non-success HTTP response whose body was not the expected JSON
    #[error("Unstructured API Error: {0}")]
    RawApiError(String),

    #[error("Underlying request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Request timed out")]
    Timeout,
}

impl RoutingError {
    /// Maps a non-OK API status onto an error. `ZERO_RESULTS` and `NOT_FOUND` mean "nothing there".
    pub fn from_status(status: ApiStatus) -> Self {
        match status.status.as_str() {
            "ZERO_RESULTS" | "NOT_FOUND" => RoutingError::NotFound,
            _ => RoutingError::ApiError {
                message: status.error_message.unwrap_or_default(),
                status: status.status,
            },
        }
    }

    /// True when the request never produced an answer from the service.
    pub fn is_transport(&self) -> bool {
        match self {
            RoutingError::RequestError(_) | RoutingError::Timeout | RoutingError::RawApiError(_) => {
                true
            }
            RoutingError::ApiError { status, .. } => {
                status == "OVER_QUERY_LIMIT" || status == "UNKNOWN_ERROR"
            }
            RoutingError::NotFound | RoutingError::ParseError(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(s: &str) -> ApiStatus {
        ApiStatus {
            status: s.to_string(),
            error_message: Some("detail".to_string()),
        }
    }

    #[test]
    fn empty_statuses_become_not_found() {
        assert!(matches!(RoutingError::from_status(status("ZERO_RESULTS")), RoutingError::NotFound));
        assert!(matches!(RoutingError::from_status(status("NOT_FOUND")), RoutingError::NotFound));
    }

    #[test]
    fn denied_request_keeps_status_and_message() {
        match RoutingError::from_status(status("REQUEST_DENIED")) {
            RoutingError::ApiError { status, message } => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message, "detail");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn quota_errors_count_as_transport() {
        assert!(RoutingError::from_status(status("OVER_QUERY_LIMIT")).is_transport());
        assert!(RoutingError::Timeout.is_transport());
        assert!(!RoutingError::NotFound.is_transport());
    }
}
