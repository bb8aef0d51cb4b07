use crate::sdk::location::LocationError;
use crate::sdk::routing::error::RoutingError;
use serde::Serialize;
use thiserror::Error;

/// Failures as the presentation layer sees them. Provider errors never escape the session raw.
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Guardian Watch needs your location to suggest nearby places.")]
    PermissionDenied,

    #[error("Current location is unavailable.")]
    LocationUnavailable,

    #[error("Place not found.")]
    SearchNotFound,

    #[error("No route to this destination.")]
    RouteUnavailable,

    #[error("Network problem: {0}")]
    NetworkError(String),
}

impl NavigationError {
    pub fn from_search(err: RoutingError) -> Self {
        if err.is_transport() {
            NavigationError::NetworkError(err.to_string())
        } else {
            NavigationError::SearchNotFound
        }
    }

    pub fn from_route(err: RoutingError) -> Self {
        if err.is_transport() {
            NavigationError::NetworkError(err.to_string())
        } else {
            NavigationError::RouteUnavailable
        }
    }

    /// Only a refused permission outlives the auto-dismiss timer.
    pub fn is_persistent(&self) -> bool {
        matches!(self, NavigationError::PermissionDenied)
    }
}

impl From<LocationError> for NavigationError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::PermissionDenied => NavigationError::PermissionDenied,
            LocationError::Unavailable(_) => NavigationError::LocationUnavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_become_network_errors() {
        assert!(matches!(
            NavigationError::from_route(RoutingError::Timeout),
            NavigationError::NetworkError(_)
        ));
        assert!(matches!(
            NavigationError::from_search(RoutingError::RawApiError("502".into())),
            NavigationError::NetworkError(_)
        ));
    }

    #[test]
    fn empty_answers_keep_their_kind() {
        assert_eq!(NavigationError::from_route(RoutingError::NotFound), NavigationError::RouteUnavailable);
        assert_eq!(NavigationError::from_search(RoutingError::NotFound), NavigationError::SearchNotFound);
    }

    #[test]
    fn only_permission_is_persistent() {
        assert!(NavigationError::from(LocationError::PermissionDenied).is_persistent());
        assert!(!NavigationError::from(LocationError::Unavailable("no fix".into())).is_persistent());
        assert_eq!(NavigationError::SearchNotFound.to_string(), "Place not found.");
    }
}
