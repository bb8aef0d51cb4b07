use super::error::RoutingError;
use super::route::RouteSummary;
use crate::sdk::geo::Coordinate;
use async_trait::async_trait;
use serde::Serialize;

/// An autocomplete suggestion. `place_id` is opaque to everything but the provider that issued it.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub label: String,
}

impl PlaceCandidate {
    pub const CURRENT_LOCATION_ID: &'static str = "current-location";

    pub fn new(place_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            place_id: place_id.into(),
            label: label.into(),
        }
    }

    /// Synthetic entry that routes to wherever the user currently is.
    pub fn current_location() -> Self {
        Self::new(Self::CURRENT_LOCATION_ID, "Use Current Location")
    }

    pub fn is_current_location(&self) -> bool {
        self.place_id == Self::CURRENT_LOCATION_ID
    }
}

#[async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Suggests places for a partial query, biased toward `bias` within `radius_m`.
    async fn autocomplete(
        &self,
        query: &str,
        bias: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<PlaceCandidate>, RoutingError>;

    /// Resolves an autocomplete suggestion to its coordinate.
    async fn resolve(&self, place_id: &str) -> Result<Coordinate, RoutingError>;

    /// Geocodes a free-text address.
    async fn geocode(&self, query: &str) -> Result<Coordinate, RoutingError>;

    /// Free-text place search, used when geocoding finds nothing.
    async fn text_search(&self, query: &str) -> Result<Coordinate, RoutingError>;
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Gets a route between two points.
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError>;
}
