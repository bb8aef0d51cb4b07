pub mod cache;
pub mod error;
pub mod provider;
pub mod route;
pub mod service;

pub use cache::GeoCache;
pub use error::RoutingError;
pub use provider::GoogleMapsProvider;
pub use route::RouteSummary;
pub use service::{DirectionsProvider, PlaceCandidate, PlacesProvider};
