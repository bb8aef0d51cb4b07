pub mod sdk;

pub use sdk::config::{MapsConfig, SessionOptions};
pub use sdk::error::NavigationError;
pub use sdk::feed::{FeedSource, Marker, MarkerFeed, MarkerKind, MockFeed};
pub use sdk::geo::Coordinate;
pub use sdk::location::{LocationProvider, SimulatedLocationProvider};
pub use sdk::routing::{DirectionsProvider, GoogleMapsProvider, PlaceCandidate, PlacesProvider, RouteSummary};
pub use sdk::session::{Destination, NavigationSession, SessionSnapshot, SessionState, ViewportCommand};
