use crate::sdk::feed::Marker;
use crate::sdk::geo::Coordinate;
use crate::sdk::notice::Notice;
use crate::sdk::routing::route::RouteSummary;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No fix yet, or location permission refused.
    #[default]
    AwaitingLocation,
    Idle,
    /// Destination chosen, no route committed.
    Previewing,
    Navigating,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Destination {
    pub coordinate: Coordinate,
    pub label: String,
}

/// Camera requests for the map view. Not part of the state machine.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub enum ViewportCommand {
    FitToRoute { coordinates: Vec<Coordinate> },
    CenterOn(Coordinate),
}

/// Everything the presentation layer renders, captured at one instant.
#[derive(Serialize, Debug, Clone)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub origin: Option<Coordinate>,
    pub destination: Option<Destination>,
    pub route: Option<RouteSummary>,
    /// ETA card text while navigating.
    pub headline: Option<String>,
    /// Empty unless step display is enabled.
    pub steps: Vec<String>,
    pub searching: bool,
    pub routing: bool,
    pub follow: bool,
    pub markers: Vec<Marker>,
    pub notices: Vec<Notice>,
}
