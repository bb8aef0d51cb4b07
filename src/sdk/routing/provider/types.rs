use serde::Deserialize;

// --- Data Structures for parsing Google Maps web-service responses ---

#[derive(Deserialize, Clone, Copy, Debug)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Deserialize, Debug)]
pub struct Geometry {
    pub location: LatLng,
}

/// Shared shape of the geocode and text-search endpoints.
#[derive(Deserialize, Debug)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}
#[derive(Deserialize, Debug)]
pub struct SearchResult {
    pub geometry: Geometry,
}

#[derive(Deserialize, Debug)]
pub struct AutocompleteResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}
#[derive(Deserialize, Debug)]
pub struct Prediction {
    pub place_id: String,
    pub description: String,
}

#[derive(Deserialize, Debug)]
pub struct DetailsResponse {
    pub result: Option<SearchResult>,
}

#[derive(Deserialize, Debug)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub routes: Vec<Route>,
}
#[derive(Deserialize, Debug)]
pub struct Route {
    pub overview_polyline: EncodedPolyline,
    #[serde(default)]
    pub legs: Vec<Leg>,
}
#[derive(Deserialize, Debug)]
pub struct EncodedPolyline {
    pub points: String,
}
#[derive(Deserialize, Debug)]
pub struct Leg {
    pub distance: Measure,
    pub duration: Measure,
    #[serde(default)]
    pub steps: Vec<Step>,
}
#[derive(Deserialize, Debug)]
pub struct Step {
    pub html_instructions: String,
}
#[derive(Deserialize, Clone, Copy, Debug)]
pub struct Measure {
    /// Metres for distances, seconds for durations.
    pub value: f64,
}
