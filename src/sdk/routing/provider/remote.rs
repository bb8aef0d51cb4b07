use super::types::{
    AutocompleteResponse, DetailsResponse, DirectionsResponse, LatLng, SearchResponse,
};
use crate::sdk::config::MapsConfig;
use crate::sdk::geo::Coordinate;
use crate::sdk::routing::error::{ApiStatus, RoutingError};
use crate::sdk::routing::route::{clean_instruction, decode_polyline, RouteSummary};
use crate::sdk::routing::service::{DirectionsProvider, PlaceCandidate, PlacesProvider};
use crate::sdk::util::rate_limit::{maps_limiter, Limiter};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

pub struct GoogleMapsProvider {
    client: Client,
    api_key: String,
    base_url: String,
    limiter: Limiter,
}

impl GoogleMapsProvider {
    pub fn new(config: &MapsConfig) -> Result<Self, RoutingError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            limiter: maps_limiter(config.requests_per_minute),
        })
    }

    /// GETs `path` and returns the raw body once the API reports `OK`.
    async fn fetch(&self, path: &str, params: &[(&str, String)]) -> Result<String, RoutingError> {
        self.limiter.until_ready().await;
        let url = format!("{}{}", self.base_url, path);
        log::debug!("[PROVIDER] GET {} {:?}", path, params);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                log::error!("Failed to send request. URL: {}\nError: {}", url, e);
                if e.is_timeout() {
                    RoutingError::Timeout
                } else {
                    RoutingError::RequestError(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await?;
        check_body(status.is_success(), &text).map_err(|e| {
            log::error!("API call failed. URL: {}\nStatus: {}. Error: {}", url, status, e);
            e
        })?;
        Ok(text)
    }
}

/// Rejects transport failures and non-`OK` API statuses.
fn check_body(http_ok: bool, text: &str) -> Result<(), RoutingError> {
    match serde_json::from_str::<ApiStatus>(text) {
        Ok(status) if status.status != "OK" => Err(RoutingError::from_status(status)),
        Ok(_) if http_ok => Ok(()),
        Err(e) if http_ok => Err(RoutingError::ParseError(e)),
        _ => Err(RoutingError::RawApiError(text.to_string())),
    }
}

fn parse<T: DeserializeOwned>(text: &str) -> Result<T, RoutingError> {
    check_body(true, text)?;
    Ok(serde_json::from_str(text)?)
}

fn to_coordinate(loc: LatLng) -> Coordinate {
    Coordinate::new(loc.lat, loc.lng)
}

pub(crate) fn parse_search(text: &str) -> Result<Coordinate, RoutingError> {
    let resp: SearchResponse = parse(text)?;
    resp.results
        .first()
        .map(|r| to_coordinate(r.geometry.location))
        .ok_or(RoutingError::NotFound)
}

pub(crate) fn parse_autocomplete(text: &str) -> Result<Vec<PlaceCandidate>, RoutingError> {
    let resp: AutocompleteResponse = match parse(text) {
        Err(RoutingError::NotFound) => return Ok(Vec::new()),
        other => other?,
    };
    Ok(resp
        .predictions
        .into_iter()
        .map(|p| PlaceCandidate::new(p.place_id, p.description))
        .collect())
}

pub(crate) fn parse_details(text: &str) -> Result<Coordinate, RoutingError> {
    let resp: DetailsResponse = parse(text)?;
    resp.result
        .map(|r| to_coordinate(r.geometry.location))
        .ok_or(RoutingError::NotFound)
}

pub(crate) fn parse_directions(text: &str) -> Result<RouteSummary, RoutingError> {
    let resp: DirectionsResponse = parse(text)?;
    let route = resp.routes.into_iter().next().ok_or(RoutingError::NotFound)?;

    let polyline = decode_polyline(&route.overview_polyline.points).ok_or_else(|| {
        RoutingError::RawApiError(format!(
            "Malformed overview polyline: {}",
            route.overview_polyline.points
        ))
    })?;
    let meters: f64 = route.legs.iter().map(|leg| leg.distance.value).sum();
    let seconds: f64 = route.legs.iter().map(|leg| leg.duration.value).sum();
    let steps = route
        .legs
        .iter()
        .flat_map(|leg| leg.steps.iter())
        .map(|step| clean_instruction(&step.html_instructions))
        .collect();

    Ok(RouteSummary {
        distance_km: meters / 1000.0,
        eta_minutes: seconds / 60.0,
        steps,
        polyline,
    })
}

#[async_trait]
impl PlacesProvider for GoogleMapsProvider {
    async fn autocomplete(
        &self,
        query: &str,
        bias: Coordinate,
        radius_m: u32,
    ) -> Result<Vec<PlaceCandidate>, RoutingError> {
        let text = match self
            .fetch(
                "/maps/api/place/autocomplete/json",
                &[
                    ("input", query.to_string()),
                    ("location", bias.to_string()),
                    ("radius", radius_m.to_string()),
                    ("language", "en".to_string()),
                ],
            )
            .await
        {
            Err(RoutingError::NotFound) => return Ok(Vec::new()),
            other => other?,
        };
        parse_autocomplete(&text)
    }

    async fn resolve(&self, place_id: &str) -> Result<Coordinate, RoutingError> {
        let text = self
            .fetch(
                "/maps/api/place/details/json",
                &[
                    ("place_id", place_id.to_string()),
                    ("fields", "geometry".to_string()),
                ],
            )
            .await?;
        parse_details(&text)
    }

    async fn geocode(&self, query: &str) -> Result<Coordinate, RoutingError> {
        log::debug!("[PROVIDER] Calling geocode for query: \"{}\"", query);
        let text = self
            .fetch("/maps/api/geocode/json", &[("address", query.to_string())])
            .await?;
        parse_search(&text)
    }

    async fn text_search(&self, query: &str) -> Result<Coordinate, RoutingError> {
        log::debug!("[PROVIDER] Calling text search for query: \"{}\"", query);
        let text = self
            .fetch("/maps/api/place/textsearch/json", &[("query", query.to_string())])
            .await?;
        parse_search(&text)
    }
}

#[async_trait]
impl DirectionsProvider for GoogleMapsProvider {
    async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError> {
        if origin == destination {
            log::debug!("Start and end coordinates are identical. Returning zero route.");
            return Ok(RouteSummary::zero(origin));
        }

        log::debug!(
            "[PROVIDER] Calling directions for {} -> {}",
            origin,
            destination
        );
        let text = self
            .fetch(
                "/maps/api/directions/json",
                &[
                    ("origin", origin.to_string()),
                    ("destination", destination.to_string()),
                ],
            )
            .await?;
        parse_directions(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTIONS_OK: &str = r#"{
        "status": "OK",
        "routes": [{
            "overview_polyline": { "points": "_p~iF~ps|U_ulLnnqC" },
            "legs": [{
                "distance": { "text": "0.6 km", "value": 600 },
                "duration": { "text": "3 mins", "value": 180 },
                "steps": [
                    { "html_instructions": "Head <b>north</b> on <b>1st Ave</b>" },
                    { "html_instructions": "Turn <b>right</b>" }
                ]
            }]
        }]
    }"#;

    #[test]
    fn directions_are_summed_and_decoded() {
        let summary = parse_directions(DIRECTIONS_OK).unwrap();
        assert!((summary.distance_km - 0.6).abs() < 1e-9);
        assert!((summary.eta_minutes - 3.0).abs() < 1e-9);
        assert_eq!(summary.steps, vec!["Head north on 1st Ave", "Turn right"]);
        assert_eq!(summary.polyline.len(), 2);
    }

    #[test]
    fn directions_without_routes_are_not_found() {
        let err = parse_directions(r#"{"status":"ZERO_RESULTS","routes":[]}"#).unwrap_err();
        assert!(matches!(err, RoutingError::NotFound));
        let err = parse_directions(r#"{"status":"OK","routes":[]}"#).unwrap_err();
        assert!(matches!(err, RoutingError::NotFound));
    }

    #[test]
    fn denied_key_surfaces_api_error() {
        let body = r#"{"status":"REQUEST_DENIED","error_message":"The provided API key is invalid.","results":[]}"#;
        match parse_search(body).unwrap_err() {
            RoutingError::ApiError { status, message } => {
                assert_eq!(status, "REQUEST_DENIED");
                assert!(message.contains("invalid"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn first_search_result_wins() {
        let body = r#"{"status":"OK","results":[
            {"geometry":{"location":{"lat":47.615,"lng":-122.335}}},
            {"geometry":{"location":{"lat":1.0,"lng":2.0}}}
        ]}"#;
        assert_eq!(parse_search(body).unwrap(), Coordinate::new(47.615, -122.335));
    }

    #[test]
    fn autocomplete_zero_results_is_empty() {
        assert!(parse_autocomplete(r#"{"status":"ZERO_RESULTS","predictions":[]}"#)
            .unwrap()
            .is_empty());
        let list = parse_autocomplete(
            r#"{"status":"OK","predictions":[{"place_id":"abc","description":"Coffee Shop, Seattle"}]}"#,
        )
        .unwrap();
        assert_eq!(list, vec![PlaceCandidate::new("abc", "Coffee Shop, Seattle")]);
    }

    #[test]
    fn details_without_result_is_not_found() {
        assert!(matches!(
            parse_details(r#"{"status":"OK"}"#).unwrap_err(),
            RoutingError::NotFound
        ));
    }

    #[test]
    fn non_json_failure_is_raw() {
        assert!(matches!(
            check_body(false, "<html>502</html>").unwrap_err(),
            RoutingError::RawApiError(_)
        ));
        assert!(matches!(
            check_body(true, "<html>").unwrap_err(),
            RoutingError::ParseError(_)
        ));
    }

    #[tokio::test]
    async fn identical_endpoints_skip_the_network() {
        let provider = GoogleMapsProvider::new(&MapsConfig::new("unused")).unwrap();
        let here = Coordinate::new(47.61, -122.335);
        let summary = provider.route(here, here).await.unwrap();
        assert_eq!(summary, RouteSummary::zero(here));
    }
}
