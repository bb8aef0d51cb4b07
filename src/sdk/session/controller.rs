//! The navigation session: origin, destination and route for one map screen.
//!
//! All state lives behind one mutex that is never held across an await.
//! Provider calls run without the lock and re-check the session when they
//! come back, so a superseded or disposed request cannot write stale state.

use super::state::{Destination, SessionSnapshot, SessionState, ViewportCommand};
use crate::sdk::config::{MapsConfig, SessionOptions};
use crate::sdk::error::NavigationError;
use crate::sdk::feed::{spawn_poller, FeedSource, Marker, MarkerFeed};
use crate::sdk::geo::Coordinate;
use crate::sdk::location::{LocationProvider, PositionWatch, Subscription};
use crate::sdk::notice::{Notice, NoticeBoard, NoticeId};
use crate::sdk::routing::cache::GeoCache;
use crate::sdk::routing::error::RoutingError;
use crate::sdk::routing::provider::GoogleMapsProvider;
use crate::sdk::routing::route::RouteSummary;
use crate::sdk::routing::service::{DirectionsProvider, PlaceCandidate, PlacesProvider};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::AbortHandle;

fn lock(shared: &Mutex<SessionInner>) -> MutexGuard<'_, SessionInner> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn with_timeout<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, RoutingError>>,
) -> Result<T, RoutingError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(RoutingError::Timeout))
}

#[derive(Debug, Clone, Copy)]
enum LookupEndpoint {
    Geocode,
    TextSearch,
}

const LOOKUP_ORDER: [LookupEndpoint; 2] = [LookupEndpoint::Geocode, LookupEndpoint::TextSearch];

struct PendingRoute {
    generation: u64,
    destination: Destination,
    task: AbortHandle,
}

struct SessionInner {
    state: SessionState,
    origin: Option<Coordinate>,
    destination: Option<Destination>,
    route: Option<RouteSummary>,
    pending: Option<PendingRoute>,
    // Bumped whenever the route in flight stops being wanted
    generation: u64,
    follow: bool,
    searches: usize,
    location_error: Option<NavigationError>,
    notices: NoticeBoard,
    viewport: Vec<ViewportCommand>,
    markers: BTreeMap<String, Vec<Marker>>,
    position_watch: Option<Subscription>,
    feeds: Vec<Subscription>,
    origin_tx: watch::Sender<Option<Coordinate>>,
    cache: GeoCache,
    disposed: bool,
}

impl SessionInner {
    fn apply_fix(&mut self, fix: Coordinate) {
        if self.disposed {
            return;
        }
        self.origin = Some(fix);
        self.origin_tx.send_replace(Some(fix));
        match self.state {
            SessionState::AwaitingLocation => {
                log::info!("[SESSION] First fix at {}", fix);
                self.state = SessionState::Idle;
            }
            SessionState::Navigating if self.follow => {
                self.viewport.push(ViewportCommand::CenterOn(fix));
            }
            _ => {}
        }
    }

    fn report(&mut self, err: &NavigationError) {
        if err.is_persistent() {
            self.notices.push_persistent(err.to_string());
        } else {
            self.notices.push_transient(err.to_string());
        }
    }

    fn require_origin(&self) -> Result<Coordinate, NavigationError> {
        match self.origin {
            Some(origin) if !self.disposed => Ok(origin),
            _ => Err(self
                .location_error
                .clone()
                .unwrap_or(NavigationError::LocationUnavailable)),
        }
    }

    fn discard_route(&mut self) {
        if let Some(pending) = self.pending.take() {
            log::debug!("[SESSION] Cancelling route request #{}", pending.generation);
            pending.task.abort();
        }
        self.generation += 1;
        self.route = None;
    }

    fn set_destination(&mut self, destination: Destination) {
        log::info!(
            "[SESSION] Previewing \"{}\" at {}",
            destination.label,
            destination.coordinate
        );
        self.discard_route();
        self.destination = Some(destination);
        self.state = SessionState::Previewing;
    }

    fn is_pending(&self, generation: u64) -> bool {
        !self.disposed && self.pending.as_ref().is_some_and(|p| p.generation == generation)
    }

    fn commit_route(
        &mut self,
        generation: u64,
        result: Result<RouteSummary, RoutingError>,
    ) -> Result<SessionState, NavigationError> {
        if !self.is_pending(generation) {
            log::debug!("[SESSION] Discarding stale route result #{}", generation);
            return Ok(self.state);
        }
        self.pending = None;

        match result {
            Ok(summary) => {
                log::info!("[SESSION] Navigating: {}", summary.headline());
                self.viewport.push(ViewportCommand::FitToRoute {
                    coordinates: summary.polyline.clone(),
                });
                self.route = Some(summary);
                self.state = SessionState::Navigating;
                Ok(self.state)
            }
            Err(e) => {
                log::warn!("[SESSION] Route request #{} failed: {}", generation, e);
                let err = NavigationError::from_route(e);
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Frees the pending slot of a request that died without committing.
    fn abandon_route(&mut self, generation: u64) -> Result<SessionState, NavigationError> {
        if !self.is_pending(generation) {
            return Ok(self.state);
        }
        self.pending = None;
        let err = NavigationError::RouteUnavailable;
        self.report(&err);
        Err(err)
    }

    fn teardown(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(mut watch) = self.position_watch.take() {
            watch.cancel();
        }
        self.feeds.clear();
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
        log::info!("[SESSION] Shut down");
    }
}

/// Counts a place search as in flight for as long as it is alive.
struct SearchGuard<'a>(&'a Mutex<SessionInner>);

impl<'a> SearchGuard<'a> {
    fn new(shared: &'a Mutex<SessionInner>) -> Self {
        lock(shared).searches += 1;
        Self(shared)
    }
}

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        let mut inner = lock(self.0);
        inner.searches = inner.searches.saturating_sub(1);
    }
}

fn forward_positions(shared: Weak<Mutex<SessionInner>>, watch: PositionWatch) -> Subscription {
    let PositionWatch {
        mut updates,
        subscription,
    } = watch;
    let task = tokio::spawn(async move {
        // Held so the provider stream lives exactly as long as this task
        let _provider = subscription;
        while let Some(fix) = updates.recv().await {
            let Some(shared) = shared.upgrade() else {
                break;
            };
            let mut inner = lock(&shared);
            if inner.disposed {
                break;
            }
            inner.apply_fix(fix);
        }
    });
    Subscription::from_task(task)
}

async fn request_route(
    shared: Weak<Mutex<SessionInner>>,
    directions: Arc<dyn DirectionsProvider>,
    limit: Duration,
    generation: u64,
    origin: Coordinate,
    destination: Coordinate,
) -> Option<Result<SessionState, NavigationError>> {
    log::debug!(
        "[SESSION] Requesting route #{} {} -> {}",
        generation,
        origin,
        destination
    );
    let result = with_timeout(limit, directions.route(origin, destination)).await;
    let shared = shared.upgrade()?;
    let mut inner = lock(&shared);
    let outcome = inner.commit_route(generation, result);
    Some(outcome)
}

pub struct NavigationSession {
    shared: Arc<Mutex<SessionInner>>,
    location: Arc<dyn LocationProvider>,
    places: Arc<dyn PlacesProvider>,
    directions: Arc<dyn DirectionsProvider>,
    options: SessionOptions,
}

impl NavigationSession {
    pub fn new(
        location: Arc<dyn LocationProvider>,
        places: Arc<dyn PlacesProvider>,
        directions: Arc<dyn DirectionsProvider>,
        options: SessionOptions,
    ) -> Self {
        let (origin_tx, _) = watch::channel(None);
        let inner = SessionInner {
            state: SessionState::AwaitingLocation,
            origin: None,
            destination: None,
            route: None,
            pending: None,
            generation: 0,
            follow: options.enable_follow,
            searches: 0,
            location_error: None,
            notices: NoticeBoard::new(options.notice_duration),
            viewport: Vec::new(),
            markers: BTreeMap::new(),
            position_watch: None,
            feeds: Vec::new(),
            origin_tx,
            cache: GeoCache::new(),
            disposed: false,
        };
        Self {
            shared: Arc::new(Mutex::new(inner)),
            location,
            places,
            directions,
            options,
        }
    }

    /// Session backed by the Google Maps web services for both search and directions.
    pub fn with_google(
        config: &MapsConfig,
        location: Arc<dyn LocationProvider>,
        options: SessionOptions,
    ) -> Result<Self, RoutingError> {
        let maps = Arc::new(GoogleMapsProvider::new(config)?);
        Ok(Self::new(location, maps.clone(), maps, options))
    }

    fn inner(&self) -> MutexGuard<'_, SessionInner> {
        lock(&self.shared)
    }

    /// Takes a first fix and subscribes to position updates.
    ///
    /// While no fix has ever succeeded, failures leave the session in
    /// `AwaitingLocation` with a persistent notice that only a later
    /// successful call removes.
    pub async fn request_location(&self) -> Result<Coordinate, NavigationError> {
        let fix = match self.location.current_position().await {
            Ok(fix) => fix,
            Err(e) => {
                log::warn!("[SESSION] Location request failed: {}", e);
                let err = NavigationError::from(e);
                let mut inner = self.inner();
                if inner.origin.is_none() {
                    inner.location_error = Some(err.clone());
                    inner.notices.push_persistent(err.to_string());
                } else {
                    inner.report(&err);
                }
                return Err(err);
            }
        };

        let watch = self.location.watch_position(self.options.watch).await;
        let mut inner = self.inner();
        if inner.disposed {
            return Err(NavigationError::LocationUnavailable);
        }
        inner.location_error = None;
        inner.notices.clear_persistent();
        inner.apply_fix(fix);
        match watch {
            Ok(watch) => {
                inner.position_watch = Some(forward_positions(Arc::downgrade(&self.shared), watch));
            }
            Err(e) => log::warn!("[SESSION] Position updates unavailable: {}", e),
        }
        Ok(fix)
    }

    pub async fn retry_location(&self) -> Result<Coordinate, NavigationError> {
        self.request_location().await
    }

    /// Suggestions for a partial query, biased toward the current origin.
    pub async fn autocomplete(&self, query: &str) -> Result<Vec<PlaceCandidate>, NavigationError> {
        let origin = self.inner().require_origin()?;
        let mut candidates = Vec::new();
        if self.options.offer_current_location {
            candidates.push(PlaceCandidate::current_location());
        }

        let query = query.trim();
        if query.chars().count() < self.options.autocomplete_min_chars {
            return Ok(candidates);
        }

        let _searching = SearchGuard::new(&self.shared);
        let call = self
            .places
            .autocomplete(query, origin, self.options.search_bias_radius_m);
        match with_timeout(self.options.request_timeout, call).await {
            Ok(found) => {
                candidates.extend(found);
                Ok(candidates)
            }
            Err(e) => {
                log::warn!("[SESSION] Places error: {}", e);
                let err = NavigationError::from_search(e);
                self.inner().report(&err);
                Err(err)
            }
        }
    }

    /// Moves to `Previewing` on an autocomplete pick. Ignored while navigating.
    pub async fn select_destination(&self, candidate: &PlaceCandidate) -> Result<SessionState, NavigationError> {
        let origin = {
            let inner = self.inner();
            let origin = inner.require_origin()?;
            if inner.state == SessionState::Navigating {
                log::warn!("[SESSION] Ignoring destination change while navigating");
                return Ok(inner.state);
            }
            origin
        };

        let destination = if candidate.is_current_location() {
            Destination {
                coordinate: origin,
                label: "Current location".to_string(),
            }
        } else {
            let cached = self.inner().cache.get_place(&candidate.place_id);
            let coordinate = match cached {
                Some(coordinate) => coordinate,
                None => {
                    let _searching = SearchGuard::new(&self.shared);
                    let call = self.places.resolve(&candidate.place_id);
                    match with_timeout(self.options.request_timeout, call).await {
                        Ok(coordinate) => {
                            self.inner().cache.insert_place(&candidate.place_id, coordinate);
                            coordinate
                        }
                        Err(e) => {
                            log::warn!("[SESSION] Could not resolve \"{}\": {}", candidate.label, e);
                            let err = NavigationError::from_search(e);
                            self.inner().report(&err);
                            return Err(err);
                        }
                    }
                }
            };
            Destination {
                coordinate,
                label: candidate.label.clone(),
            }
        };

        Ok(self.commit_destination(destination))
    }

    /// Free-text fallback: geocoding first, then place text search.
    ///
    /// An empty query does nothing. When neither endpoint finds anything a
    /// single transient notice is raised and the state is left alone.
    pub async fn lookup_destination(&self, query: &str) -> Result<SessionState, NavigationError> {
        let query = query.trim();
        let cached = {
            let inner = self.inner();
            if query.is_empty() {
                return Ok(inner.state);
            }
            inner.require_origin()?;
            if inner.state == SessionState::Navigating {
                log::warn!("[SESSION] Ignoring lookup while navigating");
                return Ok(inner.state);
            }
            inner.cache.get_lookup(query)
        };

        let coordinate = match cached {
            Some(coordinate) => coordinate,
            None => match self.resolve_query(query).await {
                Ok(coordinate) => {
                    self.inner().cache.insert_lookup(query, coordinate);
                    coordinate
                }
                Err(err) => {
                    self.inner().report(&err);
                    return Err(err);
                }
            },
        };

        Ok(self.commit_destination(Destination {
            coordinate,
            label: query.to_string(),
        }))
    }

    async fn resolve_query(&self, query: &str) -> Result<Coordinate, NavigationError> {
        let _searching = SearchGuard::new(&self.shared);
        let mut last_transport_error = None;
        let mut answered = false;

        for endpoint in LOOKUP_ORDER {
            let call = async {
                match endpoint {
                    LookupEndpoint::Geocode => self.places.geocode(query).await,
                    LookupEndpoint::TextSearch => self.places.text_search(query).await,
                }
            };
            match with_timeout(self.options.request_timeout, call).await {
                Ok(coordinate) => {
                    log::debug!("[SESSION] {:?} resolved \"{}\" to {}", endpoint, query, coordinate);
                    return Ok(coordinate);
                }
                Err(RoutingError::NotFound) => {
                    log::debug!("[SESSION] {:?} found nothing for \"{}\"", endpoint, query);
                    answered = true;
                }
                Err(e) => {
                    log::warn!("[SESSION] {:?} failed for \"{}\": {}", endpoint, query, e);
                    if e.is_transport() {
                        last_transport_error = Some(e.to_string());
                    } else {
                        answered = true;
                    }
                }
            }
        }

        match last_transport_error {
            Some(message) if !answered => Err(NavigationError::NetworkError(message)),
            _ => Err(NavigationError::SearchNotFound),
        }
    }

    fn commit_destination(&self, destination: Destination) -> SessionState {
        let mut inner = self.inner();
        if inner.disposed || inner.state == SessionState::Navigating || inner.origin.is_none() {
            return inner.state;
        }
        inner.set_destination(destination);
        inner.state
    }

    /// Requests a route to the current destination and starts navigating once it arrives.
    ///
    /// Without a destination this does nothing. A second call while the same
    /// destination is already being routed, or already navigated to, issues
    /// no new request. A failure keeps the session in `Previewing` so the
    /// call can simply be repeated.
    pub async fn start_navigation(&self) -> Result<SessionState, NavigationError> {
        let (generation, task) = {
            let mut inner = self.inner();
            if inner.disposed {
                return Ok(inner.state);
            }
            let (Some(origin), Some(destination)) = (inner.origin, inner.destination.clone()) else {
                log::debug!("[SESSION] No destination to navigate to");
                return Ok(inner.state);
            };
            if inner.state == SessionState::Navigating {
                return Ok(inner.state);
            }
            if let Some(pending) = &inner.pending {
                if pending.destination == destination {
                    log::debug!("[SESSION] Route #{} already in flight", pending.generation);
                    return Ok(inner.state);
                }
            }
            if let Some(stale) = inner.pending.take() {
                stale.task.abort();
            }

            inner.generation += 1;
            let generation = inner.generation;
            let task = tokio::spawn(request_route(
                Arc::downgrade(&self.shared),
                Arc::clone(&self.directions),
                self.options.request_timeout,
                generation,
                origin,
                destination.coordinate,
            ));
            inner.pending = Some(PendingRoute {
                generation,
                destination,
                task: task.abort_handle(),
            });
            (generation, task)
        };

        match task.await {
            Ok(Some(outcome)) => outcome,
            Err(e) if e.is_panic() => {
                log::error!("[SESSION] Route request #{} panicked", generation);
                self.inner().abandon_route(generation)
            }
            // Superseded, ended or disposed while in flight
            Ok(None) | Err(_) => Ok(self.state()),
        }
    }

    /// Drops destination and route. Only a session that never had a fix stays where it is.
    pub fn end_navigation(&self) -> SessionState {
        let mut inner = self.inner();
        if matches!(inner.state, SessionState::AwaitingLocation | SessionState::Idle) {
            return inner.state;
        }
        log::info!("[SESSION] Navigation ended");
        inner.destination = None;
        inner.discard_route();
        inner.state = SessionState::Idle;
        inner.state
    }

    pub fn set_follow(&self, follow: bool) {
        self.inner().follow = follow;
    }

    pub fn follow(&self) -> bool {
        self.inner().follow
    }

    /// Starts polling `feed`; its in-range markers appear in snapshots. Needs a running tokio runtime.
    pub fn attach_feed(&self, feed: FeedSource) {
        let name = feed.name().to_string();
        let weak = Arc::downgrade(&self.shared);
        let mut inner = self.inner();
        if inner.disposed {
            return;
        }
        let origin = inner.origin_tx.subscribe();
        let poller = spawn_poller(
            feed,
            origin,
            self.options.feed_poll_interval,
            self.options.marker_radius_miles,
            move |markers| {
                let Some(shared) = weak.upgrade() else {
                    return false;
                };
                let mut inner = lock(&shared);
                if inner.disposed {
                    return false;
                }
                inner.markers.insert(name.clone(), markers);
                true
            },
        );
        inner.feeds.push(poller);
    }

    pub fn in_range(&self, coordinate: &Coordinate) -> bool {
        self.inner()
            .origin
            .is_some_and(|origin| origin.is_within(coordinate, self.options.marker_radius_miles))
    }

    pub fn state(&self) -> SessionState {
        self.inner().state
    }

    pub fn origin(&self) -> Option<Coordinate> {
        self.inner().origin
    }

    pub fn destination(&self) -> Option<Destination> {
        self.inner().destination.clone()
    }

    pub fn route(&self) -> Option<RouteSummary> {
        self.inner().route.clone()
    }

    pub fn markers(&self) -> Vec<Marker> {
        self.inner().markers.values().flatten().cloned().collect()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.inner().notices.visible()
    }

    pub fn dismiss_notice(&self, id: NoticeId) -> bool {
        self.inner().notices.dismiss(id)
    }

    /// Camera requests queued since the last call.
    pub fn take_viewport_commands(&self) -> Vec<ViewportCommand> {
        std::mem::take(&mut self.inner().viewport)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut inner = self.inner();
        let navigating = inner.state == SessionState::Navigating;
        let route = inner.route.clone();
        SessionSnapshot {
            state: inner.state,
            origin: inner.origin,
            destination: inner.destination.clone(),
            headline: route.as_ref().filter(|_| navigating).map(RouteSummary::headline),
            steps: match &route {
                Some(route) if self.options.enable_steps => route.steps.clone(),
                _ => Vec::new(),
            },
            route,
            searching: inner.searches > 0,
            routing: inner.pending.is_some(),
            follow: inner.follow,
            markers: inner.markers.values().flatten().cloned().collect(),
            notices: inner.notices.visible(),
        }
    }

    /// Stops position updates, feed polling and any route in flight. Later callbacks are ignored.
    pub fn shutdown(&self) {
        self.inner().teardown();
    }
}

impl Drop for NavigationSession {
    fn drop(&mut self) {
        self.inner().teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::location::SimulatedLocationProvider;
    use async_trait::async_trait;

    struct NoPlaces;

    #[async_trait]
    impl PlacesProvider for NoPlaces {
        async fn autocomplete(
            &self,
            _query: &str,
            _bias: Coordinate,
            _radius_m: u32,
        ) -> Result<Vec<PlaceCandidate>, RoutingError> {
            Ok(Vec::new())
        }
        async fn resolve(&self, _place_id: &str) -> Result<Coordinate, RoutingError> {
            Err(RoutingError::NotFound)
        }
        async fn geocode(&self, _query: &str) -> Result<Coordinate, RoutingError> {
            Err(RoutingError::NotFound)
        }
        async fn text_search(&self, _query: &str) -> Result<Coordinate, RoutingError> {
            Err(RoutingError::Timeout)
        }
    }

    struct Straight;

    #[async_trait]
    impl DirectionsProvider for Straight {
        async fn route(&self, origin: Coordinate, destination: Coordinate) -> Result<RouteSummary, RoutingError> {
            Ok(RouteSummary {
                distance_km: origin.approx_meters_to(&destination) / 1000.0,
                eta_minutes: 1.0,
                steps: vec!["Go".to_string()],
                polyline: vec![origin, destination],
            })
        }
    }

    fn session_at(origin: Coordinate, options: SessionOptions) -> NavigationSession {
        NavigationSession::new(
            Arc::new(SimulatedLocationProvider::stationary(origin)),
            Arc::new(NoPlaces),
            Arc::new(Straight),
            options,
        )
    }

    #[tokio::test]
    async fn mixed_failures_report_not_found() {
        let session = session_at(Coordinate::new(1.0, 1.0), SessionOptions::default());
        session.request_location().await.unwrap();
        // geocode answered "nothing", text search timed out
        assert_eq!(
            session.lookup_destination("nowhere").await,
            Err(NavigationError::SearchNotFound)
        );
        assert!(!session.snapshot().searching);
    }

    #[tokio::test]
    async fn current_location_candidate_routes_to_origin() {
        let origin = Coordinate::new(47.61, -122.335);
        let session = session_at(origin, SessionOptions::default());
        session.request_location().await.unwrap();

        let list = session.autocomplete("c").await.unwrap();
        assert_eq!(list, vec![PlaceCandidate::current_location()]);

        session.select_destination(&list[0]).await.unwrap();
        let destination = session.destination().unwrap();
        assert_eq!(destination.coordinate, origin);
        assert_eq!(destination.label, "Current location");
    }

    #[tokio::test]
    async fn steps_hidden_when_disabled() {
        let options = SessionOptions {
            enable_steps: false,
            ..SessionOptions::default()
        };
        let session = session_at(Coordinate::new(1.0, 1.0), options);
        session.request_location().await.unwrap();
        session
            .select_destination(&PlaceCandidate::current_location())
            .await
            .unwrap();
        session.start_navigation().await.unwrap();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.state, SessionState::Navigating);
        assert!(snapshot.steps.is_empty());
        assert_eq!(snapshot.route.unwrap().steps, vec!["Go"]);
    }

    #[tokio::test]
    async fn in_range_needs_an_origin() {
        let session = session_at(Coordinate::new(0.0, 0.0), SessionOptions::default());
        assert!(!session.in_range(&Coordinate::new(0.0, 0.0)));
        session.request_location().await.unwrap();
        assert!(session.in_range(&Coordinate::new(0.1, 0.0)));
        assert!(!session.in_range(&Coordinate::new(0.2, 0.0)));
    }
}
