//! External marker sources: police units, aircraft and group members.
//!
//! Every source, simulated or real, is polled through [`MarkerFeed`], so the
//! session never knows which one it is talking to.

use crate::sdk::geo::Coordinate;
use crate::sdk::location::Subscription;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    GroupMember,
    PatrolCar,
    Aircraft,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: String,
    pub coordinate: Coordinate,
    pub label: String,
    pub kind: MarkerKind,
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait MarkerFeed: Send + Sync {
    fn name(&self) -> &str;

    /// Current markers around `origin`. Range filtering is the caller's job.
    async fn poll(&self, origin: Coordinate) -> Result<Vec<Marker>, FeedError>;
}

/// A simulated unit, placed relative to the origin at every poll.
#[derive(Debug, Clone, Copy)]
pub struct MockUnit {
    pub d_lat: f64,
    pub d_lon: f64,
    pub airborne: bool,
}

#[derive(Debug, Clone)]
pub struct MockMember {
    pub id: String,
    pub name: String,
    pub status: String,
    pub d_lat: f64,
    pub d_lon: f64,
}

#[derive(Debug, Clone)]
pub enum MockFeed {
    Police(Vec<MockUnit>),
    Group(Vec<MockMember>),
}

impl MockFeed {
    /// One helicopter a few miles north-east of the user.
    pub fn police() -> Self {
        MockFeed::Police(vec![MockUnit {
            d_lat: 0.04,
            d_lon: 0.01,
            airborne: true,
        }])
    }

    pub fn group() -> Self {
        let member = |id: &str, name: &str, status: &str, d_lat, d_lon| MockMember {
            id: id.to_string(),
            name: name.to_string(),
            status: status.to_string(),
            d_lat,
            d_lon,
        };
        MockFeed::Group(vec![
            member("1", "Alice", "On route", 0.01, -0.005),
            member("2", "Bob", "Parked", -0.02, 0.015),
        ])
    }

    fn markers(&self, origin: Coordinate) -> Vec<Marker> {
        match self {
            MockFeed::Police(units) => {
                let stamp = chrono::Utc::now().timestamp_millis();
                units
                    .iter()
                    .enumerate()
                    .map(|(i, unit)| Marker {
                        id: format!("{}-{}", stamp, i),
                        coordinate: origin.offset(unit.d_lat, unit.d_lon),
                        label: if unit.airborne {
                            "Unit 23 (Air)".to_string()
                        } else {
                            "Patrol Car".to_string()
                        },
                        kind: if unit.airborne {
                            MarkerKind::Aircraft
                        } else {
                            MarkerKind::PatrolCar
                        },
                    })
                    .collect()
            }
            MockFeed::Group(members) => members
                .iter()
                .map(|m| Marker {
                    id: m.id.clone(),
                    coordinate: origin.offset(m.d_lat, m.d_lon),
                    label: format!("{} ({})", m.name, m.status),
                    kind: MarkerKind::GroupMember,
                })
                .collect(),
        }
    }
}

/// Where markers come from. Swapping variants never touches session logic.
#[derive(Clone)]
pub enum FeedSource {
    Mock(MockFeed),
    Live(Arc<dyn MarkerFeed>),
}

#[async_trait]
impl MarkerFeed for FeedSource {
    fn name(&self) -> &str {
        match self {
            FeedSource::Mock(MockFeed::Police(_)) => "mock-police",
            FeedSource::Mock(MockFeed::Group(_)) => "mock-group",
            FeedSource::Live(feed) => feed.name(),
        }
    }

    async fn poll(&self, origin: Coordinate) -> Result<Vec<Marker>, FeedError> {
        match self {
            FeedSource::Mock(mock) => Ok(mock.markers(origin)),
            FeedSource::Live(feed) => feed.poll(origin).await,
        }
    }
}

pub fn filter_in_range(markers: Vec<Marker>, origin: Coordinate, radius_miles: f64) -> Vec<Marker> {
    markers
        .into_iter()
        .filter(|m| origin.is_within(&m.coordinate, radius_miles))
        .collect()
}

/// Polls `feed` now, every `interval`, and whenever the origin moves.
///
/// `sink` receives only in-range markers. A failed poll keeps the previous set.
pub fn spawn_poller<F>(
    feed: FeedSource,
    mut origin: watch::Receiver<Option<Coordinate>>,
    interval: Duration,
    radius_miles: f64,
    sink: F,
) -> Subscription
where
    F: Fn(Vec<Marker>) -> bool + Send + 'static,
{
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = origin.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            let Some(here) = *origin.borrow_and_update() else {
                continue;
            };
            match feed.poll(here).await {
                Ok(markers) => {
                    let inside = filter_in_range(markers, here, radius_miles);
                    log::debug!("[FEED] {} reported {} unit(s) in range", feed.name(), inside.len());
                    if !sink(inside) {
                        break;
                    }
                }
                Err(e) => log::warn!("[FEED] {} poll failed: {}", feed.name(), e),
            }
        }
    });
    Subscription::from_task(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FarAway;

    #[async_trait]
    impl MarkerFeed for FarAway {
        fn name(&self) -> &str {
            "far"
        }

        async fn poll(&self, origin: Coordinate) -> Result<Vec<Marker>, FeedError> {
            Ok(vec![Marker {
                id: "far".into(),
                coordinate: origin.offset(1.0, 0.0),
                label: "Patrol Car".into(),
                kind: MarkerKind::PatrolCar,
            }])
        }
    }

    #[tokio::test]
    async fn mock_police_reports_aircraft_offset() {
        let origin = Coordinate::new(47.610, -122.335);
        let markers = FeedSource::Mock(MockFeed::police()).poll(origin).await.unwrap();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].kind, MarkerKind::Aircraft);
        assert_eq!(markers[0].label, "Unit 23 (Air)");
        assert_eq!(markers[0].coordinate, origin.offset(0.04, 0.01));
        assert!(markers[0].id.ends_with("-0"));
    }

    #[tokio::test]
    async fn group_roster_is_labelled_with_status() {
        let markers = FeedSource::Mock(MockFeed::group())
            .poll(Coordinate::new(0.0, 0.0))
            .await
            .unwrap();
        let labels: Vec<_> = markers.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, vec!["Alice (On route)", "Bob (Parked)"]);
        assert!(markers.iter().all(|m| m.kind == MarkerKind::GroupMember));
    }

    #[test]
    fn out_of_range_markers_are_dropped() {
        let origin = Coordinate::new(0.0, 0.0);
        let make = |lat| Marker {
            id: "x".into(),
            coordinate: Coordinate::new(lat, 0.0),
            label: String::new(),
            kind: MarkerKind::PatrolCar,
        };
        // 0.1 deg of latitude is 6.9 miles
        let kept = filter_in_range(vec![make(0.1), make(0.2)], origin, 7.5);
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn poller_waits_for_origin_then_reports() {
        let (tx, rx) = watch::channel(None);
        let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
        let sink_seen = Arc::clone(&seen);
        let _sub = spawn_poller(
            FeedSource::Mock(MockFeed::police()),
            rx,
            Duration::from_secs(15),
            7.5,
            move |markers| {
                sink_seen.lock().unwrap().push(markers.len());
                true
            },
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(seen.lock().unwrap().is_empty());

        tx.send_replace(Some(Coordinate::new(47.61, -122.335)));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*seen.lock().unwrap(), vec![1]);

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn live_feed_goes_through_the_same_filter() {
        let (_tx, rx) = watch::channel(Some(Coordinate::new(0.0, 0.0)));
        let seen: Arc<Mutex<Vec<usize>>> = Arc::default();
        let sink_seen = Arc::clone(&seen);
        let _sub = spawn_poller(
            FeedSource::Live(Arc::new(FarAway)),
            rx,
            Duration::from_secs(15),
            7.5,
            move |markers| {
                sink_seen.lock().unwrap().push(markers.len());
                true
            },
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*seen.lock().unwrap(), vec![0]);
    }
}
