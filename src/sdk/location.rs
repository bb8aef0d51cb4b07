use crate::sdk::geo::Coordinate;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const WATCH_BUFFER: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Accuracy {
    Low,
    Balanced,
    #[default]
    High,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub accuracy: Accuracy,
    /// Movement below this is not reported.
    pub min_distance_m: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::High,
            min_distance_m: 10.0,
        }
    }
}

/// Owns a background task; cancelling or dropping it stops the task.
#[derive(Debug, Default)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// For sources with nothing to tear down.
    pub fn inert() -> Self {
        Self::default()
    }

    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// A stream of fixes. Dropping it releases the provider side.
#[derive(Debug)]
pub struct PositionWatch {
    pub updates: mpsc::Receiver<Coordinate>,
    pub subscription: Subscription,
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// One-shot fix, asking for permission if needed.
    async fn current_position(&self) -> Result<Coordinate, LocationError>;

    /// Continuous fixes until the returned watch is dropped.
    async fn watch_position(&self, options: WatchOptions) -> Result<PositionWatch, LocationError>;
}

/// Replays a fixed track, one point per `step`. Stands in for device GPS on hosts without one.
pub struct SimulatedLocationProvider {
    track: Vec<Coordinate>,
    step: Duration,
    granted: AtomicBool,
}

impl SimulatedLocationProvider {
    /// A device that never moves.
    pub fn stationary(at: Coordinate) -> Self {
        Self::with_track(vec![at], Duration::from_secs(1))
    }

    pub fn with_track(track: Vec<Coordinate>, step: Duration) -> Self {
        Self {
            track,
            step,
            granted: AtomicBool::new(true),
        }
    }

    /// Starts with permission refused until `grant` is called.
    pub fn denied(mut self) -> Self {
        self.granted = AtomicBool::new(false);
        self
    }

    pub fn grant(&self) {
        self.granted.store(true, Ordering::SeqCst);
    }

    fn check_permission(&self) -> Result<(), LocationError> {
        if self.granted.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LocationError::PermissionDenied)
        }
    }
}

#[async_trait]
impl LocationProvider for SimulatedLocationProvider {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        self.check_permission()?;
        self.track
            .first()
            .copied()
            .ok_or_else(|| LocationError::Unavailable("empty track".to_string()))
    }

    async fn watch_position(&self, options: WatchOptions) -> Result<PositionWatch, LocationError> {
        self.check_permission()?;
        let (tx, rx) = mpsc::channel(WATCH_BUFFER);
        let track = self.track.clone();
        let step = self.step;

        let task = tokio::spawn(async move {
            let mut last = match track.first() {
                Some(first) => *first,
                None => return,
            };
            for point in track.into_iter().skip(1) {
                tokio::time::sleep(step).await;
                if last.approx_meters_to(&point) < options.min_distance_m {
                    continue;
                }
                last = point;
                if tx.send(point).await.is_err() {
                    break;
                }
            }
        });

        Ok(PositionWatch {
            updates: rx,
            subscription: Subscription::from_task(task),
        })
    }
}
