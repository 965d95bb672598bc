use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::units::Knots;

/// A "part" of a location
pub type LocationComponent = f64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, specta::Type)]
/// Some location in the world as gotten from a Geolocation API
pub struct Location {
    /// Latitude
    pub lat: LocationComponent,
    /// Longitude
    pub long: LocationComponent,
}

impl Location {
    pub const fn new(lat: LocationComponent, long: LocationComponent) -> Self {
        Self { lat, long }
    }
}

/// One fix delivered by a location watch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSample {
    pub location: Location,
    /// Raw speed over ground in m/s, if the platform could determine it
    pub speed_mps: Option<f64>,
}

impl LocationSample {
    /// Speed converted to knots, `None` if missing or not a usable number
    pub fn speed(&self) -> Option<Knots> {
        self.speed_mps.and_then(Knots::from_mps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
/// Options passed to the platform when starting a location watch
pub struct WatchOptions {
    pub enable_high_accuracy: bool,
    /// Oldest cached fix (ms) the platform may hand back
    pub maximum_age: u32,
    /// How long (ms) a single fix request may take before reporting a timeout
    pub timeout: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            maximum_age: 1000,
            timeout: 10000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// The environment has no location capability at all
    Unsupported,
    /// The user or OS refused location access
    PermissionDenied,
    /// No fix could be obtained (timeout, position unavailable, plugin error)
    Acquisition(String),
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "Geolocation not supported"),
            Self::PermissionDenied => write!(f, "Location permission denied"),
            Self::Acquisition(why) => write!(f, "{why}"),
        }
    }
}

impl std::error::Error for LocationError {}

/// Generation number of a watch, minted by the session before each `watch` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatchToken(pub u64);

/// Platform handle for an active watch, only good for cancelling it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    Sample(LocationSample),
    Error(LocationError),
}

pub type LocationMsg = (WatchToken, LocationEvent);

/// Where a watch delivers its events, every event is stamped with the watch's token.
#[derive(Debug, Clone)]
pub struct LocationSink {
    token: WatchToken,
    tx: mpsc::UnboundedSender<LocationMsg>,
}

impl LocationSink {
    pub(crate) fn new(token: WatchToken, tx: mpsc::UnboundedSender<LocationMsg>) -> Self {
        Self { token, tx }
    }

    /// Push an event, silently dropped once the session has shut down
    pub fn send(&self, event: LocationEvent) {
        self.tx.send((self.token, event)).ok();
    }

    pub fn send_sample(&self, sample: LocationSample) {
        self.send(LocationEvent::Sample(sample));
    }

    pub fn send_error(&self, error: LocationError) {
        self.send(LocationEvent::Error(error));
    }
}

pub trait LocationService {
    /// Whether this environment can provide location at all
    fn is_available(&self) -> bool;
    /// Begin a continuous watch, events go to `sink` until [LocationService::clear_watch] is
    /// called with the returned id.
    fn watch(&self, options: WatchOptions, sink: LocationSink) -> Result<WatchId, LocationError>;
    /// Cancel a watch, unknown ids are ignored
    fn clear_watch(&self, id: WatchId);
}
