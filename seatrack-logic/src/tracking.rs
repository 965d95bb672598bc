use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{
    location::{
        Location, LocationError, LocationMsg, LocationSample, LocationService, LocationSink,
        WatchId, WatchOptions, WatchToken,
    },
    units::Knots,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingState {
    Idle,
    /// A watch is live, `token` tags the samples it delivers and `watch` cancels it
    Tracking { token: WatchToken, watch: WatchId },
}

impl TrackingState {
    pub fn is_tracking(&self) -> bool {
        matches!(self, Self::Tracking { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, specta::Type)]
/// What a call to start/stop actually did
pub enum Transition {
    Started,
    Stopped,
    /// Already in the requested state, nothing happened
    Unchanged,
}

/// Position and speed fed by a single location watch at a time.
pub struct PositionTracker {
    position: Location,
    speed: Option<Knots>,
    state: TrackingState,
    next_token: u64,
    options: WatchOptions,
    tx: mpsc::UnboundedSender<LocationMsg>,
}

impl PositionTracker {
    pub fn new(
        initial: Location,
        options: WatchOptions,
        tx: mpsc::UnboundedSender<LocationMsg>,
    ) -> Self {
        Self {
            position: initial,
            speed: None,
            state: TrackingState::Idle,
            next_token: 0,
            options,
            tx,
        }
    }

    pub fn position(&self) -> Location {
        self.position
    }

    pub fn speed(&self) -> Option<Knots> {
        self.speed
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state.is_tracking()
    }

    /// Begin watching location. Does nothing if a watch is already live.
    pub fn start(&mut self, service: &impl LocationService) -> Result<Transition, LocationError> {
        if self.is_tracking() {
            return Ok(Transition::Unchanged);
        }

        if !service.is_available() {
            return Err(LocationError::Unsupported);
        }

        let token = WatchToken(self.next_token);
        self.next_token += 1;

        let sink = LocationSink::new(token, self.tx.clone());
        let watch = service.watch(self.options, sink)?;
        info!("Started location watch {watch:?} ({token:?})");
        self.state = TrackingState::Tracking { token, watch };
        Ok(Transition::Started)
    }

    /// Cancel the live watch, if any. Safe to call repeatedly.
    pub fn stop(&mut self, service: &impl LocationService) -> Transition {
        match std::mem::replace(&mut self.state, TrackingState::Idle) {
            TrackingState::Tracking { token, watch } => {
                service.clear_watch(watch);
                info!("Cleared location watch {watch:?} ({token:?})");
                Transition::Stopped
            }
            TrackingState::Idle => Transition::Unchanged,
        }
    }

    /// Whether events stamped with `token` belong to the live watch
    pub fn accepts(&self, token: WatchToken) -> bool {
        matches!(self.state, TrackingState::Tracking { token: live, .. } if live == token)
    }

    /// Apply a sample from the watch identified by `token`. Returns whether the position moved,
    /// or `None` if the sample was stale and dropped.
    pub fn apply_sample(&mut self, token: WatchToken, sample: LocationSample) -> Option<bool> {
        if !self.accepts(token) {
            warn!("Dropping sample from cancelled watch {token:?}");
            return None;
        }

        if let Some(speed) = sample.speed() {
            self.speed = Some(speed);
        }

        let moved = sample.location != self.position;
        self.position = sample.location;
        Some(moved)
    }
}
