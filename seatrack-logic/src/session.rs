use log::{error, info, warn};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    heading::{
        HeadingFusion, HeadingSourceKind, OrientationEvent, OrientationService, OrientationSink,
        OrientationSubscription,
    },
    location::{
        Location, LocationError, LocationEvent, LocationMsg, LocationService, WatchToken,
    },
    prelude::*,
    settings::MapSettings,
    tracking::{PositionTracker, Transition},
    view::{IconCache, RenderedView, ViewInputs, Viewport, render},
};

const FAILED_TO_GET_LOCATION: &str = "Failed to get location";

/// How a session talks back to whatever is drawing it
pub trait UiSender {
    /// Something visible changed, the UI should re-render
    fn send_update(&self);
    /// The position moved, point the map at `center`
    fn recenter(&self, center: Location);
    /// Show a user-visible error notice
    fn alert(&self, message: &str);
}

struct SessionState {
    tracker: PositionTracker,
    fusion: HeadingFusion,
    viewport: Viewport,
    icons: IconCache,
}

/// A mounted map view. Owns the location watch and the orientation subscriptions, gets fixes
/// from [LocationService], headings from [OrientationService], and reports changes through
/// [UiSender].
pub struct MapSession<L: LocationService, O: OrientationService, U: UiSender> {
    settings: MapSettings,
    state: Mutex<SessionState>,
    location: L,
    orientation: O,
    ui: U,
    location_rx: Mutex<mpsc::UnboundedReceiver<LocationMsg>>,
    orientation_tx: mpsc::UnboundedSender<OrientationEvent>,
    orientation_rx: Mutex<mpsc::UnboundedReceiver<OrientationEvent>>,
    cancel: CancellationToken,
}

impl<L: LocationService, O: OrientationService, U: UiSender> MapSession<L, O, U> {
    pub fn new(settings: MapSettings, location: L, orientation: O, ui: U) -> Self {
        let (location_tx, location_rx) = mpsc::unbounded_channel();
        let (orientation_tx, orientation_rx) = mpsc::unbounded_channel();

        let state = SessionState {
            tracker: PositionTracker::new(settings.default_center, settings.watch, location_tx),
            fusion: HeadingFusion::default(),
            viewport: Viewport {
                center: settings.default_center,
                zoom: settings.zoom,
            },
            icons: IconCache::default(),
        };

        Self {
            settings,
            state: Mutex::new(state),
            location,
            orientation,
            ui,
            location_rx: Mutex::new(location_rx),
            orientation_tx,
            orientation_rx: Mutex::new(orientation_rx),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn is_tracking(&self) -> bool {
        self.state.lock().await.tracker.is_tracking()
    }

    /// Start consuming location fixes. Failures are shown to the user and leave the session idle.
    pub async fn start_tracking(&self) -> Transition {
        let mut state = self.state.lock().await;

        if self.cancel.is_cancelled() {
            warn!("Tried to start tracking on a torn down view");
            return Transition::Unchanged;
        }

        match state.tracker.start(&self.location) {
            Ok(transition) => {
                if transition == Transition::Started {
                    self.ui.send_update();
                }
                transition
            }
            Err(LocationError::Unsupported) => {
                warn!("Geolocation is not available");
                self.ui.alert(&LocationError::Unsupported.to_string());
                Transition::Unchanged
            }
            Err(why) => {
                error!("Couldn't start location watch: {why}");
                self.ui.alert(&format!("{FAILED_TO_GET_LOCATION}: {why}"));
                Transition::Unchanged
            }
        }
    }

    /// Stop consuming location fixes, does nothing if not tracking
    pub async fn stop_tracking(&self) -> Transition {
        let mut state = self.state.lock().await;
        let transition = state.tracker.stop(&self.location);
        if transition == Transition::Stopped {
            self.ui.send_update();
        }
        transition
    }

    /// What pressing the tracking button does
    pub async fn toggle_tracking(&self) -> Transition {
        if self.is_tracking().await {
            self.stop_tracking().await
        } else {
            self.start_tracking().await
        }
    }

    pub async fn render(&self) -> RenderedView {
        let mut state = self.state.lock().await;
        let SessionState {
            tracker,
            fusion,
            viewport,
            icons,
        } = &mut *state;

        let inputs = ViewInputs {
            viewport: *viewport,
            position: tracker.position(),
            heading: fusion.heading(),
            heading_source: fusion.source(),
            speed: tracker.speed(),
            tracking: tracker.is_tracking(),
            layers: [&self.settings.base_layer, &self.settings.overlay_layer],
        };

        render(inputs, icons)
    }

    async fn consume_location(&self, token: WatchToken, event: LocationEvent) {
        let mut state = self.state.lock().await;

        match event {
            LocationEvent::Sample(sample) => {
                if state.tracker.apply_sample(token, sample).is_none() {
                    return;
                }
                let position = state.tracker.position();
                if state.viewport.recenter(position) {
                    self.ui.recenter(position);
                }
                self.ui.send_update();
            }
            LocationEvent::Error(why) => {
                if !state.tracker.accepts(token) {
                    warn!("Ignoring error from cancelled watch {token:?}: {why}");
                    return;
                }
                error!("Tracking error: {why}");
                self.ui.alert(FAILED_TO_GET_LOCATION);
            }
        }
    }

    async fn consume_orientation(&self, event: OrientationEvent) {
        let mut state = self.state.lock().await;
        if state.fusion.apply(event) {
            self.ui.send_update();
        }
    }

    /// Tear the view down, [MapSession::main_loop] will release everything and return
    pub fn teardown(&self) {
        self.cancel.cancel();
    }

    async fn release(&self, subscriptions: [OrientationSubscription; 2]) {
        let mut state = self.state.lock().await;
        state.tracker.stop(&self.location);
        for subscription in subscriptions {
            self.orientation.unsubscribe(subscription);
        }
    }

    /// Main loop of the view, subscribes to orientation then applies location and orientation
    /// events as they arrive until [MapSession::teardown] is called.
    pub async fn main_loop(&self) -> Result {
        let mut location_rx = self
            .location_rx
            .try_lock()
            .context("Map session is already running")?;
        let mut orientation_rx = self
            .orientation_rx
            .try_lock()
            .context("Map session is already running")?;

        let subscriptions = HeadingSourceKind::ALL.map(|kind| {
            self.orientation
                .subscribe(OrientationSink::new(kind, self.orientation_tx.clone()))
        });

        info!("Map view mounted");

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break;
                }

                Some((token, event)) = location_rx.recv() => {
                    self.consume_location(token, event).await;
                }

                Some(event) = orientation_rx.recv() => {
                    self.consume_orientation(event).await;
                }
            }
        }

        self.release(subscriptions).await;
        info!("Map view torn down");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        location::LocationSample,
        tests::{MockLocation, MockOrientation, RecordingSender},
    };
    use tokio::{task::JoinHandle, task::yield_now, test};

    type TestSession = MapSession<MockLocation, MockOrientation, RecordingSender>;

    fn mk_session(location: MockLocation) -> (Arc<TestSession>, JoinHandle<Result>) {
        let session = Arc::new(TestSession::new(
            MapSettings::default(),
            location,
            MockOrientation::default(),
            RecordingSender::default(),
        ));
        let looped = session.clone();
        let handle = tokio::spawn(async move { looped.main_loop().await });
        (session, handle)
    }

    async fn settle() {
        for _ in 0..10 {
            yield_now().await;
        }
    }

    fn sample(lat: f64, long: f64, speed_mps: Option<f64>) -> LocationSample {
        LocationSample {
            location: Location::new(lat, long),
            speed_mps,
        }
    }

    #[test]
    async fn test_tracking_scenario() {
        let (session, _handle) = mk_session(MockLocation::default());
        settle().await;

        let view = session.render().await;
        assert_eq!(view.viewport.center, Location::new(60.1695, 24.9354));
        assert_eq!(view.panel.heading, "0°");
        assert_eq!(view.panel.speed, None);
        assert_eq!(view.toggle.label, "Start Tracking");

        assert_eq!(session.toggle_tracking().await, Transition::Started);
        assert!(session.is_tracking().await);
        assert_eq!(session.render().await.toggle.label, "Stop Tracking");
        assert_eq!(session.location.active_watches(), 1);

        session.location.emit(sample(61.0, 25.0, Some(5.0)));
        settle().await;

        let view = session.render().await;
        assert_eq!(view.marker.position, Location::new(61.0, 25.0));
        assert_eq!(view.viewport.center, Location::new(61.0, 25.0));
        assert_eq!(view.panel.speed.as_deref(), Some("9.72 knots"));
        assert_eq!(session.ui.recenters(), vec![Location::new(61.0, 25.0)]);
    }

    #[test]
    async fn test_no_duplicate_recenter() {
        let (session, _handle) = mk_session(MockLocation::default());
        session.start_tracking().await;

        session.location.emit(sample(61.0, 25.0, None));
        session.location.emit(sample(61.0, 25.0, Some(1.0)));
        session.location.emit(sample(61.1, 25.0, None));
        settle().await;

        assert_eq!(
            session.ui.recenters(),
            vec![Location::new(61.0, 25.0), Location::new(61.1, 25.0)]
        );
    }

    #[test]
    async fn test_stop_discards_late_samples() {
        let (session, _handle) = mk_session(MockLocation::default());
        session.start_tracking().await;

        session.location.emit(sample(61.0, 25.0, None));
        settle().await;

        let late = session.location.last_sink().expect("No watch was made");
        assert_eq!(session.toggle_tracking().await, Transition::Stopped);
        assert_eq!(session.location.active_watches(), 0);
        assert_eq!(session.render().await.toggle.label, "Start Tracking");

        late.send_sample(sample(10.0, 10.0, Some(3.0)));
        settle().await;

        let view = session.render().await;
        assert_eq!(view.marker.position, Location::new(61.0, 25.0));
        assert_eq!(view.panel.speed, None);
    }

    #[test]
    async fn test_stop_when_idle() {
        let (session, _handle) = mk_session(MockLocation::default());
        settle().await;

        let before = session.render().await;
        assert_eq!(session.stop_tracking().await, Transition::Unchanged);
        assert_eq!(session.render().await, before);
        assert_eq!(session.ui.updates(), 0);
        assert_eq!(session.location.clear_calls(), 0);
    }

    #[test]
    async fn test_unsupported() {
        let (session, _handle) = mk_session(MockLocation::unavailable());

        assert_eq!(session.toggle_tracking().await, Transition::Unchanged);
        assert!(!session.is_tracking().await);
        assert_eq!(session.ui.alerts(), vec!["Geolocation not supported".to_string()]);
    }

    #[test]
    async fn test_watch_refused() {
        let (session, _handle) =
            mk_session(MockLocation::refusing(LocationError::PermissionDenied));
        settle().await;

        assert_eq!(session.toggle_tracking().await, Transition::Unchanged);
        assert!(!session.is_tracking().await);
        assert_eq!(session.ui.updates(), 0);
        assert_eq!(
            session.ui.alerts(),
            vec!["Failed to get location: Location permission denied".to_string()]
        );
        assert_eq!(session.render().await.toggle.label, "Start Tracking");
    }

    #[test]
    async fn test_source_switch_updates_ui() {
        let (session, _handle) = mk_session(MockLocation::default());
        settle().await;

        session.orientation.emit(HeadingSourceKind::Absolute, Some(0.2));
        settle().await;

        assert!(session.ui.updates() > 0);
        let view = session.render().await;
        assert_eq!(view.panel.heading, "0°");
        assert_eq!(view.panel.heading_source, Some(HeadingSourceKind::Absolute));
    }

    #[test]
    async fn test_watch_error_keeps_tracking() {
        let (session, _handle) = mk_session(MockLocation::default());
        session.start_tracking().await;

        session
            .location
            .emit_error(LocationError::Acquisition("Timeout expired".to_string()));
        settle().await;

        assert!(session.is_tracking().await);
        assert_eq!(session.ui.alerts(), vec!["Failed to get location".to_string()]);

        // The watch keeps going after an error
        session.location.emit(sample(1.0, 1.0, None));
        settle().await;
        assert_eq!(session.render().await.marker.position, Location::new(1.0, 1.0));
    }

    #[test]
    async fn test_heading_while_idle() {
        let (session, _handle) = mk_session(MockLocation::default());
        settle().await;

        assert_eq!(session.orientation.active(), 2);

        session.orientation.emit(HeadingSourceKind::Relative, Some(89.7));
        settle().await;

        let view = session.render().await;
        assert_eq!(view.panel.heading, "90°");
        assert_eq!(view.marker.icon.rotation, 90);
        assert_eq!(view.panel.heading_source, Some(HeadingSourceKind::Relative));

        session.orientation.emit(HeadingSourceKind::Absolute, Some(180.0));
        session.orientation.emit(HeadingSourceKind::Relative, Some(10.0));
        session.orientation.emit(HeadingSourceKind::Absolute, None);
        settle().await;

        let view = session.render().await;
        assert_eq!(view.panel.heading, "180°");
        assert_eq!(view.panel.heading_source, Some(HeadingSourceKind::Absolute));
        assert!(!session.is_tracking().await);
    }

    #[test]
    async fn test_teardown_releases() {
        let (session, handle) = mk_session(MockLocation::default());
        settle().await;
        session.start_tracking().await;

        session.teardown();
        handle
            .await
            .expect("Loop panicked")
            .expect("Loop failed");

        assert_eq!(session.location.active_watches(), 0);
        assert_eq!(session.location.clear_calls(), 1);
        assert_eq!(session.orientation.active(), 0);
        assert_eq!(session.orientation.unsubscribed(), 2);

        // A torn down view must not open new watches
        assert_eq!(session.start_tracking().await, Transition::Unchanged);
        assert_eq!(session.location.watch_calls(), 1);
        assert_eq!(session.stop_tracking().await, Transition::Unchanged);
        assert_eq!(session.location.clear_calls(), 1);
    }

    #[test]
    async fn test_replaced_view_releases_watch() {
        let (stale, stale_handle) = mk_session(MockLocation::default());
        settle().await;
        stale.start_tracking().await;

        // Mounting over a view that never unmounted tears the old one down first
        stale.teardown();
        let (fresh, _handle) = mk_session(MockLocation::default());
        stale_handle
            .await
            .expect("Loop panicked")
            .expect("Loop failed");
        settle().await;

        assert_eq!(stale.location.active_watches(), 0);
        assert_eq!(stale.orientation.active(), 0);
        assert_eq!(fresh.orientation.active(), 2);
        assert_eq!(fresh.toggle_tracking().await, Transition::Started);
        assert_eq!(fresh.render().await.toggle.label, "Stop Tracking");
    }

    #[test]
    async fn test_loop_runs_once() {
        let (session, _handle) = mk_session(MockLocation::default());
        settle().await;

        assert!(session.main_loop().await.is_err());
    }
}
