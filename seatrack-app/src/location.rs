use log::{error, info, warn};
use seatrack_logic::{
    Location, LocationError, LocationSample, LocationService, LocationSink, WatchId, WatchOptions,
};
use tauri::{AppHandle, plugin::PermissionState};
use tauri_plugin_geolocation::{GeolocationExt, PermissionType, PositionOptions, WatchEvent};

/// [LocationService] backed by the platform geolocation plugin
pub struct TauriLocation(AppHandle);

impl TauriLocation {
    pub fn new(app: AppHandle) -> Self {
        Self(app)
    }

    fn ensure_permission(&self) -> Result<(), LocationError> {
        let geolocation = self.0.geolocation();
        let status = geolocation
            .check_permissions()
            .map_err(|why| LocationError::Acquisition(why.to_string()))?;

        let state = match status.location {
            PermissionState::Prompt | PermissionState::PromptWithRationale => {
                info!("Requesting location permission");
                geolocation
                    .request_permissions(Some(vec![PermissionType::Location]))
                    .map_err(|why| LocationError::Acquisition(why.to_string()))?
                    .location
            }
            other => other,
        };

        if matches!(state, PermissionState::Denied) {
            Err(LocationError::PermissionDenied)
        } else {
            Ok(())
        }
    }
}

fn position_options(options: WatchOptions) -> PositionOptions {
    PositionOptions {
        enable_high_accuracy: options.enable_high_accuracy,
        timeout: options.timeout,
        maximum_age: options.maximum_age,
    }
}

impl LocationService for TauriLocation {
    fn is_available(&self) -> bool {
        match self.0.geolocation().check_permissions() {
            Ok(_) => true,
            Err(why) => {
                warn!("Geolocation unavailable: {why:?}");
                false
            }
        }
    }

    fn watch(&self, options: WatchOptions, sink: LocationSink) -> Result<WatchId, LocationError> {
        self.ensure_permission()?;

        self.0
            .geolocation()
            .watch_position(position_options(options), move |event| match event {
                WatchEvent::Position(pos) => {
                    let coords = pos.coords;
                    sink.send_sample(LocationSample {
                        location: Location::new(coords.latitude, coords.longitude),
                        speed_mps: coords.speed,
                    });
                }
                WatchEvent::Error(why) => sink.send_error(LocationError::Acquisition(why)),
            })
            .map(WatchId)
            .map_err(|why| LocationError::Acquisition(why.to_string()))
    }

    fn clear_watch(&self, id: WatchId) {
        if let Err(why) = self.0.geolocation().clear_watch(id.0) {
            error!("Failed to clear location watch {id:?}: {why:?}");
        }
    }
}
