use std::sync::Arc;

use log::{error, info, warn};
use seatrack_logic::{Location, MapSession, MapSettings, UiSender};
use serde::{Deserialize, Serialize};
use tauri::AppHandle;
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
use tauri_specta::Event;
use tokio::sync::RwLock;

use crate::{Result, location::TauriLocation, orientation::WebviewOrientation};

/// Something on the map view has changed, call `get_view` to re-render
#[derive(Serialize, Deserialize, Clone, Default, Debug, specta::Type, tauri_specta::Event)]
pub struct ViewStateUpdate;

/// The position moved, point the map at the contained coordinates
#[derive(Serialize, Deserialize, Clone, Debug, specta::Type, tauri_specta::Event)]
pub struct Recenter(Location);

pub struct TauriUiSender(AppHandle);

impl TauriUiSender {
    fn new(app: &AppHandle) -> Self {
        Self(app.clone())
    }
}

fn error_dialog(app: &AppHandle, msg: &str) {
    app.dialog()
        .message(msg)
        .kind(MessageDialogKind::Error)
        .show(|_| {});
}

impl UiSender for TauriUiSender {
    fn send_update(&self) {
        if let Err(why) = ViewStateUpdate.emit(&self.0) {
            error!("Error sending view state update to UI: {why:?}");
        }
    }

    fn recenter(&self, center: Location) {
        if let Err(why) = Recenter(center).emit(&self.0) {
            error!("Error sending recenter to UI: {why:?}");
        }
    }

    fn alert(&self, message: &str) {
        error_dialog(&self.0, message);
    }
}

pub type Session = MapSession<TauriLocation, WebviewOrientation, TauriUiSender>;

pub enum AppState {
    Unmounted,
    Mounted(Arc<Session>),
}

pub type AppStateHandle = RwLock<AppState>;

impl AppState {
    pub fn get_session(&self) -> Result<Arc<Session>> {
        if let AppState::Mounted(session) = self {
            Ok(session.clone())
        } else {
            Err("Map view is not mounted".to_string())
        }
    }

    fn session_loop(session: Arc<Session>) {
        tokio::spawn(async move {
            if let Err(why) = session.main_loop().await {
                error!("Map session error: {why:?}");
            }
        });
    }

    /// Mount a fresh map view. A view left mounted (e.g. the webview reloaded before it could
    /// unmount) is torn down first.
    pub fn mount(&mut self, app: &AppHandle, settings: MapSettings) -> Result {
        if let AppState::Mounted(stale) = self {
            warn!("Map view was still mounted, tearing it down");
            stale.teardown();
        }

        let session = Arc::new(Session::new(
            settings,
            TauriLocation::new(app.clone()),
            WebviewOrientation::new(app.clone()),
            TauriUiSender::new(app),
        ));
        *self = AppState::Mounted(session.clone());
        Self::session_loop(session);
        info!("Mounting map view");
        Ok(())
    }

    pub fn unmount(&mut self) {
        match std::mem::replace(self, AppState::Unmounted) {
            AppState::Mounted(session) => {
                info!("Unmounting map view");
                session.teardown();
            }
            AppState::Unmounted => {
                warn!("Map view already unmounted!");
            }
        }
    }
}
