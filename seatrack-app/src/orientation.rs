use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicU32, Ordering},
    },
};

use log::{debug, error, warn};
use seatrack_logic::{
    HeadingSourceKind, OrientationEvent, OrientationService, OrientationSink,
    OrientationSubscription,
};
use serde::{Deserialize, Serialize};
use tauri::{AppHandle, Manager};
use tauri_specta::Event;

/// Tells the webview to attach or detach its listener for an orientation event kind
#[derive(Serialize, Deserialize, Clone, Debug, specta::Type, tauri_specta::Event)]
pub struct OrientationListen {
    kind: HeadingSourceKind,
    active: bool,
}

/// Routes orientation readings pushed by the webview to whoever is subscribed
#[derive(Default)]
pub struct OrientationRelay {
    next_id: AtomicU32,
    sinks: Mutex<HashMap<u32, OrientationSink>>,
}

impl OrientationRelay {
    /// Forward a reading to every sink subscribed to its kind
    pub fn dispatch(&self, event: OrientationEvent) {
        let Ok(sinks) = self.sinks.lock() else {
            error!("Orientation relay lock poisoned");
            return;
        };

        let mut delivered = false;
        for sink in sinks.values().filter(|s| s.kind() == event.kind) {
            sink.send(event.alpha);
            delivered = true;
        }

        if !delivered {
            debug!("No subscriber for {:?} orientation, dropping", event.kind);
        }
    }
}

/// [OrientationService] fed by `deviceorientation` events from the webview
pub struct WebviewOrientation(AppHandle);

impl WebviewOrientation {
    pub fn new(app: AppHandle) -> Self {
        Self(app)
    }

    fn emit_listen(&self, kind: HeadingSourceKind, active: bool) {
        if let Err(why) = (OrientationListen { kind, active }).emit(&self.0) {
            warn!("Error asking webview to toggle {kind:?} orientation listener: {why:?}");
        }
    }
}

impl OrientationService for WebviewOrientation {
    fn subscribe(&self, sink: OrientationSink) -> OrientationSubscription {
        let relay = self.0.state::<OrientationRelay>();
        let id = relay.next_id.fetch_add(1, Ordering::Relaxed);
        let kind = sink.kind();

        match relay.sinks.lock() {
            Ok(mut sinks) => {
                sinks.insert(id, sink);
            }
            Err(why) => error!("Couldn't subscribe to {kind:?} orientation: {why}"),
        }

        self.emit_listen(kind, true);
        OrientationSubscription { kind, id }
    }

    fn unsubscribe(&self, subscription: OrientationSubscription) {
        let relay = self.0.state::<OrientationRelay>();
        let still_listening = match relay.sinks.lock() {
            Ok(mut sinks) => {
                sinks.remove(&subscription.id);
                sinks.values().any(|s| s.kind() == subscription.kind)
            }
            Err(why) => {
                error!("Couldn't unsubscribe from {:?} orientation: {why}", subscription.kind);
                false
            }
        };

        if !still_listening {
            self.emit_listen(subscription.kind, false);
        }
    }
}
