use anyhow::Context;
use log::warn;
use seatrack_logic::{MapSettings, prelude::Result};
use tauri::AppHandle;
use tauri_plugin_store::StoreExt;

const STORE_NAME: &str = "settings";
const SETTINGS_KEY: &str = "map";

/// Read persisted map settings, falling back to the defaults if there are none or they
/// can't be read.
pub fn read_settings_from_store(app: &AppHandle) -> MapSettings {
    let store = match app.store(STORE_NAME) {
        Ok(store) => store,
        Err(why) => {
            warn!("Couldn't open settings store, using defaults: {why:?}");
            return MapSettings::default();
        }
    };

    let settings = store
        .get(SETTINGS_KEY)
        .and_then(|v| serde_json::from_value::<MapSettings>(v).ok())
        .unwrap_or_default();

    store.close_resource();

    settings
}

pub fn write_settings_to_store(app: &AppHandle, settings: &MapSettings) -> Result {
    let store = app
        .store(STORE_NAME)
        .context("Couldn't open settings store")?;

    let value = serde_json::to_value(settings).context("Failed to serialize settings")?;
    store.set(SETTINGS_KEY, value);
    Ok(())
}
