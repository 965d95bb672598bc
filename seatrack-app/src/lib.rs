mod location;
mod orientation;
mod settings;
mod state;

use log::LevelFilter;
use seatrack_logic::{MapSettings, OrientationEvent, RenderedView, Transition};
use tauri::{AppHandle, State};
use tauri_plugin_opener::OpenerExt;
use tauri_specta::{ErrorHandlingMode, collect_commands, collect_events};
use tokio::sync::RwLock;

use std::result::Result as StdResult;

use crate::{
    orientation::{OrientationListen, OrientationRelay},
    settings::{read_settings_from_store, write_settings_to_store},
    state::{AppState, AppStateHandle, Recenter, ViewStateUpdate},
};

type Result<T = (), E = String> = StdResult<T, E>;

// == VIEW LIFECYCLE COMMANDS ==

#[tauri::command]
#[specta::specta]
/// Mount the map view, call once the map screen is shown. Starts listening for orientation
/// readings (see [OrientationListen]) but does not start tracking. Replaces any view that is
/// still mounted.
async fn mount_view(app: AppHandle, state: State<'_, AppStateHandle>) -> Result {
    let settings = read_settings_from_store(&app);
    state.write().await.mount(&app, settings)
}

#[tauri::command]
#[specta::specta]
/// Unmount the map view, stops tracking and releases orientation listeners
async fn unmount_view(state: State<'_, AppStateHandle>) -> Result {
    state.write().await.unmount();
    Ok(())
}

#[tauri::command]
#[specta::specta]
/// Get everything needed to draw the map view, call after receiving a [ViewStateUpdate]
async fn get_view(state: State<'_, AppStateHandle>) -> Result<RenderedView> {
    let session = state.read().await.get_session()?;
    Ok(session.render().await)
}

// == TRACKING COMMANDS ==

#[tauri::command]
#[specta::specta]
/// Press the tracking button, starts tracking if idle and stops it otherwise
async fn toggle_tracking(state: State<'_, AppStateHandle>) -> Result<Transition> {
    let session = state.read().await.get_session()?;
    Ok(session.toggle_tracking().await)
}

#[tauri::command]
#[specta::specta]
/// Start tracking, does nothing if already tracking
async fn start_tracking(state: State<'_, AppStateHandle>) -> Result<Transition> {
    let session = state.read().await.get_session()?;
    Ok(session.start_tracking().await)
}

#[tauri::command]
#[specta::specta]
/// Stop tracking, does nothing if not tracking
async fn stop_tracking(state: State<'_, AppStateHandle>) -> Result<Transition> {
    let session = state.read().await.get_session()?;
    Ok(session.stop_tracking().await)
}

#[tauri::command]
#[specta::specta]
/// Forward a `deviceorientation` / `deviceorientationabsolute` reading from the webview.
/// Readings for kinds nobody listens to are dropped.
fn push_orientation(event: OrientationEvent, relay: State<'_, OrientationRelay>) -> Result {
    relay.dispatch(event);
    Ok(())
}

// == SETTINGS COMMANDS ==

#[tauri::command]
#[specta::specta]
/// Get the persisted map settings
fn get_settings(app: AppHandle) -> Result<MapSettings> {
    Ok(read_settings_from_store(&app))
}

#[tauri::command]
#[specta::specta]
/// Persist new map settings, they apply the next time the view is mounted
fn update_settings(new_settings: MapSettings, app: AppHandle) -> Result {
    write_settings_to_store(&app, &new_settings)
        .map_err(|err| err.context("Failed to save settings").to_string())
}

#[tauri::command]
#[specta::specta]
/// Open the support link in the system browser
fn open_support_link(app: AppHandle) -> Result {
    let url = read_settings_from_store(&app).support_url;
    app.opener()
        .open_url(url, None::<&str>)
        .map_err(|err| err.to_string())
}

pub fn mk_specta() -> tauri_specta::Builder {
    tauri_specta::Builder::<tauri::Wry>::new()
        .error_handling(ErrorHandlingMode::Throw)
        .commands(collect_commands![
            mount_view,
            unmount_view,
            get_view,
            toggle_tracking,
            start_tracking,
            stop_tracking,
            push_orientation,
            get_settings,
            update_settings,
            open_support_link,
        ])
        .events(collect_events![ViewStateUpdate, Recenter, OrientationListen])
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    let state = RwLock::new(AppState::Unmounted);

    let builder = mk_specta();

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(
            tauri_plugin_log::Builder::new()
                .level(LevelFilter::Debug)
                .build(),
        )
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_geolocation::init())
        .plugin(tauri_plugin_store::Builder::default().build())
        .invoke_handler(builder.invoke_handler())
        .manage(state)
        .manage(OrientationRelay::default())
        .setup(move |app| {
            builder.mount_events(app);
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
