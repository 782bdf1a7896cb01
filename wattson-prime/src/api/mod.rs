pub mod devices;
pub mod error;
pub mod models;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::AppState;
use crate::store::DeviceStore;

pub fn router<S: DeviceStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/devices",
            get(devices::list_devices::<S>).post(devices::create_device::<S>),
        )
        .route("/devices/{id}", delete(devices::delete_device::<S>))
        .route("/devices/{id}/toggle", post(devices::toggle_device::<S>))
        .route("/dates", get(devices::list_dates::<S>))
        .route("/tally", get(devices::get_tally::<S>))
        .route("/summary", get(devices::get_summary::<S>))
        .route("/refresh", post(devices::refresh::<S>))
}

/// Board API mounted under `/api`, with its state applied.
pub fn api_router<S: DeviceStore>(state: AppState<S>) -> Router {
    Router::new().nest("/api", router()).with_state(state)
}
