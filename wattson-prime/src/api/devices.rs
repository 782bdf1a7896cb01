use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::info;
use wattson_core::{DayKey, DeviceId, DeviceQueryBuilder, StatusFilter, Watts};

use super::error::ApiError;
use super::models::{
    ApiResponse, DayParams, DeviceCreateRequest, DeviceListParams, DeviceListResponse,
    DeviceResponse, RefreshResponse, SummaryParams, SummaryResponse, TallyResponse,
};
use crate::AppState;
use crate::store::DeviceStore;

// An absent or empty date selects every day.
fn parse_day(date: Option<&str>) -> Result<Option<DayKey>, ApiError> {
    match date.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: wattson_core::InvalidDayKey| ApiError::BadRequest(e.to_string())),
    }
}

fn success_response<T: serde::Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(ApiResponse::success(data))).into_response()
}

pub async fn list_devices<S: DeviceStore>(
    State(state): State<AppState<S>>,
    Query(params): Query<DeviceListParams>,
) -> Result<Response, ApiError> {
    let status = params
        .status
        .as_deref()
        .unwrap_or_default()
        .parse::<StatusFilter>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let query = DeviceQueryBuilder::new()
        .maybe_day(parse_day(params.date.as_deref())?)
        .status(status)
        .search(params.search.unwrap_or_default())
        .build();

    let view = state.board.view(&query).await;
    let tz = state.board.time_zone();
    let items: Vec<DeviceResponse> = view
        .devices
        .iter()
        .map(|device| DeviceResponse::new(device, tz))
        .collect();

    Ok(success_response(
        StatusCode::OK,
        DeviceListResponse {
            count: items.len(),
            items,
            tally: view.tally.into(),
        },
    ))
}

pub async fn list_dates<S: DeviceStore>(State(state): State<AppState<S>>) -> Response {
    success_response(StatusCode::OK, state.board.dates().await)
}

pub async fn get_tally<S: DeviceStore>(
    State(state): State<AppState<S>>,
    Query(params): Query<DayParams>,
) -> Result<Response, ApiError> {
    let day = parse_day(params.date.as_deref())?;
    let tally = state.board.tally(day.as_ref()).await;
    Ok(success_response(StatusCode::OK, TallyResponse::from(tally)))
}

pub async fn get_summary<S: DeviceStore>(
    State(state): State<AppState<S>>,
    Query(params): Query<SummaryParams>,
) -> Result<Response, ApiError> {
    let day = parse_day(params.date.as_deref())?;
    let limit = params.limit.unwrap_or(state.top_devices);

    let summary = state.board.summary(day.as_ref(), limit).await;
    let tz = state.board.time_zone();

    Ok(success_response(
        StatusCode::OK,
        SummaryResponse {
            total_power: summary.total.get(),
            top: summary
                .top
                .iter()
                .map(|device| DeviceResponse::new(device, tz))
                .collect(),
        },
    ))
}

pub async fn create_device<S: DeviceStore>(
    State(state): State<AppState<S>>,
    Json(req): Json<DeviceCreateRequest>,
) -> Result<Response, ApiError> {
    let current_power = req
        .current_power
        .map(Watts::new)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let device = state
        .board
        .add_device(&req.name, req.kind, current_power)
        .await?;

    Ok(success_response(
        StatusCode::CREATED,
        DeviceResponse::new(&device, state.board.time_zone()),
    ))
}

pub async fn delete_device<S: DeviceStore>(
    Path(id): Path<String>,
    State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
    state.board.remove_device(&DeviceId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn toggle_device<S: DeviceStore>(
    Path(id): Path<String>,
    State(state): State<AppState<S>>,
) -> Result<Response, ApiError> {
    let device = state.board.toggle(&DeviceId::from(id)).await?;
    Ok(success_response(
        StatusCode::OK,
        DeviceResponse::new(&device, state.board.time_zone()),
    ))
}

pub async fn refresh<S: DeviceStore>(State(state): State<AppState<S>>) -> Result<Response, ApiError> {
    let devices = state.board.refresh().await?;
    info!(devices, "snapshot reloaded on request");
    Ok(success_response(StatusCode::OK, RefreshResponse { devices }))
}
