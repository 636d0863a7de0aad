//! EVENTLOG - HTTP API
//! Thin axum layer: parses path segments and bodies, calls the store, and
//! maps outcomes to status codes.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};

use crate::clock::Clock;
use crate::error::EventLogError;
use crate::store::EventStore;
use crate::types::{AffectedLines, CandidateEvent, Event};
use crate::validator::Validator;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub validator: Validator,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            validator: Validator::new(clock),
        }
    }
}

/// Request failures, each mapped to one status code.
#[derive(Debug)]
pub enum ApiError {
    /// A path segment that should be an integer was not.
    NotANumber(String),
    /// The POST body was not a JSON array of events.
    BadBody(String),
    NotFound,
    Storage(EventLogError),
    /// The blocking task running a store call panicked or was cancelled.
    Worker(String),
}

impl From<EventLogError> for ApiError {
    fn from(err: EventLogError) -> Self {
        ApiError::Storage(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotANumber(raw) => {
                log::debug!("Rejecting non-numeric path segment {:?}", raw);
                StatusCode::UNPROCESSABLE_ENTITY.into_response()
            }
            ApiError::BadBody(reason) => {
                log::debug!("Rejecting malformed event batch: {}", reason);
                StatusCode::UNPROCESSABLE_ENTITY.into_response()
            }
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ApiError::Storage(err) => {
                log::error!("Store failure: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            ApiError::Worker(reason) => {
                log::error!("Store task failed: {}", reason);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the router for the event API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", get(get_all).post(register))
        .route("/events/{id}", get(get_by_id).delete(delete_by_id))
        .route("/events/getFlag/{flag}", get(get_by_flag))
        .route("/events/deleteflag/{flag}", delete(delete_by_flag))
        .with_state(state)
}

/// Run a mutating store call off the async workers; it may wait on the
/// write lock and fsync the WAL.
async fn run_blocking<T, F>(call: F) -> ApiResult<T>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|err| ApiError::Worker(err.to_string()))?
        .map_err(ApiError::from)
}

fn parse_int(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::NotANumber(raw.to_string()))
}

async fn get_by_id(State(state): State<AppState>, Path(raw): Path<String>) -> ApiResult<Json<Event>> {
    let id = parse_int(&raw)?;
    state
        .store
        .get_event_by_id(id)?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn get_all(State(state): State<AppState>) -> ApiResult<Json<Vec<Event>>> {
    Ok(Json(state.store.get_all_events()?))
}

async fn get_by_flag(State(state): State<AppState>, Path(raw): Path<String>) -> ApiResult<Json<Vec<Event>>> {
    let flag = parse_int(&raw)?;
    let events = state.store.get_events_by_flag(flag)?;
    if events.is_empty() {
        return Err(ApiError::NotFound);
    }
    Ok(Json(events))
}

async fn register(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<AffectedLines>> {
    let batch: Vec<CandidateEvent> =
        serde_json::from_slice(&body).map_err(|err| ApiError::BadBody(err.to_string()))?;

    let events = state.validator.validate(batch);
    let store = state.store.clone();
    let affected = run_blocking(move || store.register_new_events(events)).await?;
    Ok(Json(AffectedLines::from(affected)))
}

async fn delete_by_id(State(state): State<AppState>, Path(raw): Path<String>) -> ApiResult<Json<AffectedLines>> {
    let id = parse_int(&raw)?;
    let store = state.store.clone();
    let affected = run_blocking(move || store.delete_by_id(id)).await?;
    Ok(Json(AffectedLines::from(affected)))
}

async fn delete_by_flag(State(state): State<AppState>, Path(raw): Path<String>) -> ApiResult<Json<AffectedLines>> {
    let flag = parse_int(&raw)?;
    let store = state.store.clone();
    let affected = run_blocking(move || store.delete_by_flag(flag)).await?;
    Ok(Json(AffectedLines::from(affected)))
}
