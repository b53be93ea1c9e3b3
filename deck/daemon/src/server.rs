//! HTTP Server Implementation
//!
//! This module maps the deck daemon's HTTP surface onto `deck-core`:
//! - `/deck` starts, stops, lists and deletes decks
//! - `/upload` stores a deck file
//! - `/table` turns a tab-separated body into a deck file
//! - `/media` plays a media file
//! - `/status` reports the presentation slot
//!
//! # Request Flow
//!
//! ```text
//!   client ──HTTP──▶ axum Router ──▶ handler ──┬──▶ DeckController (start/stop/media)
//!                                              ├──▶ DeckLibrary    (blocking pool)
//!                                              └──▶ TableLayout    (blocking pool)
//! ```
//!
//! Every success is a small JSON object; every failure is `{"error": "..."}`
//! with a status code chosen by [`ApiError`].

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use deck_core::{DeckController, DeckError, DeckLibrary, LibraryError, TableError};

/// Largest accepted request body (uploads can be video files)
pub const MAX_BODY_BYTES: usize = 512 * 1024 * 1024;

/// Header naming the target file of `/upload` and `/table`
const DECK_HEADER: &str = "Deck";

/// Header naming the file played by `/media`
const MEDIA_HEADER: &str = "Media";

/// `cmd` value that stops the running deck
const STOP_COMMAND: &str = "stop";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    controller: Arc<DeckController>,
    library: DeckLibrary,
}

impl AppState {
    /// Bundle the controller and library for the router
    pub fn new(controller: Arc<DeckController>, library: DeckLibrary) -> Self {
        Self {
            controller,
            library,
        }
    }

    /// The presentation controller
    pub fn controller(&self) -> &Arc<DeckController> {
        &self.controller
    }
}

/// HTTP error with the JSON body `{"error": message}`
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 406, used for missing or unusable names
    pub fn not_acceptable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_ACCEPTABLE, message)
    }

    /// 409
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// 422
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// 500
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(status = %self.status, error = %self.message, "Request failed");
        } else {
            info!(status = %self.status, error = %self.message, "Request rejected");
        }
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<DeckError> for ApiError {
    fn from(err: DeckError) -> Self {
        let message = err.to_string();
        match err {
            DeckError::EmptyDeckName | DeckError::EmptyMediaName => Self::not_acceptable(message),
            DeckError::AlreadyRunning { .. } | DeckError::NotRunning => Self::conflict(message),
            DeckError::Spawn(_) | DeckError::Lookup(_) | DeckError::Kill(_) => {
                Self::internal(message)
            }
        }
    }
}

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        let message = err.to_string();
        match err {
            LibraryError::InvalidName(_) => Self::not_acceptable(message),
            LibraryError::NotFound(_) => Self::not_found(message),
            LibraryError::Io { .. } => Self::internal(message),
        }
    }
}

impl From<TableError> for ApiError {
    fn from(err: TableError) -> Self {
        let message = err.to_string();
        match err {
            TableError::MalformedHeader { .. } => Self::unprocessable(message),
            TableError::Io(_) => Self::internal(message),
        }
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

/// Query string of `POST /deck`
#[derive(Debug, Default, Deserialize)]
pub struct DeckQuery {
    /// Duration token, or `stop`
    cmd: Option<String>,
}

impl DeckQuery {
    fn command(&self) -> Option<&str> {
        self.cmd.as_deref().filter(|c| !c.is_empty())
    }
}

/// Build the daemon router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/deck", get(list_decks).post(deck_command))
        .route("/deck/", get(list_decks).post(deck_command))
        .route("/deck/:name", post(named_deck_command).delete(remove_deck))
        .route("/status", get(deck_status))
        .route("/upload", post(upload).put(upload))
        .route("/upload/", post(upload).put(upload))
        .route("/table", post(table))
        .route("/table/", post(table))
        .route("/media", post(media))
        .route("/media/", post(media))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// /deck
// =============================================================================

async fn list_decks(State(state): State<AppState>) -> ApiResult {
    let library = state.library.clone();
    let decks = blocking(move || library.list()).await??;
    info!(count = decks.len(), "List decks");
    Ok(Json(json!({ "decks": decks })))
}

async fn deck_command(State(state): State<AppState>, Query(query): Query<DeckQuery>) -> ApiResult {
    match query.command() {
        Some(STOP_COMMAND) => stop_deck(&state).await,
        Some(_) => Err(DeckError::EmptyDeckName.into()),
        None => Err(ApiError::bad_request("deck: need a cmd")),
    }
}

async fn named_deck_command(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<DeckQuery>,
) -> ApiResult {
    match query.command() {
        Some(STOP_COMMAND) => stop_deck(&state).await,
        Some(duration) => {
            let deck = deck_core::sanitize_name(&name).unwrap_or_default();
            let started = state.controller.start(&deck, duration).await?;
            Ok(Json(json!({
                "deckpid": started.pid.to_string(),
                "deck": started.deck,
                "duration": started.duration,
            })))
        }
        None => Err(ApiError::bad_request("deck: need a cmd")),
    }
}

async fn stop_deck(state: &AppState) -> ApiResult {
    let stopped = state.controller.stop().await?;
    Ok(Json(json!({ "stop": stopped.pid.to_string() })))
}

async fn remove_deck(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult {
    let library = state.library.clone();
    let removed = blocking(move || library.remove(&name)).await??;
    Ok(Json(json!({ "remove": removed })))
}

async fn deck_status(State(state): State<AppState>) -> ApiResult {
    let status = state.controller.status().await;
    serde_json::to_value(status)
        .map(Json)
        .map_err(|e| ApiError::internal(e.to_string()))
}

// =============================================================================
// /upload, /table, /media
// =============================================================================

async fn upload(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let target = required_header(&headers, DECK_HEADER, "upload: no deckpath")?;
    let library = state.library.clone();
    let name = blocking(move || library.write(&target, &body)).await??;
    Ok(Json(json!({ "upload": name })))
}

async fn table(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult {
    let target = required_header(&headers, DECK_HEADER, "table: no deckpath")?;
    let library = state.library.clone();

    let name = blocking(move || -> Result<String, ApiError> {
        let (name, file) = library.create(&target)?;
        let summary = deck_core::generate(&body[..], file)?;
        info!(name = %name, rows = summary.rows, columns = summary.columns, "Table written");
        Ok(name)
    })
    .await??;

    Ok(Json(json!({ "table": name })))
}

async fn media(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let raw = required_header(&headers, MEDIA_HEADER, "media: need a media file")?;
    let name = deck_core::sanitize_name(&raw).unwrap_or_default();
    let started = state.controller.play_media(&name).await?;
    Ok(Json(json!({
        "deckpid": started.pid.to_string(),
        "media": started.media,
    })))
}

// =============================================================================
// Helpers
// =============================================================================

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("not found: {method} {}", uri.path()))
}

fn required_header(headers: &HeaderMap, name: &str, missing: &str) -> Result<String, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::not_acceptable(missing))
}

/// Run filesystem work off the async workers
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("worker failed: {e}")))
}
