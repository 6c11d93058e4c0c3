use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{AudioError, ErrorCode};
use crate::session::RecordingSession;
use crate::songs::SongCatalog;
use crate::tracker::RangeSnapshot;

use super::{page, sse};

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<SongCatalog>,
    /// Live session driven by the `/range` endpoints, if one is attached
    pub session: Option<Arc<RecordingSession>>,
}

impl AppState {
    pub fn new(catalog: SongCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            session: None,
        }
    }

    pub fn with_session(mut self, session: Arc<RecordingSession>) -> Self {
        self.session = Some(session);
        self
    }

    fn session(&self) -> Result<Arc<RecordingSession>, HttpServerError> {
        self.session.clone().ok_or(HttpServerError::SessionDetached)
    }
}

/// Lookup form fields; anything missing or malformed counts as unmeasured.
#[derive(Debug, Default, Deserialize)]
pub struct LookupForm {
    pub lowest_note: Option<String>,
    pub highest_note: Option<String>,
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    SessionDetached,
    Audio(AudioError),
    Internal(String),
}

impl From<AudioError> for HttpServerError {
    fn from(err: AudioError) -> Self {
        Self::Audio(err)
    }
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::SessionDetached => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({ "error": "no recording session attached" }),
            ),
            Self::Audio(err) => {
                let status = match &err {
                    AudioError::AlreadyRecording => StatusCode::CONFLICT,
                    err if err.is_access_failure() => StatusCode::SERVICE_UNAVAILABLE,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (
                    status,
                    serde_json::json!({ "error": err.message(), "code": err.code() }),
                )
            }
            Self::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": msg }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub songs: usize,
    pub session_attached: bool,
    pub recording: bool,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/songs", get(lookup_songs).post(lookup_songs))
        .route("/health", get(health))
        .route("/range", get(range_snapshot))
        .route("/range/start", post(start_recording))
        .route("/range/stop", post(stop_recording))
        .route("/range/reset", post(reset_range))
        .route("/range/stream", get(range_stream))
        .with_state(state)
}

/// Run the HTTP server loop until Ctrl-C.
pub async fn run_http_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding HTTP listener on {}", addr))?;
    info!("[HTTP] Listening on http://{}", addr);

    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("[HTTP] Shutdown requested");
        })
        .await
        .context("serving HTTP router")?;
    Ok(())
}

/// Lenient integer coercion for form values.
///
/// Leading whitespace is skipped, then the longest numeric prefix is read
/// (sign, digits, fraction, exponent) and truncated toward zero. Anything
/// else yields 0. `"62abc"` is 62, `"6.2e1"` is 62, `"abc"` is 0.
/// Out of range values saturate.
pub fn coerce_note(raw: Option<&str>) -> i32 {
    let Some(raw) = raw else {
        return 0;
    };
    let trimmed = raw.trim_start();
    let prefix = &trimmed[..numeric_prefix_len(trimmed.as_bytes())];
    // `as` saturates at the i32 bounds
    prefix.parse::<f64>().map(|value| value.trunc() as i32).unwrap_or(0)
}

/// Length of the leading decimal number in `bytes`, 0 when there is none
fn numeric_prefix_len(bytes: &[u8]) -> usize {
    let digits_from = |start: usize| {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let integer = digits_from(end);
    end += integer;
    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = digits_from(end + 1);
        if integer > 0 || fraction > 0 {
            end += 1 + fraction;
        }
    }
    if integer == 0 && fraction == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_digits = digits_from(exponent);
        if exponent_digits > 0 {
            end = exponent + exponent_digits;
        }
    }
    end
}

pub async fn index() -> Html<String> {
    Html(page::render_index_page())
}

/// Song lookup; accepts the form as a POST body or a GET query string.
pub async fn lookup_songs(
    State(state): State<AppState>,
    form: Option<Form<LookupForm>>,
) -> Html<String> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let lowest_note = coerce_note(form.lowest_note.as_deref());
    let highest_note = coerce_note(form.highest_note.as_deref());

    let songs = state.catalog.matching(lowest_note, highest_note);
    info!(
        "[HTTP] Lookup {}..{} matched {} songs",
        lowest_note,
        highest_note,
        songs.len()
    );

    Html(page::render_lookup_page(lowest_note, highest_note, &songs))
}

pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, HttpServerError> {
    let recording = match state.session.clone() {
        Some(session) => blocking(move || session.is_recording()).await?,
        None => false,
    };
    Ok(Json(HealthResponse {
        status: "ok",
        songs: state.catalog.len(),
        session_attached: state.session.is_some(),
        recording,
    }))
}

pub async fn range_snapshot(
    State(state): State<AppState>,
) -> Result<Json<RangeSnapshot>, HttpServerError> {
    let session = state.session()?;
    let snapshot = blocking(move || session.snapshot()).await??;
    Ok(Json(snapshot))
}

/// Session calls take std mutexes, so they run on the blocking pool
async fn blocking<T, F>(f: F) -> Result<T, HttpServerError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| HttpServerError::Internal(format!("session task failed: {}", err)))
}

/// Run a blocking session call off the async workers, returning the snapshot
async fn run_session_op<F>(state: AppState, op: F) -> Result<Json<RangeSnapshot>, HttpServerError>
where
    F: FnOnce(&RecordingSession) -> Result<(), AudioError> + Send + 'static,
{
    let session = state.session()?;
    let snapshot = blocking(move || {
        op(&session)?;
        session.snapshot()
    })
    .await??;
    Ok(Json(snapshot))
}

pub async fn start_recording(
    State(state): State<AppState>,
) -> Result<Json<RangeSnapshot>, HttpServerError> {
    run_session_op(state, RecordingSession::start).await
}

pub async fn stop_recording(
    State(state): State<AppState>,
) -> Result<Json<RangeSnapshot>, HttpServerError> {
    run_session_op(state, RecordingSession::stop).await
}

pub async fn reset_range(
    State(state): State<AppState>,
) -> Result<Json<RangeSnapshot>, HttpServerError> {
    run_session_op(state, RecordingSession::reset).await
}

pub async fn range_stream(
    State(state): State<AppState>,
) -> Result<sse::RangeEventStream, HttpServerError> {
    let session = state.session()?;
    Ok(sse::range_events(&session))
}
