use crate::analysis::Analyzer;
use crate::controller::{failure_message, AnalysisController, Snapshot};
use crate::models::{AnalysisResult, AnalyzeRequest, ErrorResponse, Phase};
use crate::view::{self, Pitch, SAMPLE_PITCHES};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<dyn Analyzer>,
    sessions: Arc<DashMap<Uuid, Arc<AnalysisController>>>,
    session_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            analyzer,
            sessions: Arc::new(DashMap::new()),
            session_ttl: chrono::Duration::seconds(crate::config::DEFAULT_SESSION_TTL_SECS as i64),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        self
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Drops sessions whose last state change is older than the TTL. Sessions
    /// still waiting on an analysis are kept; they settle within the client
    /// timeout and then age normally.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, controller| {
            let snapshot = controller.snapshot();
            snapshot.state.is_loading() || now - snapshot.updated_at <= self.session_ttl
        });
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            debug!(evicted, "Evicted expired sessions");
        }
        evicted
    }

    fn session(&self, id: Uuid) -> Result<Arc<AnalysisController>, ApiError> {
        self.sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ApiError::SessionNotFound)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/samples", get(samples))
        .route("/analyze", post(analyze))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/submit", post(submit))
        .route("/sessions/:id/reset", post(reset))
        .route("/sessions/:id/report", get(report))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    BlankPitch,
    SessionNotFound,
    NoResult,
    Analysis(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BlankPitch => (StatusCode::BAD_REQUEST, view::BlankPitch.to_string()),
            ApiError::SessionNotFound => (StatusCode::NOT_FOUND, "Session not found".to_string()),
            ApiError::NoResult => (
                StatusCode::CONFLICT,
                "Session has no completed analysis".to_string(),
            ),
            ApiError::Analysis(message) => (StatusCode::BAD_GATEWAY, message),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// What a front end needs to draw one session.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub phase: Phase,
    pub is_loading: bool,
    pub error: Option<String>,
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loading_phrase: Option<&'static str>,
    pub updated_at: DateTime<Utc>,
}

impl SessionView {
    fn new(session_id: Uuid, snapshot: Snapshot) -> Self {
        let loading_phrase = snapshot.loading_since.map(|since| {
            let elapsed = (Utc::now() - since).to_std().unwrap_or_default();
            view::loading_phrase(elapsed)
        });
        let state = snapshot.state;
        Self {
            session_id,
            phase: state.phase(),
            is_loading: state.is_loading(),
            error: state.error().map(str::to_string),
            result: state.result().cloned(),
            loading_phrase,
            updated_at: snapshot.updated_at,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn samples() -> Json<Vec<view::input::SamplePitch>> {
    Json(SAMPLE_PITCHES.to_vec())
}

#[instrument(skip(state, req))]
async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let pitch = Pitch::parse(req.pitch).map_err(|_| ApiError::BlankPitch)?;
    let result = state
        .analyzer
        .analyze(pitch.as_str())
        .await
        .map_err(|e| ApiError::Analysis(failure_message(&e)))?;
    Ok(Json(result))
}

#[instrument(skip(state))]
async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionView>) {
    state.evict_expired(Utc::now());
    let session_id = Uuid::new_v4();
    let controller = Arc::new(AnalysisController::new(Arc::clone(&state.analyzer)));
    let view = SessionView::new(session_id, controller.snapshot());
    state.sessions.insert(session_id, controller);
    info!("Created session {}", session_id);
    (StatusCode::CREATED, Json(view))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let controller = state.session(id)?;
    Ok(Json(SessionView::new(id, controller.snapshot())))
}

#[instrument(skip(state))]
async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(ApiError::SessionNotFound)
}

#[instrument(skip(state, req))]
async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let controller = state.session(id)?;
    let pitch = Pitch::parse(req.pitch).map_err(|_| ApiError::BlankPitch)?;
    controller.spawn_submit(pitch);
    info!("Submitted pitch for session {}", id);
    Ok((StatusCode::ACCEPTED, Json(SessionView::new(id, controller.snapshot()))))
}

#[instrument(skip(state))]
async fn reset(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SessionView>, ApiError> {
    let controller = state.session(id)?;
    controller.reset();
    Ok(Json(SessionView::new(id, controller.snapshot())))
}

async fn report(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Response, ApiError> {
    let controller = state.session(id)?;
    let app_state = controller.state();
    let result = app_state.result().ok_or(ApiError::NoResult)?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        view::render_markdown(result),
    )
        .into_response())
}
