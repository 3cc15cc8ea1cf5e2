//! Study session endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

fn respond(session_id: Uuid, view: SessionView) -> Json<SessionResponse> {
    Json(SessionResponse { session_id, view })
}

/// POST /api/study/sessions
/// Opens a session over a visible deck
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let deck = state.db.load_core_deck(payload.deck_id, auth.user_id).await?;
    let (session_id, view) = state.sessions.create(auth.user_id, deck)?;
    Ok((StatusCode::CREATED, respond(session_id, view)))
}

/// GET /api/study/sessions/{id}
pub async fn show(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let view = state.sessions.view(session_id, auth.user_id)?;
    Ok(respond(session_id, view))
}

/// POST /api/study/sessions/{id}/start
pub async fn start(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Json<SessionResponse>> {
    let view = state.sessions.start(session_id, auth.user_id, payload.mode)?;
    Ok(respond(session_id, view))
}

/// POST /api/study/sessions/{id}/reveal
pub async fn reveal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let view = state.sessions.reveal(session_id, auth.user_id)?;
    Ok(respond(session_id, view))
}

/// POST /api/study/sessions/{id}/rate
pub async fn rate(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<RateCardRequest>,
) -> Result<Json<SessionResponse>> {
    let view = state.sessions.rate(session_id, auth.user_id, payload.rating)?;
    Ok(respond(session_id, view))
}

/// POST /api/study/sessions/{id}/select
pub async fn select(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SelectOptionRequest>,
) -> Result<Json<SessionResponse>> {
    let view = state.sessions.select(session_id, auth.user_id, payload.option)?;
    Ok(respond(session_id, view))
}

/// POST /api/study/sessions/{id}/submit
pub async fn submit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<SessionResponse>> {
    let view = state.sessions.submit(session_id, auth.user_id, payload.card_id)?;
    Ok(respond(session_id, view))
}

/// POST /api/study/sessions/{id}/reset
pub async fn reset(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionResponse>> {
    let view = state.sessions.reset(session_id, auth.user_id)?;
    Ok(respond(session_id, view))
}

/// DELETE /api/study/sessions/{id}
pub async fn exit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.sessions.exit(session_id, auth.user_id)?;
    Ok(StatusCode::NO_CONTENT)
}
