//! Learner registration and status endpoints

use axum::{extract::State, Extension, Json};

use crate::error::{ApiError, Result};
use crate::models::{UserRegisterRequest, UserRegisterResponse, UserStatusResponse};
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// POST /api/user/register
/// Creates a new learner and returns the token
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<UserRegisterRequest>,
) -> Result<Json<UserRegisterResponse>> {
    let user = state.db.create_user(payload.name.as_deref()).await?;

    tracing::info!("Registered new learner: {}", user.id);

    Ok(Json(UserRegisterResponse {
        user_id: user.id,
        token: user.token,
    }))
}

/// GET /api/user/status
pub async fn status(
    Extension(auth): Extension<AuthenticatedUser>,
    State(state): State<AppState>,
) -> Result<Json<UserStatusResponse>> {
    let user = state
        .db
        .get_user_by_token(&auth.token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Learner not found".to_string()))?;

    Ok(Json(UserStatusResponse {
        user_id: user.id,
        name: user.name,
        last_seen_at: user.last_seen_at,
    }))
}
