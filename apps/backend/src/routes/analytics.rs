//! Analytics endpoint

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;

use crate::error::{ApiError, Result};
use crate::models::AnalyticsQuery;
use crate::routes::auth::AuthenticatedUser;
use crate::services::analytics::{build_report, group_sessions, AnalyticsRange, AnalyticsReport};
use crate::AppState;

/// GET /api/analytics?range=7d|30d|90d
pub async fn report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsReport>> {
    let range = AnalyticsRange::parse(query.range.as_deref()).ok_or_else(|| {
        ApiError::BadRequest("range must be one of 7d, 30d, 90d".to_string())
    })?;

    let now = Utc::now();
    let rows = state
        .db
        .get_study_results_since(auth.user_id, range.start(now))
        .await?;
    let total_decks = state.db.count_decks(auth.user_id).await?;
    let difficulty = state.db.difficulty_counts(auth.user_id).await?;

    let sessions = group_sessions(&rows);
    Ok(Json(build_report(
        range,
        &sessions,
        total_decks,
        &difficulty,
        now.date_naive(),
    )))
}
