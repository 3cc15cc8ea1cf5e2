//! Content generation endpoints

use axum::{extract::State, Extension, Json};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::services::analytics::{group_sessions, SessionStats};
use crate::services::llm::{self, AdaptivePlan, FlashcardSet, QuizSet, Recommendations};
use crate::AppState;

const HISTORY_DAYS: i64 = 90;
const HISTORY_SESSIONS: usize = 10;

/// Most recent finished sessions, optionally for one deck
async fn recent_sessions(
    state: &AppState,
    user_id: Uuid,
    deck_id: Option<Uuid>,
) -> Result<Vec<SessionStats>> {
    let since = Utc::now() - Duration::days(HISTORY_DAYS);
    let rows = state.db.get_study_results_since(user_id, since).await?;
    let mut sessions: Vec<SessionStats> = group_sessions(&rows)
        .into_iter()
        .filter(|s| deck_id.map_or(true, |id| s.deck_id == id))
        .collect();
    let skip = sessions.len().saturating_sub(HISTORY_SESSIONS);
    sessions.drain(..skip);
    Ok(sessions)
}

/// Cards of a visible deck, rejecting empty decks
async fn deck_cards(state: &AppState, deck_id: Uuid, user_id: Uuid) -> Result<Vec<DbCard>> {
    state.db.get_visible_deck(deck_id, user_id).await?;
    let cards = state.db.get_cards(deck_id).await?;
    if cards.is_empty() {
        return Err(ApiError::BadRequest("deck has no cards".to_string()));
    }
    Ok(cards)
}

/// POST /api/ai/generate-flashcards
pub async fn generate_flashcards(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthenticatedUser>,
    Json(payload): Json<GenerateFlashcardsRequest>,
) -> Result<Json<FlashcardSet>> {
    if payload.content.trim().is_empty() {
        return Err(ApiError::BadRequest("content must not be empty".to_string()));
    }

    let prompt = llm::flashcards_prompt(&payload.content, &payload.subject, payload.count);
    let set: FlashcardSet = state.llm.generate_object(&prompt).await?;
    tracing::info!(count = set.flashcards.len(), "Generated flashcards");
    Ok(Json(set))
}

/// POST /api/ai/generate-quiz
pub async fn generate_quiz(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<Json<QuizSet>> {
    let cards = deck_cards(&state, payload.deck_id, auth.user_id).await?;
    let prompt = llm::quiz_prompt(
        &cards,
        payload.question_count,
        &payload.question_types,
        &payload.difficulty,
    );
    let quiz: QuizSet = state.llm.generate_object(&prompt).await?;
    Ok(Json(quiz))
}

/// POST /api/ai/adaptive-learning
pub async fn adaptive_learning(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<DeckIdRequest>,
) -> Result<Json<AdaptivePlan>> {
    let cards = deck_cards(&state, payload.deck_id, auth.user_id).await?;
    let sessions = recent_sessions(&state, auth.user_id, Some(payload.deck_id)).await?;
    let prompt = llm::adaptive_prompt(&cards, &sessions);
    let plan: AdaptivePlan = state.llm.generate_object(&prompt).await?;
    Ok(Json(plan))
}

/// POST /api/ai/recommendations
pub async fn recommendations(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<Recommendations>> {
    let sessions = recent_sessions(&state, auth.user_id, None).await?;
    let prompt = llm::recommendations_prompt(&sessions);
    let recommendations: Recommendations = state.llm.generate_object(&prompt).await?;
    Ok(Json(recommendations))
}

/// POST /api/ai/explain-concept
pub async fn explain_concept(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthenticatedUser>,
    Json(payload): Json<ExplainConceptRequest>,
) -> Result<Json<ExplanationResponse>> {
    if payload.concept.trim().is_empty() {
        return Err(ApiError::BadRequest("concept must not be empty".to_string()));
    }

    let prompt = llm::explain_prompt(
        &payload.concept,
        payload.context.as_deref(),
        &payload.difficulty,
    );
    let explanation = state.llm.generate_text(&prompt).await?;
    Ok(Json(ExplanationResponse { explanation }))
}

/// POST /api/ai/study-guide
pub async fn study_guide(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<StudyGuideRequest>,
) -> Result<Json<StudyGuideResponse>> {
    let cards = deck_cards(&state, payload.deck_id, auth.user_id).await?;
    let prompt = llm::study_guide_prompt(&payload.topic, &cards);
    let study_guide = state.llm.generate_text(&prompt).await?;
    Ok(Json(StudyGuideResponse { study_guide }))
}
