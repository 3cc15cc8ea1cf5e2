//! Deck endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;
use crate::routes::auth::AuthenticatedUser;
use crate::AppState;

/// GET /api/decks
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
) -> Result<Json<DeckListResponse>> {
    let decks = state.db.list_decks(auth.user_id).await?;
    Ok(Json(DeckListResponse { decks }))
}

/// POST /api/decks
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Json(payload): Json<CreateDeckRequest>,
) -> Result<(StatusCode, Json<DbDeck>)> {
    payload.validate().map_err(ApiError::BadRequest)?;

    let deck = state.db.create_deck(auth.user_id, &payload).await?;
    tracing::info!(deck_id = %deck.id, "Created deck");
    Ok((StatusCode::CREATED, Json(deck)))
}

/// GET /api/decks/{id}
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(deck_id): Path<Uuid>,
) -> Result<Json<DeckDetailResponse>> {
    let deck = state.db.get_visible_deck(deck_id, auth.user_id).await?;
    let cards = state.db.get_cards(deck_id).await?;
    Ok(Json(DeckDetailResponse { deck, cards }))
}

/// PUT /api/decks/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(deck_id): Path<Uuid>,
    Json(payload): Json<CreateDeckRequest>,
) -> Result<Json<DbDeck>> {
    state.db.get_owned_deck(deck_id, auth.user_id).await?;
    payload.validate().map_err(ApiError::BadRequest)?;

    let deck = state.db.update_deck(deck_id, &payload).await?;
    tracing::info!(deck_id = %deck.id, "Updated deck");
    Ok(Json(deck))
}

/// POST /api/decks/{id}/cards
pub async fn add_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(deck_id): Path<Uuid>,
    Json(payload): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<DbCard>)> {
    let deck = state.db.get_owned_deck(deck_id, auth.user_id).await?;
    payload.validate().map_err(ApiError::BadRequest)?;

    let card = state.db.add_card(deck.id, auth.user_id, &payload).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// PUT /api/decks/{id}/cards/{card_id}
pub async fn update_card(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((deck_id, card_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<CreateCardRequest>,
) -> Result<Json<DbCard>> {
    state.db.get_owned_deck(deck_id, auth.user_id).await?;
    payload.validate().map_err(ApiError::BadRequest)?;

    let card = state
        .db
        .update_card(deck_id, card_id, &payload)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Card {} not found", card_id)))?;
    Ok(Json(card))
}
