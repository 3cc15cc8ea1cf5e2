//! Database models and API types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Re-export shared types from study-core
pub use study_core::{Card, Deck, SessionView, StudyMode, StudyRecord};

// === Database Entity Types ===

/// Learner identified by bearer token
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub token: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

/// Deck stored in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbDeck {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbDeck {
    /// Whether `user_id` may study this deck
    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.is_public || self.user_id == user_id
    }

    /// Convert to study-core Deck with the given cards
    pub fn to_core_deck(&self, cards: &[DbCard]) -> Deck {
        Deck {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            subject: self.subject.clone(),
            cards: cards.iter().map(DbCard::to_core_card).collect(),
        }
    }
}

/// Deck listing row with card count
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DeckInfo {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub is_public: bool,
    pub card_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Card stored in PostgreSQL
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbCard {
    pub id: Uuid,
    pub deck_id: Uuid,
    pub user_id: Uuid,
    pub front_text: String,
    pub back_text: String,
    pub front_image_url: Option<String>,
    pub back_image_url: Option<String>,
    pub difficulty_level: i16,
    pub created_at: DateTime<Utc>,
}

impl DbCard {
    /// Convert to study-core Card
    pub fn to_core_card(&self) -> Card {
        Card {
            id: self.id,
            front: self.front_text.clone(),
            back: self.back_text.clone(),
            front_image_url: self.front_image_url.clone(),
            back_image_url: self.back_image_url.clone(),
            difficulty: self.difficulty_level.clamp(1, 5) as u8,
        }
    }
}

/// Study result joined with its deck title, input to analytics
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudyResultRow {
    pub session_id: Uuid,
    pub deck_id: Uuid,
    pub deck_title: String,
    pub difficulty_rating: i16,
    pub time_spent_seconds: i32,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
}

/// Card count per difficulty level
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DifficultyCount {
    pub difficulty_level: i16,
    pub card_count: i64,
}

// === API Request/Response Types ===

// User types
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserRegisterRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserRegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserStatusResponse {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub last_seen_at: DateTime<Utc>,
}

// Deck types
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDeckRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl CreateDeckRequest {
    /// Check field constraints before insert or update
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeckListResponse {
    pub decks: Vec<DeckInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeckDetailResponse {
    pub deck: DbDeck,
    pub cards: Vec<DbCard>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCardRequest {
    pub front_text: String,
    pub back_text: String,
    #[serde(default)]
    pub front_image_url: Option<String>,
    #[serde(default)]
    pub back_image_url: Option<String>,
    #[serde(default = "default_difficulty")]
    pub difficulty_level: i16,
}

fn default_difficulty() -> i16 {
    1
}

impl CreateCardRequest {
    /// Check field constraints before insert
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.front_text.trim().is_empty() {
            return Err("front_text must not be empty".to_string());
        }
        if self.back_text.trim().is_empty() {
            return Err("back_text must not be empty".to_string());
        }
        if !(1..=5).contains(&self.difficulty_level) {
            return Err(format!(
                "difficulty_level must be between 1 and 5, got {}",
                self.difficulty_level
            ));
        }
        Ok(())
    }
}

// Study types
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub deck_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub mode: StudyMode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RateCardRequest {
    pub rating: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SelectOptionRequest {
    pub option: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswerRequest {
    pub card_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub view: SessionView,
}

// Analytics types
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub range: Option<String>,
}

// Generation types
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateFlashcardsRequest {
    pub content: String,
    pub subject: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateQuizRequest {
    pub deck_id: Uuid,
    #[serde(default = "default_count")]
    pub question_count: u32,
    #[serde(default = "default_question_types")]
    pub question_types: Vec<String>,
    #[serde(default = "default_level")]
    pub difficulty: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeckIdRequest {
    pub deck_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExplainConceptRequest {
    pub concept: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default = "default_level")]
    pub difficulty: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudyGuideRequest {
    pub deck_id: Uuid,
    pub topic: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExplanationResponse {
    pub explanation: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StudyGuideResponse {
    pub study_guide: String,
}

fn default_count() -> u32 {
    10
}

fn default_question_types() -> Vec<String> {
    vec!["multiple_choice".to_string()]
}

fn default_level() -> String {
    "medium".to_string()
}
