//! PostgreSQL database operations

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};
use study_core::ResultSink;
use uuid::Uuid;

use crate::error::{ApiError, Result};
use crate::models::*;

/// Database wrapper with connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to PostgreSQL and create connection pool
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create a pool that connects on first use
    pub fn connect_lazy(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_lazy(database_url)?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ApiError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // === User Repository ===

    /// Create a new learner with generated token
    pub async fn create_user(&self, name: Option<&str>) -> Result<User> {
        let token = Uuid::new_v4().to_string();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (token, name)
            VALUES ($1, $2)
            RETURNING id, token, name, created_at, last_seen_at
            "#,
        )
        .bind(&token)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Get learner by token
    pub async fn get_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, token, name, created_at, last_seen_at
            FROM users
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Update learner last_seen_at timestamp
    pub async fn update_last_seen(&self, user_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET last_seen_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // === Deck Repository ===

    /// Create a deck owned by `user_id`
    pub async fn create_deck(&self, user_id: Uuid, request: &CreateDeckRequest) -> Result<DbDeck> {
        let deck = sqlx::query_as::<_, DbDeck>(
            r#"
            INSERT INTO decks (user_id, title, description, subject, is_public)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, description, subject, is_public, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(request.title.trim())
        .bind(&request.description)
        .bind(&request.subject)
        .bind(request.is_public)
        .fetch_one(&self.pool)
        .await?;

        Ok(deck)
    }

    /// List decks owned by a learner with their card counts
    pub async fn list_decks(&self, user_id: Uuid) -> Result<Vec<DeckInfo>> {
        let decks = sqlx::query_as::<_, DeckInfo>(
            r#"
            SELECT d.id, d.title, d.description, d.subject, d.is_public,
                   COUNT(c.id) as card_count, d.created_at
            FROM decks d
            LEFT JOIN cards c ON c.deck_id = d.id
            WHERE d.user_id = $1
            GROUP BY d.id
            ORDER BY d.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(decks)
    }

    /// Get deck by ID
    pub async fn get_deck(&self, deck_id: Uuid) -> Result<Option<DbDeck>> {
        let deck = sqlx::query_as::<_, DbDeck>(
            r#"
            SELECT id, user_id, title, description, subject, is_public, created_at, updated_at
            FROM decks
            WHERE id = $1
            "#,
        )
        .bind(deck_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(deck)
    }

    /// Replace a deck's editable fields and bump `updated_at`
    pub async fn update_deck(&self, deck_id: Uuid, request: &CreateDeckRequest) -> Result<DbDeck> {
        let deck = sqlx::query_as::<_, DbDeck>(
            r#"
            UPDATE decks
            SET title = $2, description = $3, subject = $4, is_public = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, title, description, subject, is_public, created_at, updated_at
            "#,
        )
        .bind(deck_id)
        .bind(request.title.trim())
        .bind(&request.description)
        .bind(&request.subject)
        .bind(request.is_public)
        .fetch_one(&self.pool)
        .await?;

        Ok(deck)
    }

    /// Get a deck owned by the learner, or NotFound
    pub async fn get_owned_deck(&self, deck_id: Uuid, user_id: Uuid) -> Result<DbDeck> {
        self.get_deck(deck_id)
            .await?
            .filter(|deck| deck.user_id == user_id)
            .ok_or_else(|| ApiError::NotFound(format!("Deck {} not found", deck_id)))
    }

    /// Get a deck the learner may study, or NotFound
    pub async fn get_visible_deck(&self, deck_id: Uuid, user_id: Uuid) -> Result<DbDeck> {
        self.get_deck(deck_id)
            .await?
            .filter(|deck| deck.is_visible_to(user_id))
            .ok_or_else(|| ApiError::NotFound(format!("Deck {} not found", deck_id)))
    }

    /// Load a visible deck with its cards as a study-core Deck
    pub async fn load_core_deck(&self, deck_id: Uuid, user_id: Uuid) -> Result<Deck> {
        let deck = self.get_visible_deck(deck_id, user_id).await?;
        let cards = self.get_cards(deck_id).await?;
        Ok(deck.to_core_deck(&cards))
    }

    // === Card Repository ===

    /// Add a card to a deck
    pub async fn add_card(
        &self,
        deck_id: Uuid,
        user_id: Uuid,
        request: &CreateCardRequest,
    ) -> Result<DbCard> {
        let card = sqlx::query_as::<_, DbCard>(
            r#"
            INSERT INTO cards (deck_id, user_id, front_text, back_text,
                               front_image_url, back_image_url, difficulty_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, deck_id, user_id, front_text, back_text,
                      front_image_url, back_image_url, difficulty_level, created_at
            "#,
        )
        .bind(deck_id)
        .bind(user_id)
        .bind(&request.front_text)
        .bind(&request.back_text)
        .bind(&request.front_image_url)
        .bind(&request.back_image_url)
        .bind(request.difficulty_level)
        .fetch_one(&self.pool)
        .await?;

        sqlx::query("UPDATE decks SET updated_at = NOW() WHERE id = $1")
            .bind(deck_id)
            .execute(&self.pool)
            .await?;

        Ok(card)
    }

    /// Replace a card's fields if it belongs to `deck_id`
    pub async fn update_card(
        &self,
        deck_id: Uuid,
        card_id: Uuid,
        request: &CreateCardRequest,
    ) -> Result<Option<DbCard>> {
        let card = sqlx::query_as::<_, DbCard>(
            r#"
            UPDATE cards
            SET front_text = $3, back_text = $4, front_image_url = $5,
                back_image_url = $6, difficulty_level = $7
            WHERE id = $1 AND deck_id = $2
            RETURNING id, deck_id, user_id, front_text, back_text,
                      front_image_url, back_image_url, difficulty_level, created_at
            "#,
        )
        .bind(card_id)
        .bind(deck_id)
        .bind(&request.front_text)
        .bind(&request.back_text)
        .bind(&request.front_image_url)
        .bind(&request.back_image_url)
        .bind(request.difficulty_level)
        .fetch_optional(&self.pool)
        .await?;

        if card.is_some() {
            sqlx::query("UPDATE decks SET updated_at = NOW() WHERE id = $1")
                .bind(deck_id)
                .execute(&self.pool)
                .await?;
        }

        Ok(card)
    }

    /// Get all cards in a deck in insertion order
    pub async fn get_cards(&self, deck_id: Uuid) -> Result<Vec<DbCard>> {
        let cards = sqlx::query_as::<_, DbCard>(
            r#"
            SELECT id, deck_id, user_id, front_text, back_text,
                   front_image_url, back_image_url, difficulty_level, created_at
            FROM cards
            WHERE deck_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(deck_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(cards)
    }

    // === Study Result Repository ===

    /// Insert a batch of study records in one statement
    pub async fn insert_study_records(&self, records: &[StudyRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO study_results (session_id, user_id, deck_id, flashcard_id, \
             study_mode, difficulty_rating, time_spent_seconds, is_correct) ",
        );
        builder.push_values(records, |mut row, record| {
            row.push_bind(record.session_id)
                .push_bind(record.user_id)
                .push_bind(record.deck_id)
                .push_bind(record.flashcard_id)
                .push_bind(record.study_mode.as_str())
                .push_bind(i16::from(record.difficulty_rating))
                .push_bind(i32::try_from(record.time_spent_seconds).unwrap_or(i32::MAX))
                .push_bind(record.is_correct);
        });

        let result = builder.build().execute(&self.pool).await?;
        Ok(result.rows_affected() as usize)
    }

    /// Get a learner's study results since a timestamp, oldest first
    pub async fn get_study_results_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<StudyResultRow>> {
        let rows = sqlx::query_as::<_, StudyResultRow>(
            r#"
            SELECT r.session_id, r.deck_id, d.title as deck_title, r.difficulty_rating,
                   r.time_spent_seconds, r.is_correct, r.created_at
            FROM study_results r
            JOIN decks d ON r.deck_id = d.id
            WHERE r.user_id = $1 AND r.created_at >= $2
            ORDER BY r.created_at
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // === Analytics Repository ===

    /// Count decks owned by a learner
    pub async fn count_decks(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM decks WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count cards per difficulty level across a learner's decks
    pub async fn difficulty_counts(&self, user_id: Uuid) -> Result<Vec<DifficultyCount>> {
        let counts = sqlx::query_as::<_, DifficultyCount>(
            r#"
            SELECT difficulty_level, COUNT(*) as card_count
            FROM cards
            WHERE user_id = $1
            GROUP BY difficulty_level
            ORDER BY difficulty_level
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}

impl ResultSink for Database {
    type Error = ApiError;

    async fn append_batch(&self, records: Vec<StudyRecord>) -> Result<()> {
        self.insert_study_records(&records).await?;
        Ok(())
    }
}
