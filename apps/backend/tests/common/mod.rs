//! Common test utilities and fixtures for integration tests.
//!
//! Integration tests require a PostgreSQL database (set DATABASE_URL).

pub mod fixtures;

use std::sync::Arc;

use axum::Router;
use uuid::Uuid;

use studydeck_backend::config::{Config, LlmConfig};
use studydeck_backend::db::Database;
use studydeck_backend::models::{CreateCardRequest, CreateDeckRequest, DbCard, DbDeck};
use studydeck_backend::{app, AppState};

/// Test context containing database connection and router.
pub struct TestContext {
    pub db: Arc<Database>,
    pub state: AppState,
}

impl TestContext {
    /// Create a new test context.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn new() -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        let config = Config {
            database_url,
            host: "127.0.0.1".to_string(),
            port: 0,
            llm: LlmConfig {
                api_key: None,
                base_url: "http://localhost:1".to_string(),
                model: "test".to_string(),
            },
            session_idle_minutes: 120,
        };
        let state = AppState::new(db, &config);

        Self {
            db: Arc::clone(&state.db),
            state,
        }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        app(self.state.clone())
    }

    /// Create a test learner and return its ID and token.
    pub async fn create_test_user(&self, name: Option<&str>) -> (Uuid, String) {
        let user = self
            .db
            .create_user(name)
            .await
            .expect("Failed to create test learner");
        (user.id, user.token)
    }

    /// Create a deck with `cards` generated cards.
    pub async fn create_test_deck(&self, user_id: Uuid, cards: usize) -> (DbDeck, Vec<DbCard>) {
        let deck = self
            .db
            .create_deck(
                user_id,
                &CreateDeckRequest {
                    title: "Periodic Table".to_string(),
                    description: None,
                    subject: Some("Chemistry".to_string()),
                    is_public: false,
                },
            )
            .await
            .expect("Failed to create test deck");

        let mut created = Vec::new();
        for i in 0..cards {
            let request: CreateCardRequest = fixtures::card(i);
            let card = self
                .db
                .add_card(deck.id, user_id, &request)
                .await
                .expect("Failed to create test card");
            created.push(card);
        }
        (deck, created)
    }

    /// Format authorization header value.
    pub fn auth_header_value(token: &str) -> String {
        format!("Bearer {}", token)
    }

    /// Clean up test data for a learner.
    pub async fn cleanup_user(&self, user_id: Uuid) {
        // Delete in order due to foreign keys
        for table in ["study_results", "cards", "decks"] {
            let _ = sqlx::query(&format!("DELETE FROM {} WHERE user_id = $1", table))
                .bind(user_id)
                .execute(self.db.pool())
                .await;
        }

        let _ = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.db.pool())
            .await;
    }
}
