pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::services::llm::LlmClient;
use crate::services::sessions::SessionRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub sessions: Arc<SessionRegistry<Database>>,
    pub llm: Arc<LlmClient>,
}

impl AppState {
    pub fn new(db: Database, config: &Config) -> Self {
        let db = Arc::new(db);
        let sessions = Arc::new(SessionRegistry::new(
            Arc::clone(&db),
            config.session_idle_minutes,
        ));
        Self {
            db,
            sessions,
            llm: Arc::new(LlmClient::new(config.llm.clone())),
        }
    }
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        // User routes
        .route("/api/user/status", get(routes::user::status))
        // Deck routes
        .route("/api/decks", get(routes::decks::list).post(routes::decks::create))
        .route("/api/decks/{id}", get(routes::decks::get).put(routes::decks::update))
        .route("/api/decks/{id}/cards", post(routes::decks::add_card))
        .route("/api/decks/{id}/cards/{card_id}", put(routes::decks::update_card))
        // Study routes
        .route("/api/study/sessions", post(routes::study::create))
        .route(
            "/api/study/sessions/{id}",
            get(routes::study::show).delete(routes::study::exit),
        )
        .route("/api/study/sessions/{id}/start", post(routes::study::start))
        .route("/api/study/sessions/{id}/reveal", post(routes::study::reveal))
        .route("/api/study/sessions/{id}/rate", post(routes::study::rate))
        .route("/api/study/sessions/{id}/select", post(routes::study::select))
        .route("/api/study/sessions/{id}/submit", post(routes::study::submit))
        .route("/api/study/sessions/{id}/reset", post(routes::study::reset))
        // Analytics routes
        .route("/api/analytics", get(routes::analytics::report))
        // Generation routes
        .route("/api/ai/generate-flashcards", post(routes::ai::generate_flashcards))
        .route("/api/ai/generate-quiz", post(routes::ai::generate_quiz))
        .route("/api/ai/adaptive-learning", post(routes::ai::adaptive_learning))
        .route("/api/ai/recommendations", post(routes::ai::recommendations))
        .route("/api/ai/explain-concept", post(routes::ai::explain_concept))
        .route("/api/ai/study-guide", post(routes::ai::study_guide))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/user/register", post(routes::user::register))
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url).await?;

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    let state = AppState::new(db, &config);
    if !state.llm.is_configured() {
        tracing::warn!("LLM_API_KEY not set, generation endpoints are unavailable");
    }

    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
