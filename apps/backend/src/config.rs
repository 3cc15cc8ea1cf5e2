//! Runtime configuration read from the environment.

use anyhow::Context;

const DEFAULT_LLM_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_LLM_MODEL: &str = "llama-3.1-70b-versatile";
const DEFAULT_SESSION_IDLE_MINUTES: i64 = 120;
/// One week.
const MAX_SESSION_IDLE_MINUTES: i64 = 7 * 24 * 60;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub llm: LlmConfig,
    /// Live sessions untouched for this long are evicted.
    pub session_idle_minutes: i64,
}

/// Settings for the hosted model behind the generation endpoints
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - DATABASE_URL: PostgreSQL connection string
    ///
    /// Optional env vars:
    /// - HOST, PORT: bind address (default 0.0.0.0:3000)
    /// - LLM_API_KEY: key for the generation service; generation is unavailable without it
    /// - LLM_BASE_URL, LLM_MODEL: OpenAI-compatible endpoint and model
    /// - SESSION_IDLE_MINUTES: idle live-session eviction, 1 to 10080 (default 120)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match lookup("PORT") {
            Some(port) => port.parse().with_context(|| format!("invalid PORT: {port}"))?,
            None => 3000,
        };

        let session_idle_minutes = match lookup("SESSION_IDLE_MINUTES") {
            Some(minutes) => parse_idle_minutes(&minutes)
                .with_context(|| format!("invalid SESSION_IDLE_MINUTES: {minutes}"))?,
            None => DEFAULT_SESSION_IDLE_MINUTES,
        };

        let llm = LlmConfig {
            api_key: lookup("LLM_API_KEY").filter(|key| !key.is_empty()),
            base_url: lookup("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        };

        Ok(Self {
            database_url,
            host,
            port,
            llm,
            session_idle_minutes,
        })
    }

    /// Address to bind the HTTP listener to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_idle_minutes(raw: &str) -> anyhow::Result<i64> {
    let minutes: i64 = raw.trim().parse()?;
    anyhow::ensure!(
        (1..=MAX_SESSION_IDLE_MINUTES).contains(&minutes),
        "must be between 1 and {MAX_SESSION_IDLE_MINUTES} minutes"
    );
    Ok(minutes)
}
