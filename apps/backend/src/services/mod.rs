pub mod analytics;
pub mod llm;
pub mod sessions;
