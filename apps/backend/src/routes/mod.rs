pub mod ai;
pub mod analytics;
pub mod auth;
pub mod decks;
pub mod study;
pub mod user;
