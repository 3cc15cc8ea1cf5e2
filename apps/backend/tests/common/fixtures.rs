//! Test fixtures and factory functions for creating test data.

#![allow(dead_code)]

use serde_json::json;
use uuid::Uuid;

use studydeck_backend::models::CreateCardRequest;

const ELEMENTS: [(&str, &str); 5] = [
    ("H", "Hydrogen"),
    ("He", "Helium"),
    ("Li", "Lithium"),
    ("Be", "Beryllium"),
    ("B", "Boron"),
];

/// Card request for the `i`th element.
pub fn card(i: usize) -> CreateCardRequest {
    let (symbol, name) = ELEMENTS[i % ELEMENTS.len()];
    CreateCardRequest {
        front_text: format!("Which element has the symbol {}?", symbol),
        back_text: format!("{} ({})", name, i),
        front_image_url: None,
        back_image_url: None,
        difficulty_level: (i % 5) as i16 + 1,
    }
}

/// Create a learner register request body.
pub fn user_register_request(name: Option<&str>) -> serde_json::Value {
    match name {
        Some(n) => json!({ "name": n }),
        None => json!({}),
    }
}

pub fn create_deck_request(title: &str) -> serde_json::Value {
    json!({ "title": title, "subject": "Chemistry" })
}

pub fn create_card_request(front: &str, back: &str, difficulty: i16) -> serde_json::Value {
    json!({ "front_text": front, "back_text": back, "difficulty_level": difficulty })
}

pub fn create_session_request(deck_id: Uuid) -> serde_json::Value {
    json!({ "deck_id": deck_id })
}

pub fn start_request(mode: &str) -> serde_json::Value {
    json!({ "mode": mode })
}

pub fn rate_request(rating: u8) -> serde_json::Value {
    json!({ "rating": rating })
}
