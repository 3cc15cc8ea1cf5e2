//! Core types for study sessions.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One question/answer study unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    pub front: String,
    pub back: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_image_url: Option<String>,
    /// Difficulty level, 1-5.
    pub difficulty: u8,
}

impl Card {
    /// Create a text-only card.
    pub fn new(id: Uuid, front: impl Into<String>, back: impl Into<String>, difficulty: u8) -> Self {
        Self {
            id,
            front: front.into(),
            back: back.into(),
            front_image_url: None,
            back_image_url: None,
            difficulty,
        }
    }
}

/// Ordered collection of cards. Read-only input to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub cards: Vec<Card>,
}

/// Study mode options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyMode {
    Flashcard,
    Quiz,
    Adaptive,
}

impl StudyMode {
    /// Get the mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flashcard => "flashcard",
            Self::Quiz => "quiz",
            Self::Adaptive => "adaptive",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "flashcard" => Some(Self::Flashcard),
            "quiz" => Some(Self::Quiz),
            "adaptive" => Some(Self::Adaptive),
            _ => None,
        }
    }

    /// Display label for the mode.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Flashcard => "Review Mode",
            Self::Quiz => "Quiz Mode",
            Self::Adaptive => "Adaptive Learning Mode",
        }
    }

    /// Whether cards in this mode run against a countdown.
    pub fn is_timed(&self) -> bool {
        matches!(self, Self::Quiz)
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Self-reported confidence after revealing a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfRating {
    Again,
    Hard,
    Good,
    Easy,
    Perfect,
}

impl SelfRating {
    /// Convert to 5-point numeric value (1-5).
    pub fn to_value(self) -> u8 {
        match self {
            Self::Again => 1,
            Self::Hard => 2,
            Self::Good => 3,
            Self::Easy => 4,
            Self::Perfect => 5,
        }
    }

    /// Create from 5-point numeric value.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Again),
            2 => Some(Self::Hard),
            3 => Some(Self::Good),
            4 => Some(Self::Easy),
            5 => Some(Self::Perfect),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Again => "Again",
            Self::Hard => "Hard",
            Self::Good => "Good",
            Self::Easy => "Easy",
            Self::Perfect => "Perfect",
        }
    }

    /// Ratings of Easy and above count as a correct recall.
    pub fn is_correct(self) -> bool {
        self.to_value() >= 4
    }
}

/// What a study round produced for one card, before timing is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardOutcome {
    /// Rating 1-5; semantics depend on the mode.
    pub rating: u8,
    pub is_correct: bool,
}

/// Result recorded for one card of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionResult {
    pub flashcard_id: Uuid,
    pub difficulty_rating: u8,
    pub time_spent_seconds: u32,
    pub is_correct: bool,
}

/// Storage record handed to the persistence sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyRecord {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub deck_id: Uuid,
    pub flashcard_id: Uuid,
    pub study_mode: StudyMode,
    pub difficulty_rating: u8,
    pub time_spent_seconds: u32,
    pub is_correct: bool,
}
