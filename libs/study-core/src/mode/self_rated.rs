//! Self-rated review used by flashcard and adaptive modes.
//!
//! The front is shown until the learner reveals the answer, then they rate
//! their own recall 1-5. There is no countdown. Adaptive mode carries a flag
//! for presentation only; scoring is identical.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StudyRound;
use crate::error::{Result, SessionError};
use crate::types::{CardOutcome, SelfRating};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfRatedRound {
    card_id: Uuid,
    adaptive: bool,
    revealed: bool,
    outcome: Option<CardOutcome>,
}

impl SelfRatedRound {
    pub fn new(card_id: Uuid, adaptive: bool) -> Self {
        Self {
            card_id,
            adaptive,
            revealed: false,
            outcome: None,
        }
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Flip between front and back. Returns whether the back is now showing.
    pub fn toggle_reveal(&mut self) -> bool {
        self.revealed = !self.revealed;
        self.revealed
    }

    /// Record the learner's rating. A second rating keeps the first outcome.
    pub fn rate(&mut self, rating: u8) -> Result<CardOutcome> {
        let rating = SelfRating::from_value(rating).ok_or(SessionError::InvalidRating(rating))?;
        if !self.revealed {
            return Err(SessionError::AnswerHidden);
        }
        let outcome = *self.outcome.get_or_insert(CardOutcome {
            rating: rating.to_value(),
            is_correct: rating.is_correct(),
        });
        Ok(outcome)
    }
}

impl StudyRound for SelfRatedRound {
    fn card_id(&self) -> Uuid {
        self.card_id
    }

    fn outcome(&self) -> Option<CardOutcome> {
        self.outcome
    }
}
