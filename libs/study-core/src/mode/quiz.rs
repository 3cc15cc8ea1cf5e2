//! Multiple-choice quiz against a per-card countdown.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PendingTimer, StudyRound, TimerToken};
use crate::error::{Result, SessionError};
use crate::types::{Card, CardOutcome};

/// Seconds allowed per question.
pub const QUIZ_TIME_LIMIT_SECS: u32 = 30;

/// Correct answers with more than this many seconds left earn a bonus point.
pub const QUICK_ANSWER_THRESHOLD_SECS: u32 = 20;

/// Wrong options drawn from the rest of the deck.
pub const MAX_DISTRACTORS: usize = 3;

const CORRECT_RATING: u8 = 4;
const QUICK_BONUS: u8 = 1;
const INCORRECT_RATING: u8 = 2;
const TIMEOUT_RATING: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRound {
    card_id: Uuid,
    correct_answer: String,
    options: Vec<String>,
    selected: Option<usize>,
    started_at: DateTime<Utc>,
    token: TimerToken,
    timed_out: bool,
    outcome: Option<CardOutcome>,
}

impl QuizRound {
    pub fn new<R: Rng + ?Sized>(
        card: &Card,
        pool: &[Card],
        now: DateTime<Utc>,
        token: TimerToken,
        rng: &mut R,
    ) -> Self {
        Self {
            card_id: card.id,
            correct_answer: card.back.clone(),
            options: build_options(card, pool, rng),
            selected: None,
            started_at: now,
            token,
            timed_out: false,
            outcome: None,
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn token(&self) -> TimerToken {
        self.token
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.started_at + Duration::seconds(QUIZ_TIME_LIMIT_SECS as i64)
    }

    /// Whole seconds left on the countdown.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> u32 {
        let elapsed = (now - self.started_at).num_seconds().clamp(0, QUIZ_TIME_LIMIT_SECS as i64);
        QUIZ_TIME_LIMIT_SECS - elapsed as u32
    }

    /// Countdown still to be scheduled, or `None` once resolved.
    pub fn pending_timer(&self) -> Option<PendingTimer> {
        if self.is_resolved() {
            return None;
        }
        Some(PendingTimer {
            token: self.token,
            deadline: self.deadline(),
        })
    }

    /// Highlight an option. Ignored once the round is resolved.
    pub fn select(&mut self, index: usize) -> Result<()> {
        if self.is_resolved() {
            return Ok(());
        }
        if index >= self.options.len() {
            return Err(SessionError::InvalidOption {
                index,
                available: self.options.len(),
            });
        }
        self.selected = Some(index);
        Ok(())
    }

    /// Submit the selected option.
    ///
    /// Returns `None` when the round was already resolved. A submission that
    /// arrives once the countdown has run out resolves as a timeout.
    pub fn submit(&mut self, now: DateTime<Utc>) -> Result<Option<CardOutcome>> {
        if self.is_resolved() {
            return Ok(None);
        }
        let remaining = self.seconds_remaining(now);
        if remaining == 0 {
            return Ok(Some(self.resolve_timeout()));
        }
        let index = self.selected.ok_or(SessionError::NoSelection)?;
        let correct = self.options[index] == self.correct_answer;
        let outcome = score_submission(correct, remaining);
        self.outcome = Some(outcome);
        Ok(Some(outcome))
    }

    /// Countdown callback. Only the token of the live countdown resolves the
    /// round; anything else is a no-op.
    pub fn expire(&mut self, token: TimerToken) -> Option<CardOutcome> {
        if self.is_resolved() || token != self.token {
            return None;
        }
        Some(self.resolve_timeout())
    }

    fn resolve_timeout(&mut self) -> CardOutcome {
        self.timed_out = true;
        let outcome = CardOutcome {
            rating: TIMEOUT_RATING,
            is_correct: false,
        };
        self.outcome = Some(outcome);
        outcome
    }
}

impl StudyRound for QuizRound {
    fn card_id(&self) -> Uuid {
        self.card_id
    }

    fn outcome(&self) -> Option<CardOutcome> {
        self.outcome
    }
}

/// Correct answer plus up to three distractors from other cards, in random order.
///
/// Decks with fewer than four cards yield fewer options; a one-card deck
/// yields only the correct answer.
pub fn build_options<R: Rng + ?Sized>(card: &Card, pool: &[Card], rng: &mut R) -> Vec<String> {
    let mut others: Vec<&Card> = pool.iter().filter(|c| c.id != card.id).collect();
    others.shuffle(rng);
    let mut options: Vec<String> = others
        .into_iter()
        .take(MAX_DISTRACTORS)
        .map(|c| c.back.clone())
        .collect();
    options.push(card.back.clone());
    options.shuffle(rng);
    options
}

/// Rating for a manual submission with `seconds_remaining` on the clock.
pub fn score_submission(correct: bool, seconds_remaining: u32) -> CardOutcome {
    let rating = if !correct {
        INCORRECT_RATING
    } else if seconds_remaining > QUICK_ANSWER_THRESHOLD_SECS {
        CORRECT_RATING + QUICK_BONUS
    } else {
        CORRECT_RATING
    };
    CardOutcome {
        rating,
        is_correct: correct,
    }
}
