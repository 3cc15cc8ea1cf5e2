//! Session controller: sequences a shuffled deck through one study mode.
//!
//! A session moves `Unselected -> InProgress -> Complete`. Every transition
//! takes the current time explicitly and randomness from the caller, so the
//! whole state machine can be driven deterministically in tests.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::SessionClock;
use crate::error::{Result, SessionError};
use crate::mode::{CardRound, PendingTimer, StudyRound, TimerToken};
use crate::summary::{summarize, SessionSummary};
use crate::types::{Card, CardOutcome, Deck, SessionResult, StudyMode};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Unselected,
    InProgress,
    Complete,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unselected => "unselected",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a recorded (or attempted) result did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Result recorded, next card is active.
    Advanced,
    /// Result recorded for the last card. Returned once per attempt.
    Completed(SessionSummary),
    /// Late or stale input; nothing changed.
    Ignored,
}

/// One run through a shuffled deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    attempt_id: Uuid,
    deck: Deck,
    working: Vec<Card>,
    mode: Option<StudyMode>,
    cursor: usize,
    results: Vec<SessionResult>,
    clock: SessionClock,
    complete: bool,
    round: Option<CardRound>,
    next_token: u64,
}

impl Session {
    /// Create an unselected session over a fresh shuffle of `deck`.
    pub fn new<R: Rng + ?Sized>(deck: Deck, rng: &mut R) -> Self {
        let working = shuffled(&deck.cards, rng);
        Self {
            attempt_id: Uuid::new_v4(),
            deck,
            working,
            mode: None,
            cursor: 0,
            results: Vec::new(),
            clock: SessionClock::default(),
            complete: false,
            round: None,
            next_token: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.complete {
            SessionStatus::Complete
        } else if self.mode.is_some() {
            SessionStatus::InProgress
        } else {
            SessionStatus::Unselected
        }
    }

    /// Identifier of the current attempt; a reset starts a new one.
    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn mode(&self) -> Option<StudyMode> {
        self.mode
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn results(&self) -> &[SessionResult] {
        &self.results
    }

    pub fn working_sequence(&self) -> &[Card] {
        &self.working
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn round(&self) -> Option<&CardRound> {
        self.round.as_ref()
    }

    /// Card awaiting a result, while in progress.
    pub fn current_card(&self) -> Option<&Card> {
        match self.status() {
            SessionStatus::InProgress => self.working.get(self.cursor),
            _ => None,
        }
    }

    /// Choose a mode and begin with the first card.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        mode: StudyMode,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<()> {
        let status = self.status();
        if status != SessionStatus::Unselected {
            return Err(SessionError::InvalidState {
                operation: "start",
                status,
            });
        }
        if self.working.is_empty() {
            return Err(SessionError::EmptyDeck);
        }

        self.mode = Some(mode);
        self.cursor = 0;
        self.results.clear();
        self.clock.start(now);
        self.begin_round(mode, now, rng);
        Ok(())
    }

    /// Append the outcome for the current card and advance.
    pub fn record_result<R: Rng + ?Sized>(
        &mut self,
        outcome: CardOutcome,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Transition> {
        let mode = self.ensure_in_progress("record a result")?;
        if !(1..=5).contains(&outcome.rating) {
            return Err(SessionError::InvalidRating(outcome.rating));
        }

        self.results.push(SessionResult {
            flashcard_id: self.working[self.cursor].id,
            difficulty_rating: outcome.rating,
            time_spent_seconds: self.clock.card_elapsed_secs(now),
            is_correct: outcome.is_correct,
        });
        self.cursor += 1;

        if self.cursor == self.working.len() {
            self.complete = true;
            self.round = None;
            return Ok(Transition::Completed(summarize(&self.results)));
        }

        self.clock.next_card(now);
        self.begin_round(mode, now, rng);
        Ok(Transition::Advanced)
    }

    /// Flip the current self-rated card. Returns whether the back is showing.
    pub fn toggle_reveal(&mut self) -> Result<bool> {
        let mode = self.ensure_in_progress("reveal the answer")?;
        match self.round.as_mut() {
            Some(CardRound::SelfRated(round)) => Ok(round.toggle_reveal()),
            _ => Err(SessionError::WrongMode {
                operation: "reveal the answer",
                mode,
            }),
        }
    }

    /// Rate the current self-rated card.
    pub fn rate<R: Rng + ?Sized>(
        &mut self,
        rating: u8,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Transition> {
        let mode = self.ensure_in_progress("rate a card")?;
        let outcome = match self.round.as_mut() {
            Some(CardRound::SelfRated(round)) => round.rate(rating)?,
            _ => {
                return Err(SessionError::WrongMode {
                    operation: "rate a card",
                    mode,
                })
            }
        };
        self.record_result(outcome, now, rng)
    }

    /// Highlight a quiz option for the current card.
    pub fn select_option(&mut self, index: usize) -> Result<()> {
        let mode = self.ensure_in_progress("select an option")?;
        match self.round.as_mut() {
            Some(CardRound::Quiz(round)) => round.select(index),
            _ => Err(SessionError::WrongMode {
                operation: "select an option",
                mode,
            }),
        }
    }

    /// Submit the selected quiz option for `card_id`.
    ///
    /// A submission for a card that already has a result (for instance after
    /// the countdown forced a timeout) is ignored.
    pub fn submit_answer<R: Rng + ?Sized>(
        &mut self,
        card_id: Uuid,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Transition> {
        if self.results.iter().any(|r| r.flashcard_id == card_id) {
            return Ok(Transition::Ignored);
        }
        let mode = self.ensure_in_progress("submit an answer")?;
        let round = match self.round.as_mut() {
            Some(CardRound::Quiz(round)) => round,
            _ => {
                return Err(SessionError::WrongMode {
                    operation: "submit an answer",
                    mode,
                })
            }
        };
        if round.card_id() != card_id {
            return Ok(Transition::Ignored);
        }
        match round.submit(now)? {
            Some(outcome) => self.record_result(outcome, now, rng),
            None => Ok(Transition::Ignored),
        }
    }

    /// Countdown callback for the quiz round identified by `token`.
    ///
    /// Cancelled or superseded countdowns are no-ops, as is any callback
    /// arriving after the session finished or was reset.
    pub fn expire_quiz<R: Rng + ?Sized>(
        &mut self,
        token: TimerToken,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Transition> {
        if self.status() != SessionStatus::InProgress {
            return Ok(Transition::Ignored);
        }
        let outcome = match self.round.as_mut() {
            Some(CardRound::Quiz(round)) => round.expire(token),
            _ => None,
        };
        match outcome {
            Some(outcome) => self.record_result(outcome, now, rng),
            None => Ok(Transition::Ignored),
        }
    }

    /// Countdown the host must currently have scheduled, if any.
    pub fn pending_timer(&self) -> Option<PendingTimer> {
        if self.status() != SessionStatus::InProgress {
            return None;
        }
        self.round.as_ref().and_then(CardRound::pending_timer)
    }

    /// Start over with a new shuffle and an empty log.
    ///
    /// Returns the previous attempt's log untouched.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<SessionResult> {
        self.attempt_id = Uuid::new_v4();
        self.working = shuffled(&self.deck.cards, rng);
        self.mode = None;
        self.cursor = 0;
        self.clock.clear();
        self.complete = false;
        self.round = None;
        std::mem::take(&mut self.results)
    }

    /// Discard the session. Returns the countdown the host must cancel.
    pub fn exit(self) -> Option<TimerToken> {
        self.pending_timer().map(|timer| timer.token)
    }

    /// Summary of the finished attempt, recomputed from the log.
    pub fn summary(&self) -> Option<SessionSummary> {
        self.complete.then(|| summarize(&self.results))
    }

    /// Snapshot for display.
    pub fn view(&self, now: DateTime<Utc>) -> SessionView {
        let total = self.working.len();
        let position = (self.cursor + 1).min(total);
        let progress_percent = if total == 0 {
            0
        } else {
            (position as f64 / total as f64 * 100.0).round() as u32
        };

        let card = self.current_card().map(|card| {
            let revealed = matches!(
                self.round.as_ref(),
                Some(CardRound::SelfRated(round)) if round.is_revealed()
            );
            CardView {
                id: card.id,
                front: card.front.clone(),
                back: revealed.then(|| card.back.clone()),
                front_image_url: card.front_image_url.clone(),
                back_image_url: if revealed { card.back_image_url.clone() } else { None },
                difficulty: card.difficulty,
                revealed,
            }
        });

        let quiz = match (self.status(), self.round.as_ref()) {
            (SessionStatus::InProgress, Some(CardRound::Quiz(round))) => Some(QuizView {
                options: round.options().to_vec(),
                selected: round.selected(),
                seconds_remaining: round.seconds_remaining(now),
            }),
            _ => None,
        };

        SessionView {
            attempt_id: self.attempt_id,
            deck_id: self.deck.id,
            deck_title: self.deck.title.clone(),
            status: self.status(),
            mode: self.mode,
            position,
            total_cards: total,
            progress_percent,
            session_seconds: self.clock.session_elapsed_secs(now),
            card,
            quiz,
            summary: self.summary(),
        }
    }

    fn ensure_in_progress(&self, operation: &'static str) -> Result<StudyMode> {
        match (self.status(), self.mode) {
            (SessionStatus::InProgress, Some(mode)) => Ok(mode),
            (status, _) => Err(SessionError::InvalidState { operation, status }),
        }
    }

    fn begin_round<R: Rng + ?Sized>(&mut self, mode: StudyMode, now: DateTime<Utc>, rng: &mut R) {
        self.next_token += 1;
        let token = TimerToken::new(self.next_token);
        let round = CardRound::begin(mode, &self.working[self.cursor], &self.working, now, token, rng);
        self.round = Some(round);
    }
}

fn shuffled<R: Rng + ?Sized>(cards: &[Card], rng: &mut R) -> Vec<Card> {
    let mut working = cards.to_vec();
    working.shuffle(rng);
    working
}

/// Display snapshot of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub attempt_id: Uuid,
    pub deck_id: Uuid,
    pub deck_title: String,
    pub status: SessionStatus,
    pub mode: Option<StudyMode>,
    /// 1-based position of the current card.
    pub position: usize,
    pub total_cards: usize,
    pub progress_percent: u32,
    pub session_seconds: u32,
    pub card: Option<CardView>,
    pub quiz: Option<QuizView>,
    pub summary: Option<SessionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardView {
    pub id: Uuid,
    pub front: String,
    pub back: Option<String>,
    pub front_image_url: Option<String>,
    pub back_image_url: Option<String>,
    pub difficulty: u8,
    pub revealed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizView {
    pub options: Vec<String>,
    pub selected: Option<usize>,
    pub seconds_remaining: u32,
}
