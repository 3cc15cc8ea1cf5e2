//! Study rounds: how each mode turns one card into a rating.

pub mod quiz;
pub mod self_rated;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Card, CardOutcome, StudyMode};

pub use quiz::QuizRound;
pub use self_rated::SelfRatedRound;

/// Identifies one scheduled countdown.
///
/// Tokens are never reused within a session, so a callback holding a token
/// from a cancelled countdown can never match the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken(u64);

impl TimerToken {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// A countdown the host must schedule: call back with `token` at `deadline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTimer {
    pub token: TimerToken,
    pub deadline: DateTime<Utc>,
}

/// Capability shared by every study mode: consume one card, eventually
/// yield exactly one outcome for it.
pub trait StudyRound {
    /// Card this round is about.
    fn card_id(&self) -> Uuid;

    /// Outcome once the learner (or the countdown) has finished with the card.
    fn outcome(&self) -> Option<CardOutcome>;

    fn is_resolved(&self) -> bool {
        self.outcome().is_some()
    }
}

/// The active round for the current card, one variant per kind of mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CardRound {
    SelfRated(SelfRatedRound),
    Quiz(QuizRound),
}

impl CardRound {
    /// Begin a round for `card` under `mode`.
    ///
    /// `pool` is the full working sequence; quiz distractors are drawn from it.
    pub fn begin<R: Rng + ?Sized>(
        mode: StudyMode,
        card: &Card,
        pool: &[Card],
        now: DateTime<Utc>,
        token: TimerToken,
        rng: &mut R,
    ) -> Self {
        match mode {
            StudyMode::Flashcard => Self::SelfRated(SelfRatedRound::new(card.id, false)),
            StudyMode::Adaptive => Self::SelfRated(SelfRatedRound::new(card.id, true)),
            StudyMode::Quiz => Self::Quiz(QuizRound::new(card, pool, now, token, rng)),
        }
    }

    /// Countdown to schedule for this round, if any.
    pub fn pending_timer(&self) -> Option<PendingTimer> {
        match self {
            Self::SelfRated(_) => None,
            Self::Quiz(round) => round.pending_timer(),
        }
    }
}

impl StudyRound for CardRound {
    fn card_id(&self) -> Uuid {
        match self {
            Self::SelfRated(round) => round.card_id(),
            Self::Quiz(round) => round.card_id(),
        }
    }

    fn outcome(&self) -> Option<CardOutcome> {
        match self {
            Self::SelfRated(round) => round.outcome(),
            Self::Quiz(round) => round.outcome(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cards() -> Vec<Card> {
        (0..3)
            .map(|i| Card::new(Uuid::new_v4(), format!("Q{i}"), format!("A{i}"), 1))
            .collect()
    }

    #[test]
    fn flashcard_and_adaptive_are_self_rated() {
        let cards = cards();
        let mut rng = StdRng::seed_from_u64(1);
        let now = Utc::now();

        let flash = CardRound::begin(StudyMode::Flashcard, &cards[0], &cards, now, TimerToken::new(1), &mut rng);
        let adaptive = CardRound::begin(StudyMode::Adaptive, &cards[0], &cards, now, TimerToken::new(2), &mut rng);

        assert!(matches!(&flash, CardRound::SelfRated(r) if !r.is_adaptive()));
        assert!(matches!(&adaptive, CardRound::SelfRated(r) if r.is_adaptive()));
        assert_eq!(flash.pending_timer(), None);
        assert_eq!(adaptive.pending_timer(), None);
    }

    #[test]
    fn quiz_round_schedules_countdown() {
        let cards = cards();
        let mut rng = StdRng::seed_from_u64(1);
        let now = Utc::now();

        let round = CardRound::begin(StudyMode::Quiz, &cards[1], &cards, now, TimerToken::new(7), &mut rng);
        let timer = round.pending_timer().unwrap();

        assert_eq!(round.card_id(), cards[1].id);
        assert_eq!(timer.token, TimerToken::new(7));
        assert_eq!(timer.deadline, now + chrono::Duration::seconds(30));
        assert!(!round.is_resolved());
    }
}
