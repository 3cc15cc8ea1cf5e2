//! Study-session engine shared by the backend.
//!
//! Provides:
//! - Shared types (Card, Deck, StudyMode, SessionResult, etc.)
//! - Per-card study rounds for flashcard, quiz and adaptive modes
//! - The session controller that sequences a shuffled deck
//! - Session summaries and batch persistence of results

pub mod clock;
pub mod error;
pub mod mode;
pub mod session;
pub mod summary;
pub mod types;

pub use clock::SessionClock;
pub use error::{Result, SessionError};
pub use mode::{CardRound, PendingTimer, QuizRound, SelfRatedRound, StudyRound, TimerToken};
pub use session::{CardView, QuizView, Session, SessionStatus, SessionView, Transition};
pub use summary::{
    persist, summarize, to_records, PerformanceBand, RecordScope, ResultSink, SessionSummary,
};
pub use types::{Card, CardOutcome, Deck, SelfRating, SessionResult, StudyMode, StudyRecord};
