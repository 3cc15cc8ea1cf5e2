//! Session summaries and result persistence.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{SessionResult, StudyMode, StudyRecord};

/// Statistics derived from a result log. Always recomputed, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_cards: usize,
    pub correct_count: usize,
    pub needs_review: usize,
    /// Rounded percentage, 0-100.
    pub accuracy: u32,
    pub average_seconds: u32,
    /// Mean rating rounded to one decimal.
    pub average_rating: f64,
    pub total_seconds: u64,
    pub performance: PerformanceBand,
}

/// Coarse grading of a session's accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceBand {
    Excellent,
    Great,
    Good,
    KeepPracticing,
}

impl PerformanceBand {
    pub fn from_accuracy(accuracy: u32) -> Self {
        if accuracy >= 90 {
            Self::Excellent
        } else if accuracy >= 75 {
            Self::Great
        } else if accuracy >= 60 {
            Self::Good
        } else {
            Self::KeepPracticing
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent work!",
            Self::Great => "Great job!",
            Self::Good => "Good effort!",
            Self::KeepPracticing => "Keep practicing!",
        }
    }
}

/// Compute summary statistics for a result log.
pub fn summarize(log: &[SessionResult]) -> SessionSummary {
    let total_cards = log.len();
    let correct_count = log.iter().filter(|r| r.is_correct).count();
    let total_seconds: u64 = log.iter().map(|r| r.time_spent_seconds as u64).sum();
    let rating_sum: u64 = log.iter().map(|r| r.difficulty_rating as u64).sum();

    let (accuracy, average_seconds, average_rating) = if total_cards == 0 {
        (0, 0, 0.0)
    } else {
        let n = total_cards as f64;
        (
            (100.0 * correct_count as f64 / n).round() as u32,
            (total_seconds as f64 / n).round() as u32,
            (rating_sum as f64 / n * 10.0).round() / 10.0,
        )
    };

    SessionSummary {
        total_cards,
        correct_count,
        needs_review: total_cards - correct_count,
        accuracy,
        average_seconds,
        average_rating,
        total_seconds,
        performance: PerformanceBand::from_accuracy(accuracy),
    }
}

/// Who and what a batch of results belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordScope {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub deck_id: Uuid,
    pub study_mode: StudyMode,
}

/// Map a result log to storage records, preserving order.
pub fn to_records(scope: RecordScope, log: &[SessionResult]) -> Vec<StudyRecord> {
    log.iter()
        .map(|r| StudyRecord {
            session_id: scope.session_id,
            user_id: scope.user_id,
            deck_id: scope.deck_id,
            flashcard_id: r.flashcard_id,
            study_mode: scope.study_mode,
            difficulty_rating: r.difficulty_rating,
            time_spent_seconds: r.time_spent_seconds,
            is_correct: r.is_correct,
        })
        .collect()
}

/// Store that accepts study records in batches.
pub trait ResultSink: Send + Sync {
    type Error: fmt::Display + Send;

    /// Append all records, or none.
    fn append_batch(
        &self,
        records: Vec<StudyRecord>,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Persist a finished log. Returns how many records were written.
///
/// An empty log writes nothing and never touches the sink.
pub async fn persist<S: ResultSink>(
    sink: &S,
    scope: RecordScope,
    log: &[SessionResult],
) -> Result<usize, S::Error> {
    if log.is_empty() {
        return Ok(0);
    }
    let records = to_records(scope, log);
    let count = records.len();
    sink.append_batch(records).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    fn result(rating: u8, seconds: u32, is_correct: bool) -> SessionResult {
        SessionResult {
            flashcard_id: Uuid::new_v4(),
            difficulty_rating: rating,
            time_spent_seconds: seconds,
            is_correct,
        }
    }

    fn scope() -> RecordScope {
        RecordScope {
            session_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            deck_id: Uuid::new_v4(),
            study_mode: StudyMode::Flashcard,
        }
    }

    #[derive(Default)]
    struct MemorySink {
        batches: Mutex<Vec<Vec<StudyRecord>>>,
    }

    impl ResultSink for MemorySink {
        type Error = String;

        async fn append_batch(&self, records: Vec<StudyRecord>) -> Result<(), String> {
            self.batches.lock().unwrap().push(records);
            Ok(())
        }
    }

    struct FailingSink;

    impl ResultSink for FailingSink {
        type Error = String;

        async fn append_batch(&self, _records: Vec<StudyRecord>) -> Result<(), String> {
            Err("connection refused".to_string())
        }
    }

    #[test]
    fn empty_log_summarizes_to_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_cards, 0);
        assert_eq!(summary.accuracy, 0);
        assert_eq!(summary.average_seconds, 0);
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.performance, PerformanceBand::KeepPracticing);
    }

    #[test]
    fn summary_rounds_accuracy_and_rating() {
        let log = vec![result(5, 3, true), result(2, 4, false), result(4, 6, true)];
        let summary = summarize(&log);

        assert_eq!(
            summary,
            SessionSummary {
                total_cards: 3,
                correct_count: 2,
                needs_review: 1,
                accuracy: 67,
                average_seconds: 4,
                average_rating: 3.7,
                total_seconds: 13,
                performance: PerformanceBand::Good,
            }
        );
    }

    #[test]
    fn average_seconds_rounds_half_up() {
        let log = vec![result(3, 1, false), result(3, 2, false)];
        assert_eq!(summarize(&log).average_seconds, 2);
    }

    #[test]
    fn performance_bands_follow_accuracy() {
        assert_eq!(PerformanceBand::from_accuracy(100), PerformanceBand::Excellent);
        assert_eq!(PerformanceBand::from_accuracy(90), PerformanceBand::Excellent);
        assert_eq!(PerformanceBand::from_accuracy(89), PerformanceBand::Great);
        assert_eq!(PerformanceBand::from_accuracy(75), PerformanceBand::Great);
        assert_eq!(PerformanceBand::from_accuracy(60), PerformanceBand::Good);
        assert_eq!(PerformanceBand::from_accuracy(59), PerformanceBand::KeepPracticing);
    }

    #[test]
    fn records_carry_scope_in_log_order() {
        let scope = scope();
        let log = vec![result(5, 3, true), result(1, 30, false)];
        let records = to_records(scope, &log);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].flashcard_id, log[0].flashcard_id);
        assert_eq!(records[1].flashcard_id, log[1].flashcard_id);
        assert!(records.iter().all(|r| r.user_id == scope.user_id && r.deck_id == scope.deck_id));
        assert_eq!(records[1].time_spent_seconds, 30);
    }

    #[tokio::test]
    async fn persist_sends_one_batch() {
        let sink = MemorySink::default();
        let log = vec![result(4, 2, true), result(3, 5, false)];

        let written = persist(&sink, scope(), &log).await.unwrap();

        assert_eq!(written, 2);
        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
    }

    #[tokio::test]
    async fn persist_skips_empty_log() {
        let sink = MemorySink::default();
        assert_eq!(persist(&sink, scope(), &[]).await.unwrap(), 0);
        assert!(sink.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn persist_reports_sink_failure() {
        let log = vec![result(4, 2, true)];
        let err = persist(&FailingSink, scope(), &log).await.unwrap_err();
        assert_eq!(err, "connection refused");
    }
}
