//! Study analytics computed from persisted results.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DifficultyCount, StudyResultRow};

const TREND_LENGTH: usize = 10;
const DAYS_SHOWN: i64 = 7;

/// Reporting window selected by `?range=`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalyticsRange {
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl AnalyticsRange {
    /// Parse a query value; a missing value means the last 7 days.
    pub fn parse(value: Option<&str>) -> Option<Self> {
        match value {
            None | Some("7d") => Some(Self::Week),
            Some("30d") => Some(Self::Month),
            Some("90d") => Some(Self::Quarter),
            Some(_) => None,
        }
    }

    pub fn days(self) -> i64 {
        match self {
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
        }
    }

    pub fn start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

/// One persisted attempt, rebuilt from its result rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: Uuid,
    pub deck_id: Uuid,
    pub deck_title: String,
    pub finished_at: DateTime<Utc>,
    pub cards_studied: usize,
    pub correct: usize,
    pub accuracy: u32,
    pub seconds: u64,
}

/// Group result rows by attempt, ordered by when each attempt finished.
pub fn group_sessions(rows: &[StudyResultRow]) -> Vec<SessionStats> {
    let mut order = Vec::new();
    let mut grouped: HashMap<Uuid, SessionStats> = HashMap::new();

    for row in rows {
        let stats = grouped.entry(row.session_id).or_insert_with(|| {
            order.push(row.session_id);
            SessionStats {
                session_id: row.session_id,
                deck_id: row.deck_id,
                deck_title: row.deck_title.clone(),
                finished_at: row.created_at,
                cards_studied: 0,
                correct: 0,
                accuracy: 0,
                seconds: 0,
            }
        });
        stats.cards_studied += 1;
        stats.correct += usize::from(row.is_correct);
        stats.seconds += row.time_spent_seconds.max(0) as u64;
        stats.finished_at = stats.finished_at.max(row.created_at);
    }

    let mut sessions: Vec<SessionStats> = order
        .into_iter()
        .filter_map(|id| grouped.remove(&id))
        .map(|mut stats| {
            stats.accuracy = percent(stats.correct, stats.cards_studied);
            stats
        })
        .collect();
    sessions.sort_by_key(|stats| stats.finished_at);
    sessions
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub range: AnalyticsRange,
    pub total_sessions: usize,
    pub total_time_minutes: u64,
    pub average_accuracy: f64,
    pub current_streak: u32,
    pub total_decks: i64,
    pub total_cards: i64,
    pub sessions_by_day: Vec<DayActivity>,
    pub accuracy_trend: Vec<TrendPoint>,
    pub deck_performance: Vec<DeckPerformance>,
    pub difficulty_breakdown: Vec<DifficultyBucket>,
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayActivity {
    pub date: NaiveDate,
    pub day: String,
    pub sessions: usize,
    pub accuracy: f64,
    pub time_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub session: String,
    pub accuracy: u32,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckPerformance {
    pub deck_id: Uuid,
    pub name: String,
    pub sessions: usize,
    pub accuracy: f64,
    pub total_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyBucket {
    pub level: u8,
    pub cards: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub title: String,
    pub description: String,
    pub earned: bool,
}

/// Build the report for sessions already limited to `range`.
pub fn build_report(
    range: AnalyticsRange,
    sessions: &[SessionStats],
    total_decks: i64,
    difficulty: &[DifficultyCount],
    today: NaiveDate,
) -> AnalyticsReport {
    let total_sessions = sessions.len();
    let total_time_minutes = sessions.iter().map(|s| s.seconds).sum::<u64>() / 60;
    let average_accuracy = mean_accuracy(sessions.iter());
    let current_streak = streak(sessions, today);

    let sessions_by_day = (0..DAYS_SHOWN)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let day_sessions: Vec<&SessionStats> = sessions
                .iter()
                .filter(|s| s.finished_at.date_naive() == date)
                .collect();
            DayActivity {
                date,
                day: date.format("%a").to_string(),
                sessions: day_sessions.len(),
                accuracy: mean_accuracy(day_sessions.iter().copied()),
                time_minutes: day_sessions.iter().map(|s| s.seconds).sum::<u64>() / 60,
            }
        })
        .collect();

    let trend_start = sessions.len().saturating_sub(TREND_LENGTH);
    let accuracy_trend = sessions[trend_start..]
        .iter()
        .enumerate()
        .map(|(i, s)| TrendPoint {
            session: format!("Session {}", i + 1),
            accuracy: s.accuracy,
            date: s.finished_at.date_naive(),
        })
        .collect();

    let total_cards = difficulty.iter().map(|d| d.card_count).sum();
    let difficulty_breakdown = (1..=5u8)
        .map(|level| DifficultyBucket {
            level,
            cards: difficulty
                .iter()
                .filter(|d| d.difficulty_level == i16::from(level))
                .map(|d| d.card_count)
                .sum(),
        })
        .collect();

    let achievements = vec![
        Achievement {
            title: "Study Streak".to_string(),
            description: format!("{} days in a row", current_streak),
            earned: current_streak > 0,
        },
        Achievement {
            title: "Quick Learner".to_string(),
            description: "Completed 10 sessions".to_string(),
            earned: total_sessions >= 10,
        },
        Achievement {
            title: "Accuracy Master".to_string(),
            description: "90%+ average accuracy".to_string(),
            earned: average_accuracy >= 90.0,
        },
        Achievement {
            title: "Time Scholar".to_string(),
            description: "5+ hours studied".to_string(),
            earned: total_time_minutes >= 300,
        },
    ];

    AnalyticsReport {
        range,
        total_sessions,
        total_time_minutes,
        average_accuracy,
        current_streak,
        total_decks,
        total_cards,
        sessions_by_day,
        accuracy_trend,
        deck_performance: deck_performance(sessions),
        difficulty_breakdown,
        achievements,
    }
}

fn deck_performance(sessions: &[SessionStats]) -> Vec<DeckPerformance> {
    let mut decks: Vec<(Uuid, String, Vec<&SessionStats>)> = Vec::new();
    for session in sessions {
        match decks.iter_mut().find(|(id, _, _)| *id == session.deck_id) {
            Some((_, _, list)) => list.push(session),
            None => decks.push((session.deck_id, session.deck_title.clone(), vec![session])),
        }
    }

    decks
        .into_iter()
        .map(|(deck_id, name, list)| DeckPerformance {
            deck_id,
            name,
            sessions: list.len(),
            accuracy: mean_accuracy(list.iter().copied()),
            total_minutes: list.iter().map(|s| s.seconds).sum::<u64>() / 60,
        })
        .collect()
}

/// Consecutive days with a session, ending today or yesterday.
fn streak(sessions: &[SessionStats], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = sessions.iter().map(|s| s.finished_at.date_naive()).collect();

    let yesterday = today - Duration::days(1);
    let mut day = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut count = 0;
    while days.contains(&day) {
        count += 1;
        day -= Duration::days(1);
    }
    count
}

fn mean_accuracy<'a>(sessions: impl Iterator<Item = &'a SessionStats>) -> f64 {
    let (sum, count) = sessions.fold((0u64, 0u64), |(sum, count), s| {
        (sum + u64::from(s.accuracy), count + 1)
    });
    if count == 0 {
        return 0.0;
    }
    (sum as f64 / count as f64 * 10.0).round() / 10.0
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * 100.0).round() as u32
}
