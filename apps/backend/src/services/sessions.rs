//! In-memory registry of live study sessions.
//!
//! Each session is owned by the learner who created it. Quiz countdowns run
//! as tokio tasks that are reconciled with the engine's pending timer after
//! every transition. Finished attempts are persisted in the background.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Duration, Utc};
use rand::rngs::ThreadRng;
use study_core::{
    persist, Deck, PendingTimer, RecordScope, ResultSink, Session, SessionError, SessionResult,
    SessionStatus, SessionView, StudyMode, TimerToken, Transition,
};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{ApiError, Result};

struct ArmedTimer {
    token: TimerToken,
    handle: JoinHandle<()>,
}

struct LiveSession {
    owner: Uuid,
    session: Session,
    armed: Option<ArmedTimer>,
    touched_at: DateTime<Utc>,
}

impl LiveSession {
    fn disarm(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.handle.abort();
        }
    }
}

/// Live sessions keyed by session id
pub struct SessionRegistry<S> {
    sink: Arc<S>,
    idle_timeout: Duration,
    sessions: Mutex<HashMap<Uuid, LiveSession>>,
}

impl<S: ResultSink + 'static> SessionRegistry<S> {
    pub fn new(sink: Arc<S>, idle_minutes: i64) -> Self {
        Self {
            sink,
            idle_timeout: Duration::try_minutes(idle_minutes.max(0)).unwrap_or(Duration::MAX),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Number of sessions currently held
    #[cfg(test)]
    fn active_count(&self) -> usize {
        self.lock_sessions(Utc::now()).len()
    }

    /// Open an unselected session over `deck` for `owner`.
    pub fn create(self: &Arc<Self>, owner: Uuid, deck: Deck) -> Result<(Uuid, SessionView)> {
        if deck.cards.is_empty() {
            return Err(SessionError::EmptyDeck.into());
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        let deck_id = deck.id;
        let session = Session::new(deck, &mut rand::rng());
        let view = session.view(now);

        self.lock_sessions(now).insert(
            id,
            LiveSession {
                owner,
                session,
                armed: None,
                touched_at: now,
            },
        );

        tracing::info!(session_id = %id, deck_id = %deck_id, user_id = %owner, "Created study session");
        Ok((id, view))
    }

    pub fn view(self: &Arc<Self>, id: Uuid, owner: Uuid) -> Result<SessionView> {
        self.update(id, owner, |_, _, _| Ok(()))
    }

    pub fn start(self: &Arc<Self>, id: Uuid, owner: Uuid, mode: StudyMode) -> Result<SessionView> {
        let view = self.update(id, owner, |session, now, rng| session.start(mode, now, rng))?;
        tracing::info!(session_id = %id, mode = %mode, "Started study session");
        Ok(view)
    }

    pub fn reveal(self: &Arc<Self>, id: Uuid, owner: Uuid) -> Result<SessionView> {
        self.update(id, owner, |session, _, _| session.toggle_reveal().map(drop))
    }

    pub fn rate(self: &Arc<Self>, id: Uuid, owner: Uuid, rating: u8) -> Result<SessionView> {
        self.update(id, owner, |session, now, rng| {
            session.rate(rating, now, rng).map(drop)
        })
    }

    pub fn select(self: &Arc<Self>, id: Uuid, owner: Uuid, option: usize) -> Result<SessionView> {
        self.update(id, owner, |session, _, _| session.select_option(option))
    }

    pub fn submit(self: &Arc<Self>, id: Uuid, owner: Uuid, card_id: Uuid) -> Result<SessionView> {
        self.update(id, owner, |session, now, rng| {
            let transition = session.submit_answer(card_id, now, rng)?;
            if transition == Transition::Ignored {
                tracing::debug!(session_id = %id, card_id = %card_id, "Ignored late quiz submission");
            }
            Ok(())
        })
    }

    /// Restart with a new shuffle. The discarded log is not persisted.
    pub fn reset(self: &Arc<Self>, id: Uuid, owner: Uuid) -> Result<SessionView> {
        let view = self.update(id, owner, |session, _, rng| {
            let previous = session.reset(rng);
            tracing::debug!(session_id = %id, discarded = previous.len(), "Reset study session");
            Ok(())
        })?;
        Ok(view)
    }

    /// Discard a session and cancel its countdown.
    pub fn exit(self: &Arc<Self>, id: Uuid, owner: Uuid) -> Result<()> {
        let mut sessions = self.lock_sessions(Utc::now());
        match sessions.get(&id) {
            Some(entry) if entry.owner == owner => {}
            _ => return Err(not_found(id)),
        }

        if let Some(mut entry) = sessions.remove(&id) {
            entry.disarm();
            if let Some(token) = entry.session.exit() {
                tracing::debug!(session_id = %id, token = token.value(), "Cancelled quiz countdown");
            }
        }

        tracing::info!(session_id = %id, "Exited study session");
        Ok(())
    }

    /// Countdown callback. Stale tokens are ignored by the engine.
    fn expire(self: &Arc<Self>, id: Uuid, token: TimerToken) {
        let now = Utc::now();
        let mut rng = rand::rng();

        let finished = {
            let mut sessions = self.lock_sessions(now);
            let Some(entry) = sessions.get_mut(&id) else {
                return;
            };
            if entry.armed.as_ref().is_some_and(|armed| armed.token == token) {
                entry.armed = None;
            }

            let was_complete = entry.session.status() == SessionStatus::Complete;
            match entry.session.expire_quiz(token, now, &mut rng) {
                Ok(Transition::Ignored) => {
                    tracing::debug!(session_id = %id, token = token.value(), "Ignored stale countdown");
                }
                Ok(_) => {
                    tracing::debug!(session_id = %id, token = token.value(), "Quiz countdown expired");
                }
                Err(e) => {
                    tracing::warn!(session_id = %id, "Countdown could not be applied: {}", e);
                }
            }

            self.sync_timer(id, entry);
            finished_attempt(was_complete, entry)
        };

        if let Some((scope, log)) = finished {
            self.spawn_persist(scope, log);
        }
    }

    /// Apply `op` to an owned session and return its refreshed view.
    fn update<T>(
        self: &Arc<Self>,
        id: Uuid,
        owner: Uuid,
        op: impl FnOnce(&mut Session, DateTime<Utc>, &mut ThreadRng) -> study_core::Result<T>,
    ) -> Result<SessionView> {
        let now = Utc::now();
        let mut rng = rand::rng();

        let (view, finished) = {
            let mut sessions = self.lock_sessions(now);
            let entry = sessions
                .get_mut(&id)
                .filter(|entry| entry.owner == owner)
                .ok_or_else(|| not_found(id))?;

            let was_complete = entry.session.status() == SessionStatus::Complete;
            op(&mut entry.session, now, &mut rng)?;
            entry.touched_at = now;

            self.sync_timer(id, entry);
            (entry.session.view(now), finished_attempt(was_complete, entry))
        };

        if let Some((scope, log)) = finished {
            self.spawn_persist(scope, log);
        }
        Ok(view)
    }

    /// Make the armed countdown match the engine's pending timer.
    fn sync_timer(self: &Arc<Self>, id: Uuid, entry: &mut LiveSession) {
        let pending = entry.session.pending_timer();
        let armed = entry.armed.as_ref().map(|armed| armed.token);
        if pending.map(|timer| timer.token) == armed {
            return;
        }

        entry.disarm();
        if let Some(timer) = pending {
            entry.armed = Some(ArmedTimer {
                token: timer.token,
                handle: self.arm(id, timer),
            });
        }
    }

    fn arm(self: &Arc<Self>, id: Uuid, timer: PendingTimer) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let wait = (timer.deadline - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            if let Some(registry) = registry.upgrade() {
                registry.expire(id, timer.token);
            }
        })
    }

    fn spawn_persist(&self, scope: RecordScope, log: Vec<SessionResult>) {
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            match persist(sink.as_ref(), scope, &log).await {
                Ok(count) => {
                    tracing::info!(session_id = %scope.session_id, count, "Persisted study results");
                }
                Err(e) => {
                    tracing::error!(session_id = %scope.session_id, "Failed to persist study results: {}", e);
                }
            }
        });
    }

    /// Lock the map, evicting sessions idle past the timeout.
    fn lock_sessions(&self, now: DateTime<Utc>) -> MutexGuard<'_, HashMap<Uuid, LiveSession>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        // A timeout reaching past the earliest representable instant never expires.
        let Some(cutoff) = now.checked_sub_signed(self.idle_timeout) else {
            return sessions;
        };
        sessions.retain(|id, entry| {
            let keep = entry.touched_at > cutoff;
            if !keep {
                entry.disarm();
                tracing::info!(session_id = %id, "Evicted idle study session");
            }
            keep
        });
        sessions
    }
}

/// Scope and log of an attempt that completed during the last operation.
fn finished_attempt(
    was_complete: bool,
    entry: &LiveSession,
) -> Option<(RecordScope, Vec<SessionResult>)> {
    if was_complete || entry.session.status() != SessionStatus::Complete {
        return None;
    }
    let study_mode = entry.session.mode()?;
    if let Some(summary) = entry.session.summary() {
        tracing::info!(
            session_id = %entry.session.attempt_id(),
            accuracy = summary.accuracy,
            total_cards = summary.total_cards,
            "Completed study session"
        );
    }

    let scope = RecordScope {
        session_id: entry.session.attempt_id(),
        user_id: entry.owner,
        deck_id: entry.session.deck().id,
        study_mode,
    };
    Some((scope, entry.session.results().to_vec()))
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Study session {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use study_core::{Card, StudyRecord};

    #[derive(Default)]
    struct MemorySink {
        batches: Mutex<Vec<Vec<StudyRecord>>>,
    }

    impl MemorySink {
        fn batches(&self) -> Vec<Vec<StudyRecord>> {
            self.batches.lock().unwrap().clone()
        }
    }

    impl ResultSink for MemorySink {
        type Error = String;

        async fn append_batch(&self, records: Vec<StudyRecord>) -> std::result::Result<(), String> {
            self.batches.lock().unwrap().push(records);
            Ok(())
        }
    }

    fn deck(size: usize) -> Deck {
        Deck {
            id: Uuid::new_v4(),
            title: "Capitals".to_string(),
            description: None,
            subject: Some("Geography".to_string()),
            cards: (0..size)
                .map(|i| Card::new(Uuid::new_v4(), format!("Country {i}"), format!("City {i}"), 2))
                .collect(),
        }
    }

    fn registry(idle_minutes: i64) -> (Arc<SessionRegistry<MemorySink>>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        (Arc::new(SessionRegistry::new(Arc::clone(&sink), idle_minutes)), sink)
    }

    /// Let spawned persistence tasks run.
    async fn settle(sink: &MemorySink) {
        for _ in 0..100 {
            if !sink.batches().is_empty() {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    fn current_card(view: &SessionView) -> Uuid {
        view.card.as_ref().expect("card in view").id
    }

    #[tokio::test]
    async fn empty_deck_is_rejected() {
        let (registry, _) = registry(120);
        let err = registry.create(Uuid::new_v4(), deck(0)).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn flashcard_run_persists_one_batch() {
        let (registry, sink) = registry(120);
        let owner = Uuid::new_v4();
        let (id, view) = registry.create(owner, deck(3)).unwrap();
        assert_eq!(view.status, SessionStatus::Unselected);

        registry.start(id, owner, StudyMode::Flashcard).unwrap();
        for rating in [5, 2, 4] {
            registry.reveal(id, owner).unwrap();
            registry.rate(id, owner, rating).unwrap();
        }

        let view = registry.view(id, owner).unwrap();
        assert_eq!(view.status, SessionStatus::Complete);
        let summary = view.summary.expect("summary when complete");
        assert_eq!(summary.accuracy, 67);
        assert_eq!(summary.average_rating, 3.7);

        settle(&sink).await;
        let batches = sink.batches();
        assert_eq!(batches.len(), 1);
        let ratings: Vec<u8> = batches[0].iter().map(|r| r.difficulty_rating).collect();
        assert_eq!(ratings, vec![5, 2, 4]);
        assert!(batches[0].iter().all(|r| r.user_id == owner && r.session_id == view.attempt_id));
    }

    #[tokio::test]
    async fn other_learners_cannot_see_session() {
        let (registry, _) = registry(120);
        let owner = Uuid::new_v4();
        let (id, _) = registry.create(owner, deck(2)).unwrap();

        let stranger = Uuid::new_v4();
        assert!(matches!(registry.view(id, stranger), Err(ApiError::NotFound(_))));
        assert!(matches!(registry.exit(id, stranger), Err(ApiError::NotFound(_))));
        assert_eq!(registry.active_count(), 1);
    }

    #[tokio::test]
    async fn contract_violation_maps_to_conflict() {
        let (registry, _) = registry(120);
        let owner = Uuid::new_v4();
        let (id, _) = registry.create(owner, deck(2)).unwrap();

        registry.start(id, owner, StudyMode::Quiz).unwrap();
        let err = registry.rate(id, owner, 4).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn quiz_countdown_forces_timeout() {
        let (registry, _) = registry(120);
        let owner = Uuid::new_v4();
        let (id, _) = registry.create(owner, deck(2)).unwrap();

        let view = registry.start(id, owner, StudyMode::Quiz).unwrap();
        let first = current_card(&view);
        registry.select(id, owner, 0).unwrap();

        tokio::time::sleep(std::time::Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        let view = registry.view(id, owner).unwrap();
        assert_eq!(view.position, 2);

        let results = {
            let sessions = registry.sessions.lock().unwrap();
            sessions[&id].session.results().to_vec()
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].flashcard_id, first);
        assert_eq!(results[0].difficulty_rating, 1);
        assert!(!results[0].is_correct);

        // The learner's late answer for the timed-out card changes nothing.
        let after = registry.submit(id, owner, first).unwrap();
        assert_eq!(after.position, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exit_cancels_countdown() {
        let (registry, sink) = registry(120);
        let owner = Uuid::new_v4();
        let (id, _) = registry.create(owner, deck(1)).unwrap();
        registry.start(id, owner, StudyMode::Quiz).unwrap();

        registry.exit(id, owner).unwrap();
        assert_eq!(registry.active_count(), 0);

        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        tokio::task::yield_now().await;
        assert!(sink.batches().is_empty());
        assert!(matches!(registry.view(id, owner), Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn reset_rearms_and_starts_new_attempt() {
        let (registry, sink) = registry(120);
        let owner = Uuid::new_v4();
        let (id, _) = registry.create(owner, deck(2)).unwrap();

        let started = registry.start(id, owner, StudyMode::Quiz).unwrap();
        let token_before = {
            let sessions = registry.sessions.lock().unwrap();
            sessions[&id].armed.as_ref().map(|armed| armed.token)
        };
        assert!(token_before.is_some());

        let view = registry.reset(id, owner).unwrap();
        assert_eq!(view.status, SessionStatus::Unselected);
        assert_ne!(view.attempt_id, started.attempt_id);
        {
            let sessions = registry.sessions.lock().unwrap();
            assert!(sessions[&id].armed.is_none());
        }

        registry.start(id, owner, StudyMode::Quiz).unwrap();
        let token_after = {
            let sessions = registry.sessions.lock().unwrap();
            sessions[&id].armed.as_ref().map(|armed| armed.token)
        };
        assert!(token_after.is_some());
        assert_ne!(token_before, token_after);
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let (registry, _) = registry(0);
        let owner = Uuid::new_v4();
        let (id, _) = registry.create(owner, deck(2)).unwrap();

        assert!(matches!(registry.view(id, owner), Err(ApiError::NotFound(_))));
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn oversized_idle_timeout_keeps_sessions() {
        for idle_minutes in [1_000_000_000_000, i64::MAX] {
            let (registry, _) = registry(idle_minutes);
            let owner = Uuid::new_v4();
            let (id, _) = registry.create(owner, deck(2)).unwrap();

            registry.start(id, owner, StudyMode::Flashcard).unwrap();
            assert_eq!(registry.view(id, owner).unwrap().status, SessionStatus::InProgress);
            assert_eq!(registry.active_count(), 1);
        }
    }

    #[tokio::test]
    async fn negative_idle_timeout_evicts_like_zero() {
        let (registry, _) = registry(-30);
        let owner = Uuid::new_v4();
        let (id, _) = registry.create(owner, deck(2)).unwrap();

        assert!(matches!(registry.view(id, owner), Err(ApiError::NotFound(_))));
        assert_eq!(registry.active_count(), 0);
    }
}
