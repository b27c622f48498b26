// src/services/sessions.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, RwLock, Weak},
    time::Duration,
};

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    config::SESSION_RETENTION_SECS,
    engine::{
        session::{Progress, QuizSession, SessionState, Tick},
        timer::{Countdown, TickFlow},
    },
    error::AppError,
    models::{
        score::QuizResult,
        session::{AnswerResponse, SessionView},
    },
    store::QuizStore,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A live session and the countdown of its current question.
struct SessionEntry {
    owner: Option<i64>,
    session: Mutex<QuizSession>,
    countdown: Mutex<Option<Countdown>>,
}

impl SessionEntry {
    fn session(&self) -> MutexGuard<'_, QuizSession> {
        lock(&self.session)
    }

    fn replace_countdown(&self, countdown: Option<Countdown>) {
        // Dropping the previous handle aborts its task.
        *lock(&self.countdown) = countdown;
    }
}

/// Owns the running quiz sessions of the server.
///
/// Sessions live in memory only. Finished results go to the store; the
/// session itself is evicted some time after it finished.
pub struct SessionManager {
    store: Arc<dyn QuizStore>,
    sessions: RwLock<HashMap<Uuid, Arc<SessionEntry>>>,
    tick_period: Duration,
    retention: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn QuizStore>) -> Arc<Self> {
        Self::with_timing(
            store,
            Duration::from_secs(1),
            Duration::from_secs(SESSION_RETENTION_SECS),
        )
    }

    pub fn with_timing(
        store: Arc<dyn QuizStore>,
        tick_period: Duration,
        retention: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            sessions: RwLock::new(HashMap::new()),
            tick_period,
            retention,
        })
    }

    pub fn store(&self) -> &Arc<dyn QuizStore> {
        &self.store
    }

    /// Number of sessions currently held, finished or not.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches the current questions and starts a session for `user_id`.
    pub async fn start(self: &Arc<Self>, user_id: Option<i64>) -> Result<SessionView, AppError> {
        let questions = self.store.list_questions().await?;

        let mut session = QuizSession::new(questions);
        if let Err(e) = session.start(user_id) {
            tracing::warn!("Cannot start quiz session: {}", e);
            return Err(e.into());
        }

        let id = Uuid::new_v4();
        let view = SessionView::of(id, &session);
        let entry = Arc::new(SessionEntry {
            owner: user_id,
            session: Mutex::new(session),
            countdown: Mutex::new(None),
        });

        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, entry.clone());
        self.arm_countdown(id, &entry);

        tracing::info!(session_id = %id, user_id = ?user_id, "Quiz session started");
        Ok(view)
    }

    pub fn view(&self, id: Uuid, user_id: Option<i64>) -> Result<SessionView, AppError> {
        let entry = self.entry(id, user_id)?;
        let session = entry.session();
        Ok(SessionView::of(id, &session))
    }

    /// Answers the current question of session `id` with `option_id`.
    pub async fn answer(
        self: &Arc<Self>,
        id: Uuid,
        user_id: Option<i64>,
        option_id: &str,
    ) -> Result<AnswerResponse, AppError> {
        let entry = self.entry(id, user_id)?;

        let (step, view) = {
            let mut session = entry.session();
            let step = session.answer_option(option_id)?;
            (step, SessionView::of(id, &session))
        };

        entry.replace_countdown(None);
        match &step.progress {
            Progress::Next { .. } => self.arm_countdown(id, &entry),
            Progress::Finished { result } => {
                // The save runs detached; dropping this request does not cancel it.
                if let Err(e) = self.finish(id, result.clone()).await {
                    tracing::error!(session_id = %id, "Quiz result task failed: {}", e);
                }
            }
        }

        Ok(AnswerResponse {
            answer: step.answer,
            session: view,
        })
    }

    fn entry(&self, id: Uuid, user_id: Option<i64>) -> Result<Arc<SessionEntry>, AppError> {
        let entry = self
            .sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&id)
            .cloned()
            .ok_or(AppError::NotFound("Session not found".to_string()))?;

        if let Some(owner) = entry.owner {
            if user_id != Some(owner) {
                return Err(AppError::Forbidden(
                    "Session belongs to another user".to_string(),
                ));
            }
        }
        Ok(entry)
    }

    /// Starts ticking the current question of `entry`.
    ///
    /// One countdown covers consecutive timeouts; an answer replaces it.
    fn arm_countdown(self: &Arc<Self>, id: Uuid, entry: &Arc<SessionEntry>) {
        let SessionState::InProgress {
            current_index: mut question_index,
            ..
        } = entry.session().state()
        else {
            return;
        };

        let manager = Arc::downgrade(self);
        let weak_entry = Arc::downgrade(entry);

        let countdown = Countdown::start(self.tick_period, move || {
            let tick = match weak_entry.upgrade() {
                Some(entry) => entry.session().tick_question(question_index),
                None => Tick::Ignored,
            };

            let mut finished = None;
            let flow = match tick {
                Tick::Ignored => TickFlow::Stop,
                Tick::Counting { .. } => TickFlow::Continue,
                Tick::TimedOut(step) => match step.progress {
                    Progress::Next { current_index, .. } => {
                        question_index = current_index;
                        TickFlow::Continue
                    }
                    Progress::Finished { result } => {
                        finished = Some(result);
                        TickFlow::Stop
                    }
                },
            };

            let manager: Weak<SessionManager> = manager.clone();
            async move {
                if let (Some(result), Some(manager)) = (finished, manager.upgrade()) {
                    if let Err(e) = manager.finish(id, result).await {
                        tracing::error!(session_id = %id, "Quiz result task failed: {}", e);
                    }
                }
                flow
            }
        });

        entry.replace_countdown(Some(countdown));
    }

    /// Hands the result to the store, then schedules eviction.
    /// A failed save is logged; the finished session stays as it is.
    ///
    /// Both steps run on their own task. The returned handle completes once
    /// the save is done.
    fn finish(self: &Arc<Self>, id: Uuid, result: Option<QuizResult>) -> JoinHandle<()> {
        let store = self.store.clone();
        let manager = Arc::downgrade(self);
        let retention = self.retention;

        tokio::spawn(async move {
            match result {
                Some(result) => match store.save_result(&result).await {
                    Ok(score_id) => tracing::info!(
                        session_id = %id,
                        score_id,
                        score = result.score,
                        "Quiz session finished"
                    ),
                    Err(e) => {
                        tracing::error!(session_id = %id, "Failed to save quiz result: {}", e)
                    }
                },
                None => tracing::info!(session_id = %id, "Anonymous quiz session finished"),
            }

            tokio::spawn(async move {
                tokio::time::sleep(retention).await;
                if let Some(manager) = manager.upgrade() {
                    manager
                        .sessions
                        .write()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .remove(&id);
                    tracing::debug!(session_id = %id, "Evicted finished quiz session");
                }
            });
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            question::{NewQuestion, QuizOption},
            session::SessionStatus,
        },
        store::{MemoryStore, StoreError},
    };
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn options(prefix: &str) -> Vec<QuizOption> {
        vec![
            QuizOption {
                id: format!("{}-right", prefix),
                text: "Right".to_string(),
                is_correct: true,
            },
            QuizOption {
                id: format!("{}-wrong", prefix),
                text: "Wrong".to_string(),
                is_correct: false,
            },
        ]
    }

    async fn seeded_store(limits_and_points: &[(i32, i32)]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for (i, (time_limit, points)) in limits_and_points.iter().enumerate() {
            store
                .create_question(NewQuestion {
                    text: format!("Question {}", i + 1),
                    options: options(&format!("q{}", i + 1)),
                    time_limit: *time_limit,
                    points: *points,
                })
                .await
                .unwrap();
        }
        store
    }

    fn manager(store: Arc<dyn QuizStore>) -> Arc<SessionManager> {
        SessionManager::with_timing(store, Duration::from_secs(1), Duration::from_secs(60))
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_questions_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store);

        let err = manager.start(Some(1)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(manager.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_then_timeout_saves_result() {
        let store = seeded_store(&[(30, 5), (20, 10)]).await;
        let manager = manager(store.clone());

        let view = manager.start(Some(7)).await.unwrap();
        assert_eq!(view.time_left, Some(30));
        assert_eq!(view.current_index, Some(0));

        let outcome = manager
            .answer(view.session_id, Some(7), "q1-right")
            .await
            .unwrap();
        assert_eq!(outcome.session.score, 5);
        assert_eq!(outcome.session.time_left, Some(20));

        tokio::time::sleep(Duration::from_millis(20_500)).await;

        let view = manager.view(view.session_id, Some(7)).unwrap();
        assert_eq!(view.status, SessionStatus::Finished);
        assert_eq!(view.score, 5);
        assert_eq!(view.answers.len(), 2);
        assert!(view.answers[1].timed_out);

        let scores = store.list_scores().await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].user_id, 7);
        assert_eq!(scores[0].score, 5);
        assert_eq!(scores[0].total_questions, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_restarts_after_answer() {
        let store = seeded_store(&[(5, 1), (5, 1)]).await;
        let manager = manager(store);

        let view = manager.start(None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(manager.view(view.session_id, None).unwrap().time_left, Some(2));

        manager
            .answer(view.session_id, None, "q1-wrong")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1_500)).await;

        let current = manager.view(view.session_id, None).unwrap();
        assert_eq!(current.current_index, Some(1));
        assert_eq!(current.time_left, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_anonymous_session_is_not_saved() {
        let store = seeded_store(&[(10, 3)]).await;
        let manager = manager(store.clone());

        let view = manager.start(None).await.unwrap();
        let outcome = manager
            .answer(view.session_id, None, "q1-right")
            .await
            .unwrap();

        assert_eq!(outcome.session.status, SessionStatus::Finished);
        assert_eq!(outcome.session.score, 3);
        assert!(store.list_scores().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_user_cannot_drive_session() {
        let store = seeded_store(&[(10, 3)]).await;
        let manager = manager(store);

        let view = manager.start(Some(1)).await.unwrap();
        let err = manager
            .answer(view.session_id, Some(2), "q1-right")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = manager.view(view.session_id, None).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_session_is_evicted() {
        let store = seeded_store(&[(10, 3)]).await;
        let manager = manager(store);

        let view = manager.start(None).await.unwrap();
        manager
            .answer(view.session_id, None, "q1-right")
            .await
            .unwrap();
        assert_eq!(manager.len(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(manager.is_empty());
        assert!(matches!(
            manager.view(view.session_id, None),
            Err(AppError::NotFound(_))
        ));
    }

    /// Memory store whose result sink is slow or broken.
    struct FaultySink {
        inner: MemoryStore,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl QuizStore for FaultySink {
        async fn list_questions(&self) -> Result<Vec<crate::models::question::Question>, StoreError> {
            self.inner.list_questions().await
        }
        async fn count_questions(&self) -> Result<i64, StoreError> {
            self.inner.count_questions().await
        }
        async fn create_question(&self, question: NewQuestion) -> Result<i64, StoreError> {
            self.inner.create_question(question).await
        }
        async fn update_question(
            &self,
            id: i64,
            changes: crate::models::question::QuestionChanges,
        ) -> Result<(), StoreError> {
            self.inner.update_question(id, changes).await
        }
        async fn delete_question(&self, id: i64) -> Result<(), StoreError> {
            self.inner.delete_question(id).await
        }
        async fn list_users(&self) -> Result<Vec<crate::models::user::User>, StoreError> {
            self.inner.list_users().await
        }
        async fn find_user_by_email(
            &self,
            email: &str,
        ) -> Result<Option<crate::models::user::User>, StoreError> {
            self.inner.find_user_by_email(email).await
        }
        async fn create_user(&self, user: crate::models::user::NewUser) -> Result<i64, StoreError> {
            self.inner.create_user(user).await
        }
        async fn update_user(
            &self,
            id: i64,
            changes: crate::models::user::UserChanges,
        ) -> Result<(), StoreError> {
            self.inner.update_user(id, changes).await
        }
        async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
            self.inner.delete_user(id).await
        }
        async fn user_directory(&self) -> Result<HashMap<i64, String>, StoreError> {
            self.inner.user_directory().await
        }
        async fn save_result(&self, result: &QuizResult) -> Result<i64, StoreError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(StoreError::Invalid("sink unavailable".to_string()));
            }
            self.inner.save_result(result).await
        }
        async fn list_scores(&self) -> Result<Vec<crate::models::score::ScoreRecord>, StoreError> {
            self.inner.list_scores().await
        }
        async fn list_user_scores(
            &self,
            user_id: i64,
        ) -> Result<Vec<crate::models::score::ScoreRecord>, StoreError> {
            self.inner.list_user_scores(user_id).await
        }
        async fn delete_score(&self, id: i64) -> Result<(), StoreError> {
            self.inner.delete_score(id).await
        }
    }

    async fn faulty_sink(delay: Duration, fail: bool) -> Arc<FaultySink> {
        let inner = MemoryStore::new();
        inner
            .create_question(NewQuestion {
                text: "Only question".to_string(),
                options: options("q1"),
                time_limit: 10,
                points: 4,
            })
            .await
            .unwrap();
        Arc::new(FaultySink { inner, delay, fail })
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_save_keeps_finished_score() {
        let manager = manager(faulty_sink(Duration::ZERO, true).await);

        let view = manager.start(Some(1)).await.unwrap();
        let outcome = manager
            .answer(view.session_id, Some(1), "q1-right")
            .await
            .unwrap();

        assert_eq!(outcome.session.status, SessionStatus::Finished);
        assert_eq!(outcome.session.score, 4);
        assert_eq!(manager.view(view.session_id, Some(1)).unwrap().score, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_answer_request_still_saves_and_evicts() {
        let store = faulty_sink(Duration::from_millis(200), false).await;
        let manager = manager(store.clone());

        let view = manager.start(Some(1)).await.unwrap();
        let cut_short = tokio::time::timeout(
            Duration::from_millis(50),
            manager.answer(view.session_id, Some(1), "q1-right"),
        )
        .await;
        assert!(cut_short.is_err());
        assert_eq!(
            manager.view(view.session_id, Some(1)).unwrap().status,
            SessionStatus::Finished
        );

        tokio::time::sleep(Duration::from_secs(3600)).await;

        let scores = store.list_scores().await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 4);
        assert!(manager.is_empty());
    }
}
