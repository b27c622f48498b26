// src/engine/session.rs

use chrono::Utc;
use thiserror::Error;

use crate::models::{
    question::{QuizOption, Question},
    score::{Answer, QuizResult},
};

/// Lifecycle of a single quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress { current_index: usize, time_left: u32 },
    Finished,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No questions available")]
    NoQuestions,

    #[error("Session already started")]
    AlreadyStarted,

    #[error("Session is not in progress")]
    NotInProgress,

    #[error("Option '{0}' does not belong to the current question")]
    UnknownOption(String),
}

/// Where the session landed after a question was closed.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Next { current_index: usize, time_left: u32 },
    /// `result` is only set when the session belongs to a known user.
    Finished { result: Option<QuizResult> },
}

/// Outcome of closing a question, by answer or by timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub answer: Answer,
    pub progress: Progress,
}

/// Outcome of one countdown tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// Not in progress, or the tick targeted a question that is no longer current.
    Ignored,
    Counting { time_left: u32 },
    TimedOut(Step),
}

/// Drives one player through an ordered list of questions.
///
/// The session owns its score and answer log. Time is advanced externally by
/// calling [`QuizSession::tick`] once per second.
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    user_id: Option<i64>,
    state: SessionState,
    score: i64,
    answers: Vec<Answer>,
    result: Option<QuizResult>,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            user_id: None,
            state: SessionState::NotStarted,
            score: 0,
            answers: Vec::new(),
            result: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    /// The result built when the session finished, persisted or not.
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::InProgress { current_index, .. } => self.questions.get(current_index),
            _ => None,
        }
    }

    /// Starts the session for `user_id` (`None` for anonymous players).
    pub fn start(&mut self, user_id: Option<i64>) -> Result<(), SessionError> {
        if self.state != SessionState::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        let first = self.questions.first().ok_or(SessionError::NoQuestions)?;

        self.state = SessionState::InProgress {
            current_index: 0,
            time_left: first.time_limit_secs(),
        };
        self.user_id = user_id;
        Ok(())
    }

    /// Records `option` as the answer to the current question.
    ///
    /// `points` are credited only if the option is marked correct. The session
    /// moves on immediately, whatever time is left.
    pub fn submit_answer(&mut self, option: &QuizOption, points: i64) -> Result<Step, SessionError> {
        let question = self.current_question().ok_or(SessionError::NotInProgress)?;

        let awarded = if option.is_correct { points } else { 0 };
        let answer = Answer {
            question_id: question.id,
            question_text: question.text.clone(),
            selected_option: Some(option.text.clone()),
            is_correct: option.is_correct,
            points: awarded,
            timed_out: false,
            answered_at: Utc::now(),
        };

        Ok(self.close_question(answer))
    }

    /// Answers the current question with one of its own options, crediting the
    /// question's configured points.
    pub fn answer_option(&mut self, option_id: &str) -> Result<Step, SessionError> {
        let question = self.current_question().ok_or(SessionError::NotInProgress)?;
        let option = question
            .option(option_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownOption(option_id.to_string()))?;
        let points = i64::from(question.points);

        self.submit_answer(&option, points)
    }

    /// One second elapsed on the current question.
    pub fn tick(&mut self) -> Tick {
        let SessionState::InProgress {
            current_index,
            time_left,
        } = self.state
        else {
            return Tick::Ignored;
        };

        let time_left = time_left.saturating_sub(1);
        if time_left > 0 {
            self.state = SessionState::InProgress {
                current_index,
                time_left,
            };
            return Tick::Counting { time_left };
        }

        let question = &self.questions[current_index];
        let answer = Answer {
            question_id: question.id,
            question_text: question.text.clone(),
            selected_option: None,
            is_correct: false,
            points: 0,
            timed_out: true,
            answered_at: Utc::now(),
        };
        tracing::debug!(question_id = question.id, "Question timed out");

        Tick::TimedOut(self.close_question(answer))
    }

    /// Like [`QuizSession::tick`], but only applies while `question_index` is
    /// still the current question.
    pub fn tick_question(&mut self, question_index: usize) -> Tick {
        match self.state {
            SessionState::InProgress { current_index, .. } if current_index == question_index => {
                self.tick()
            }
            _ => Tick::Ignored,
        }
    }

    fn close_question(&mut self, answer: Answer) -> Step {
        self.score += answer.points;
        self.answers.push(answer.clone());
        let progress = self.advance();
        Step { answer, progress }
    }

    fn advance(&mut self) -> Progress {
        let SessionState::InProgress { current_index, .. } = self.state else {
            return Progress::Finished { result: None };
        };

        let next = current_index + 1;
        if let Some(question) = self.questions.get(next) {
            let time_left = question.time_limit_secs();
            self.state = SessionState::InProgress {
                current_index: next,
                time_left,
            };
            return Progress::Next {
                current_index: next,
                time_left,
            };
        }

        self.state = SessionState::Finished;
        let result = QuizResult {
            user_id: self.user_id,
            score: self.score,
            total_questions: i32::try_from(self.questions.len()).unwrap_or(i32::MAX),
            completed_at: Utc::now(),
            answers: self.answers.clone(),
        };
        self.result = Some(result.clone());

        Progress::Finished {
            result: self.user_id.map(|_| result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn question(id: i64, time_limit: i32, points: i32) -> Question {
        Question {
            id,
            text: format!("Question {}", id),
            options: Json(vec![
                QuizOption {
                    id: format!("{}-right", id),
                    text: "Right".to_string(),
                    is_correct: true,
                },
                QuizOption {
                    id: format!("{}-wrong", id),
                    text: "Wrong".to_string(),
                    is_correct: false,
                },
            ]),
            time_limit,
            points,
            created_at: None,
        }
    }

    fn started(questions: Vec<Question>, user_id: Option<i64>) -> QuizSession {
        let mut session = QuizSession::new(questions);
        session.start(user_id).unwrap();
        session
    }

    #[test]
    fn test_start_sets_first_question() {
        let session = started(vec![question(1, 30, 5), question(2, 20, 10)], Some(1));
        assert_eq!(
            session.state(),
            SessionState::InProgress {
                current_index: 0,
                time_left: 30
            }
        );
        assert_eq!(session.current_question().unwrap().id, 1);
    }

    #[test]
    fn test_start_without_questions_stays_not_started() {
        let mut session = QuizSession::new(vec![]);
        assert_eq!(session.start(Some(1)), Err(SessionError::NoQuestions));
        assert_eq!(session.state(), SessionState::NotStarted);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut session = started(vec![question(1, 30, 5)], None);
        assert_eq!(session.start(None), Err(SessionError::AlreadyStarted));
    }

    #[test]
    fn test_correct_answer_adds_points() {
        let mut session = started(vec![question(1, 30, 5), question(2, 20, 10)], Some(1));
        let step = session.answer_option("1-right").unwrap();

        assert_eq!(session.score(), 5);
        assert_eq!(step.answer.points, 5);
        assert_eq!(
            step.progress,
            Progress::Next {
                current_index: 1,
                time_left: 20
            }
        );
    }

    #[test]
    fn test_wrong_answer_adds_nothing_but_is_logged() {
        let mut session = started(vec![question(1, 30, 5), question(2, 20, 10)], Some(1));
        session.answer_option("1-wrong").unwrap();

        assert_eq!(session.score(), 0);
        assert_eq!(session.answers().len(), 1);
        assert!(!session.answers()[0].is_correct);
        assert_eq!(session.answers()[0].selected_option.as_deref(), Some("Wrong"));
    }

    #[test]
    fn test_submit_uses_caller_points_for_correct_option() {
        let mut session = started(vec![question(1, 30, 5)], Some(1));
        let option = QuizOption {
            id: "x".to_string(),
            text: "Anything".to_string(),
            is_correct: true,
        };
        session.submit_answer(&option, 7).unwrap();
        assert_eq!(session.score(), 7);
    }

    #[test]
    fn test_unknown_option_leaves_state_untouched() {
        let mut session = started(vec![question(1, 30, 5)], Some(1));
        let before = session.state();

        let err = session.answer_option("nope").unwrap_err();
        assert_eq!(err, SessionError::UnknownOption("nope".to_string()));
        assert_eq!(session.state(), before);
        assert!(session.answers().is_empty());
    }

    #[test]
    fn test_answer_out_of_state_is_rejected() {
        let mut session = QuizSession::new(vec![question(1, 30, 5)]);
        assert_eq!(
            session.answer_option("1-right").unwrap_err(),
            SessionError::NotInProgress
        );

        session.start(None).unwrap();
        session.answer_option("1-right").unwrap();
        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(
            session.answer_option("1-right").unwrap_err(),
            SessionError::NotInProgress
        );
        assert_eq!(session.score(), 5);
    }

    #[test]
    fn test_all_answered_finishes_with_sum_of_correct_points() {
        let questions = vec![question(1, 10, 1), question(2, 10, 2), question(3, 10, 4)];
        let mut session = started(questions, Some(9));

        session.answer_option("1-right").unwrap();
        session.answer_option("2-wrong").unwrap();
        let step = session.answer_option("3-right").unwrap();

        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(session.score(), 5);
        let Progress::Finished { result: Some(result) } = step.progress else {
            panic!("expected a result to persist");
        };
        assert_eq!(result.user_id, Some(9));
        assert_eq!(result.score, 5);
        assert_eq!(result.total_questions, 3);
        assert_eq!(result.answers.len(), 3);
    }

    #[test]
    fn test_anonymous_session_emits_no_result() {
        let mut session = started(vec![question(1, 10, 1)], None);
        let step = session.answer_option("1-right").unwrap();

        assert_eq!(step.progress, Progress::Finished { result: None });
        assert_eq!(session.result().unwrap().score, 1);
    }

    #[test]
    fn test_tick_counts_down() {
        let mut session = started(vec![question(1, 3, 1)], None);
        assert_eq!(session.tick(), Tick::Counting { time_left: 2 });
        assert_eq!(session.tick(), Tick::Counting { time_left: 1 });
        assert!(matches!(session.tick(), Tick::TimedOut(_)));
        assert_eq!(session.tick(), Tick::Ignored);
    }

    #[test]
    fn test_timeout_appends_zero_point_answer() {
        let mut session = started(vec![question(1, 1, 5), question(2, 4, 1)], Some(1));
        let Tick::TimedOut(step) = session.tick() else {
            panic!("expected a timeout");
        };

        assert!(step.answer.timed_out);
        assert_eq!(step.answer.selected_option, None);
        assert_eq!(step.answer.points, 0);
        assert_eq!(session.answers().len(), 1);
        assert_eq!(
            session.state(),
            SessionState::InProgress {
                current_index: 1,
                time_left: 4
            }
        );
    }

    #[test]
    fn test_answer_then_timeout_scenario() {
        let mut session = started(vec![question(1, 30, 5), question(2, 20, 10)], Some(3));
        session.answer_option("1-right").unwrap();

        let mut last = Tick::Ignored;
        for _ in 0..20 {
            last = session.tick();
        }

        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(session.score(), 5);
        assert_eq!(session.answers().len(), 2);
        let Tick::TimedOut(Step {
            progress: Progress::Finished { result: Some(result) },
            ..
        }) = last
        else {
            panic!("expected the last tick to finish the session");
        };
        assert_eq!(result.total_questions, 2);
        assert_eq!(result.score, 5);
    }

    #[test]
    fn test_stale_tick_is_ignored() {
        let mut session = started(vec![question(1, 30, 5), question(2, 20, 10)], None);
        session.answer_option("1-wrong").unwrap();

        assert_eq!(session.tick_question(0), Tick::Ignored);
        assert_eq!(
            session.state(),
            SessionState::InProgress {
                current_index: 1,
                time_left: 20
            }
        );
        assert_eq!(session.tick_question(1), Tick::Counting { time_left: 19 });
    }

    #[test]
    fn test_score_always_matches_answer_log() {
        let questions: Vec<Question> = (1..=6).map(|i| question(i, 2, i as i32)).collect();
        let mut session = started(questions, Some(1));

        for i in 1..=6 {
            match i % 3 {
                0 => {
                    session.tick();
                    session.tick();
                }
                1 => {
                    session.answer_option(&format!("{}-right", i)).unwrap();
                }
                _ => {
                    session.answer_option(&format!("{}-wrong", i)).unwrap();
                }
            }
            let logged: i64 = session.answers().iter().map(|a| a.points).sum();
            assert_eq!(session.score(), logged);
            assert_eq!(session.answers().len(), i as usize);
        }

        assert_eq!(session.state(), SessionState::Finished);
        assert_eq!(session.result().unwrap().total_questions, 6);
        assert_eq!(session.score(), 1 + 4);
    }
}
