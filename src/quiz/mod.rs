//! Quiz business logic: joining a quiz session and submitting answers.

pub mod repository;
pub mod score;

pub use repository::{InMemoryQuizRepository, QuizReader};
pub use score::calculate_score;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    domain::{Answer, Player, Question, QuizStatus, Session, SessionPlayer, WsMessage},
    hub::{Hub, HubError},
    store::{SessionStore, StoreError},
};

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("quiz not found")]
    QuizNotFound,

    #[error("session not found")]
    SessionNotFound,

    #[error("question not found")]
    QuestionNotFound,

    #[error("question already answered")]
    AlreadyAnswered,

    #[error(transparent)]
    Hub(#[from] HubError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
pub struct JoinQuizRequest {
    pub quiz_id: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinQuizResponse {
    pub session_id: String,
    pub player_id: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub player_id: String,
    pub session_id: String,
    pub quiz_id: String,
    pub question_id: String,
    pub answer: String,
    #[serde(rename = "answer_time")]
    pub answer_time_secs: f64,
}

/// Orchestrates quiz content, the session store and the broadcast hub.
pub struct QuizService {
    quiz_reader: Arc<dyn QuizReader>,
    store: Arc<dyn SessionStore>,
    hub: Arc<Hub>,
}

impl QuizService {
    pub fn new(quiz_reader: Arc<dyn QuizReader>, store: Arc<dyn SessionStore>, hub: Arc<Hub>) -> Self {
        Self {
            quiz_reader,
            store,
            hub,
        }
    }

    /// Join a quiz: the first successful join for a quiz creates its session
    /// and room; later joins are routed to the same session via the quiz-ID
    /// index. The player is authorized into the room but not yet connected.
    pub async fn join_quiz(&self, req: JoinQuizRequest) -> Result<JoinQuizResponse, QuizError> {
        let (quiz, questions) = self.quiz_reader.get_quiz(&req.quiz_id).await?;
        if quiz.status != QuizStatus::Active || questions.is_empty() {
            return Err(QuizError::QuizNotFound);
        }

        let session = match self.store.find_quiz_session_by_quiz_id(&req.quiz_id).await? {
            Some(session) => session,
            None => {
                let mut session = Session::new(quiz, questions);
                self.store.create_quiz_session(&mut session).await?;
                self.hub.create_room(&session.id).await?;
                session
            }
        };

        let player = Player {
            id: Uuid::new_v4().to_string(),
            username: req.username,
        };
        self.store
            .add_player_to_quiz_session(
                &session.id,
                SessionPlayer {
                    id: player.id.clone(),
                    username: player.username.clone(),
                    quiz_id: req.quiz_id,
                    score: 0,
                },
            )
            .await?;
        self.hub.join_room(&session.id, &player.id).await?;

        Ok(JoinQuizResponse {
            session_id: session.id,
            player_id: player.id,
            questions: session.questions,
        })
    }

    /// Score and record one answer, then fan the updated leaderboard out to
    /// the session's room.
    pub async fn submit_answer(&self, req: SubmitAnswerRequest) -> Result<(), QuizError> {
        let session = self
            .store
            .find_quiz_player_session(&req.session_id, &req.player_id)
            .await?
            .ok_or(QuizError::SessionNotFound)?;

        let question = session
            .questions
            .iter()
            .find(|q| q.id == req.question_id)
            .ok_or(QuizError::QuestionNotFound)?;

        // Idempotency guard: one answer per (question, player).
        let answer_key = Session::answer_key(&req.question_id, &req.player_id);
        if session.answers.contains_key(&answer_key) {
            return Err(QuizError::AlreadyAnswered);
        }

        let correct = question.correct == req.answer;
        let score = if correct {
            calculate_score(req.answer_time_secs)
        } else {
            0
        };

        self.store
            .update_quiz_player_score_session(
                &req.session_id,
                &req.player_id,
                score,
                answer_key,
                Answer {
                    player_choice: req.answer,
                    correct_answer: question.correct.clone(),
                },
            )
            .await?;

        let leaderboard = self.store.find_leaderboard_quiz_session(&session.id).await?;

        let messages = [
            WsMessage::new(
                "answer_submitted",
                json!({
                    "player_id": req.player_id,
                    "correct": correct,
                    "score": score,
                }),
            ),
            WsMessage::new("leaderboard_update", json!({ "leaderboard": leaderboard })),
        ];
        for message in &messages {
            self.hub.broadcast_to_room(&session.id, message).await?;
        }

        Ok(())
    }

    /// Look the session up and confirm the player belongs to it.
    pub async fn validate_player_session(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<Session, QuizError> {
        self.store
            .find_quiz_player_session(session_id, player_id)
            .await?
            .ok_or(QuizError::SessionNotFound)
    }
}
