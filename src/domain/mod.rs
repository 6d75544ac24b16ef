//! Domain models shared across the protocol, hub, store and quiz layers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a quiz. Only `Active` quizzes accept joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub status: QuizStatus,
    pub created_at: DateTime<Utc>,
}

/// One vocabulary question: a word, its meaning, and multiple-choice options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub quiz_id: String,
    pub word: String,
    pub meaning: String,
    pub options: Vec<String>,
    pub correct: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub username: String,
}

/// A player's record within one quiz session, including the denormalized
/// cumulative score shown on the leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionPlayer {
    pub id: String,
    pub username: String,
    pub quiz_id: String,
    pub score: i64,
}

/// A recorded answer, keyed in the session answer log by
/// `"{question_id}:{player_id}"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub player_choice: String,
    pub correct_answer: String,
}

/// One running quiz session: an immutable quiz+question snapshot taken at
/// creation, plus the mutable player list and answer log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub id: String,
    pub quiz: Quiz,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub players: Vec<SessionPlayer>,
    #[serde(default)]
    pub answers: HashMap<String, Answer>,
}

impl Session {
    /// A fresh session snapshot for a quiz; the store assigns the ID on
    /// creation.
    pub fn new(quiz: Quiz, questions: Vec<Question>) -> Self {
        Self {
            id: String::new(),
            quiz,
            questions,
            players: Vec::new(),
            answers: HashMap::new(),
        }
    }

    /// Answer-log key for one (question, player) pair.
    pub fn answer_key(question_id: &str, player_id: &str) -> String {
        format!("{question_id}:{player_id}")
    }
}

/// Envelope for every message pushed to clients: a `type` tag plus free-form
/// JSON data, broadcast verbatim as a UTF-8 text frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: serde_json::Value,
}

impl WsMessage {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}
