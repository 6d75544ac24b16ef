//! Distributed session/leaderboard store.
//!
//! A session aggregate is physically split into four co-expiring keys in the
//! backing store: the session blob, the per-player records, the quiz-ID index
//! and the ranked leaderboard. The backend guarantees per-key atomicity only;
//! the aggregate as a whole is not transactional, and the store performs no
//! retry on backend failure.

pub mod memory;
pub mod redis;

pub use memory::InMemorySessionStore;
pub use redis::RedisSessionStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Answer, Session, SessionPlayer};

/// TTL shared by all four keys of a session aggregate, armed once at creation
/// and never refreshed.
pub const SESSION_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[from] ::redis::RedisError),

    #[error("failed to (de)serialize stored value: {0}")]
    Serde(#[from] serde_json::Error),

    /// A key the aggregate needs is gone, e.g. a player record missing from
    /// an otherwise live session.
    #[error("missing store record: {0}")]
    MissingRecord(String),
}

/// Session and leaderboard persistence across the shared external store.
///
/// Lookups distinguish two non-error "not found" outcomes: `Ok(None)` when
/// the session (or the player within an existing session) is absent, versus
/// `Err` for genuine backend failures. Callers must not conflate them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Assign a session ID and persist the aggregate, arming the TTL on all
    /// four keys including the still-empty player and leaderboard keys.
    async fn create_quiz_session(&self, session: &mut Session) -> Result<(), StoreError>;

    async fn find_quiz_session(&self, session_id: &str) -> Result<Option<Session>, StoreError>;

    /// Look up the one live session for a quiz through the quiz-ID index.
    async fn find_quiz_session_by_quiz_id(
        &self,
        quiz_id: &str,
    ) -> Result<Option<Session>, StoreError>;

    /// Write the player record and seed a zero-score leaderboard entry. The
    /// two writes are independent; a partial failure is surfaced as an error
    /// without rollback.
    async fn add_player_to_quiz_session(
        &self,
        session_id: &str,
        player: SessionPlayer,
    ) -> Result<(), StoreError>;

    /// `Ok(None)` if the session is absent, or if it exists but the player is
    /// not in it.
    async fn find_quiz_player_session(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<Option<Session>, StoreError>;

    /// Atomically increment the ranked score, then separately rewrite the
    /// player record's cached cumulative score. The two steps are not
    /// transactional: a crash in between leaves the authoritative ranking
    /// and the display copy divergent until the next update. The answer
    /// fragment is kept only in an in-process log, so a restart preserves the
    /// score but loses the recorded answer.
    async fn update_quiz_player_score_session(
        &self,
        session_id: &str,
        player_id: &str,
        score: i64,
        answer_key: String,
        answer: Answer,
    ) -> Result<(), StoreError>;

    /// Players of a session in descending leaderboard order, one record
    /// fetch per member, unpaginated.
    async fn find_leaderboard_quiz_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionPlayer>, StoreError>;
}
