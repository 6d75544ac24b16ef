//! Redis-backed [`SessionStore`].
//!
//! Key layout per session `S` of quiz `Q`:
//!
//! - `quiz:session:{S}`: hash, field `data` holds the JSON session blob
//! - `quiz:session:{S}:players`: hash, playerID -> JSON player record
//! - `quiz:index:quizid:{Q}`: string, the active session ID for the quiz
//! - `quiz:session:{S}:scores`: sorted set, cumulative score per playerID
//!
//! All four keys share one 24h TTL armed at creation. Only single-key
//! operations are atomic (one hash write, one ZINCRBY); the aggregate is not.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{SESSION_TTL_SECS, SessionStore, StoreError};
use crate::domain::{Answer, Session, SessionPlayer};

fn session_key(session_id: &str) -> String {
    format!("quiz:session:{session_id}")
}

fn players_key(session_id: &str) -> String {
    format!("quiz:session:{session_id}:players")
}

fn quiz_index_key(quiz_id: &str) -> String {
    format!("quiz:index:quizid:{quiz_id}")
}

fn leaderboard_key(session_id: &str) -> String {
    format!("quiz:session:{session_id}:scores")
}

pub struct RedisSessionStore {
    conn: ConnectionManager,
    /// In-process answer log, sessionID -> answer key -> answer. Not written
    /// to Redis: a restart preserves scores but loses recorded answers.
    answers: Mutex<HashMap<String, HashMap<String, Answer>>>,
}

impl RedisSessionStore {
    /// Connect to Redis at `redis_url` (e.g. `redis://localhost:6379/0`).
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url).map_err(StoreError::Backend)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            answers: Mutex::new(HashMap::new()),
        })
    }

    async fn session_players(&self, session_id: &str) -> Result<Vec<SessionPlayer>, StoreError> {
        let mut con = self.conn.clone();
        let raw: HashMap<String, String> = con.hgetall(players_key(session_id)).await?;

        let mut players = raw
            .values()
            .map(|data| serde_json::from_str(data).map_err(StoreError::Serde))
            .collect::<Result<Vec<SessionPlayer>, _>>()?;
        players.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(players)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create_quiz_session(&self, session: &mut Session) -> Result<(), StoreError> {
        session.id = Uuid::new_v4().to_string();
        let data = serde_json::to_string(session)?;

        let mut con = self.conn.clone();
        let key = session_key(&session.id);
        let _: () = con.hset(&key, "data", data).await?;

        let index_key = quiz_index_key(&session.quiz.id);
        let _: () = con
            .set_ex(&index_key, &session.id, SESSION_TTL_SECS as u64)
            .await?;

        // Arm the shared TTL on every key of the aggregate, including the
        // still-empty player and leaderboard keys.
        let _: () = con.expire(&key, SESSION_TTL_SECS).await?;
        let _: () = con.expire(&index_key, SESSION_TTL_SECS).await?;
        let _: () = con
            .expire(players_key(&session.id), SESSION_TTL_SECS)
            .await?;
        let _: () = con
            .expire(leaderboard_key(&session.id), SESSION_TTL_SECS)
            .await?;

        Ok(())
    }

    async fn find_quiz_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let mut con = self.conn.clone();
        let raw: HashMap<String, String> = con.hgetall(session_key(session_id)).await?;
        let Some(data) = raw.get("data") else {
            return Ok(None);
        };

        let mut session: Session = serde_json::from_str(data)?;
        session.players = self.session_players(session_id).await?;
        session.answers = self
            .answers
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default();
        Ok(Some(session))
    }

    async fn find_quiz_session_by_quiz_id(
        &self,
        quiz_id: &str,
    ) -> Result<Option<Session>, StoreError> {
        let mut con = self.conn.clone();
        let session_id: Option<String> = con.get(quiz_index_key(quiz_id)).await?;
        match session_id {
            Some(session_id) => self.find_quiz_session(&session_id).await,
            None => Ok(None),
        }
    }

    async fn add_player_to_quiz_session(
        &self,
        session_id: &str,
        player: SessionPlayer,
    ) -> Result<(), StoreError> {
        let data = serde_json::to_string(&player)?;

        // Two independent writes; a failure between them leaves the player
        // unranked and is surfaced without rollback.
        let mut con = self.conn.clone();
        let _: () = con.hset(players_key(session_id), &player.id, data).await?;
        let _: () = con
            .zadd(leaderboard_key(session_id), &player.id, 0i64)
            .await?;
        Ok(())
    }

    async fn find_quiz_player_session(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<Option<Session>, StoreError> {
        let Some(session) = self.find_quiz_session(session_id).await? else {
            return Ok(None);
        };
        if !session.players.iter().any(|p| p.id == player_id) {
            return Ok(None);
        }
        Ok(Some(session))
    }

    async fn update_quiz_player_score_session(
        &self,
        session_id: &str,
        player_id: &str,
        score: i64,
        answer_key: String,
        answer: Answer,
    ) -> Result<(), StoreError> {
        let mut con = self.conn.clone();

        // Authoritative ranking first: a single atomic increment.
        let _: () = con
            .zincr(leaderboard_key(session_id), player_id, score)
            .await?;

        // Then the denormalized copy on the player record. Not transactional
        // with the increment above.
        let key = players_key(session_id);
        let data: Option<String> = con.hget(&key, player_id).await?;
        let data = data.ok_or_else(|| {
            StoreError::MissingRecord(format!("player {player_id} in session {session_id}"))
        })?;

        let mut player: SessionPlayer = serde_json::from_str(&data)?;
        player.score += score;
        let _: () = con
            .hset(&key, player_id, serde_json::to_string(&player)?)
            .await?;

        self.answers
            .lock()
            .await
            .entry(session_id.to_owned())
            .or_default()
            .insert(answer_key, answer);
        Ok(())
    }

    async fn find_leaderboard_quiz_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionPlayer>, StoreError> {
        let mut con = self.conn.clone();
        let ranked: Vec<(String, f64)> = con
            .zrevrange_withscores(leaderboard_key(session_id), 0, -1)
            .await?;

        let key = players_key(session_id);
        let mut players = Vec::with_capacity(ranked.len());
        for (player_id, _score) in ranked {
            let data: Option<String> = con.hget(&key, &player_id).await?;
            let data = data.ok_or_else(|| {
                StoreError::MissingRecord(format!("player {player_id} in session {session_id}"))
            })?;
            players.push(serde_json::from_str(&data)?);
        }
        Ok(players)
    }
}
