//! In-memory [`SessionStore`] with the same observable semantics as the
//! Redis-backed one: per-key atomicity, descending leaderboard order, and an
//! answer log that is never written to the persisted session blob. Used by
//! tests and for running the server without Redis.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{SessionStore, StoreError};
use crate::domain::{Answer, Session, SessionPlayer};

#[derive(Default)]
struct State {
    /// sessionID -> session blob, as created (players/answers not updated).
    sessions: HashMap<String, Session>,
    /// sessionID -> playerID -> player record.
    players: HashMap<String, HashMap<String, SessionPlayer>>,
    /// quizID -> active sessionID.
    quiz_index: HashMap<String, String>,
    /// sessionID -> playerID -> ranked score.
    leaderboards: HashMap<String, HashMap<String, i64>>,
    /// sessionID -> answer key -> answer.
    answers: HashMap<String, HashMap<String, Answer>>,
}

#[derive(Default)]
pub struct InMemorySessionStore {
    state: Mutex<State>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_quiz_session(&self, session: &mut Session) -> Result<(), StoreError> {
        session.id = Uuid::new_v4().to_string();

        let mut state = self.state.lock().await;
        state
            .quiz_index
            .insert(session.quiz.id.clone(), session.id.clone());
        state.sessions.insert(session.id.clone(), session.clone());
        state.players.insert(session.id.clone(), HashMap::new());
        state.leaderboards.insert(session.id.clone(), HashMap::new());
        Ok(())
    }

    async fn find_quiz_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let state = self.state.lock().await;
        let Some(mut session) = state.sessions.get(session_id).cloned() else {
            return Ok(None);
        };

        let mut players: Vec<SessionPlayer> = state
            .players
            .get(session_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default();
        players.sort_by(|a, b| b.score.cmp(&a.score));
        session.players = players;
        session.answers = state.answers.get(session_id).cloned().unwrap_or_default();
        Ok(Some(session))
    }

    async fn find_quiz_session_by_quiz_id(
        &self,
        quiz_id: &str,
    ) -> Result<Option<Session>, StoreError> {
        let session_id = {
            let state = self.state.lock().await;
            state.quiz_index.get(quiz_id).cloned()
        };
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
        let mut state = self.state.lock().await;
        state
            .players
            .entry(session_id.to_owned())
            .or_default()
            .insert(player.id.clone(), player.clone());
        state
            .leaderboards
            .entry(session_id.to_owned())
            .or_default()
            .insert(player.id, 0);
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
        let mut state = self.state.lock().await;

        *state
            .leaderboards
            .entry(session_id.to_owned())
            .or_default()
            .entry(player_id.to_owned())
            .or_insert(0) += score;

        let record = state
            .players
            .get_mut(session_id)
            .and_then(|records| records.get_mut(player_id))
            .ok_or_else(|| {
                StoreError::MissingRecord(format!("player {player_id} in session {session_id}"))
            })?;
        record.score += score;

        state
            .answers
            .entry(session_id.to_owned())
            .or_default()
            .insert(answer_key, answer);
        Ok(())
    }

    async fn find_leaderboard_quiz_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<SessionPlayer>, StoreError> {
        let state = self.state.lock().await;

        let mut ranked: Vec<(String, i64)> = state
            .leaderboards
            .get(session_id)
            .map(|scores| {
                scores
                    .iter()
                    .map(|(player_id, score)| (player_id.clone(), *score))
                    .collect()
            })
            .unwrap_or_default();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let records = state.players.get(session_id);
        let mut players = Vec::with_capacity(ranked.len());
        for (player_id, _score) in ranked {
            let record = records.and_then(|r| r.get(&player_id)).ok_or_else(|| {
                StoreError::MissingRecord(format!("player {player_id} in session {session_id}"))
            })?;
            players.push(record.clone());
        }
        Ok(players)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Quiz, QuizStatus};
    use chrono::Utc;

    fn quiz(id: &str) -> Quiz {
        Quiz {
            id: id.to_owned(),
            title: "Basic Animals".to_owned(),
            status: QuizStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn player(id: &str, quiz_id: &str) -> SessionPlayer {
        SessionPlayer {
            id: id.to_owned(),
            username: format!("user-{id}"),
            quiz_id: quiz_id.to_owned(),
            score: 0,
        }
    }

    fn answer() -> Answer {
        Answer {
            player_choice: "A monotreme".to_owned(),
            correct_answer: "A monotreme".to_owned(),
        }
    }

    async fn seeded_session(store: &InMemorySessionStore) -> Session {
        let mut session = Session::new(quiz("quiz1"), Vec::new());
        store.create_quiz_session(&mut session).await.unwrap();
        session
    }

    #[tokio::test]
    async fn create_assigns_an_id_and_indexes_the_quiz() {
        let store = InMemorySessionStore::new();
        let session = seeded_session(&store).await;
        assert!(!session.id.is_empty());

        let found = store
            .find_quiz_session_by_quiz_id("quiz1")
            .await
            .unwrap()
            .expect("indexed session");
        assert_eq!(found.id, session.id);
        assert!(
            store
                .find_quiz_session_by_quiz_id("quiz2")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn added_player_starts_with_a_zero_leaderboard_entry() {
        let store = InMemorySessionStore::new();
        let session = seeded_session(&store).await;
        store
            .add_player_to_quiz_session(&session.id, player("p1", "quiz1"))
            .await
            .unwrap();

        let leaderboard = store
            .find_leaderboard_quiz_session(&session.id)
            .await
            .unwrap();
        assert_eq!(leaderboard.len(), 1);
        assert_eq!(leaderboard[0].id, "p1");
        assert_eq!(leaderboard[0].score, 0);
    }

    #[tokio::test]
    async fn sequential_updates_keep_ranking_and_record_in_step() {
        let store = InMemorySessionStore::new();
        let session = seeded_session(&store).await;
        store
            .add_player_to_quiz_session(&session.id, player("p1", "quiz1"))
            .await
            .unwrap();

        for (key, delta) in [("q1:p1", 55), ("q2:p1", 30)] {
            store
                .update_quiz_player_score_session(
                    &session.id,
                    "p1",
                    delta,
                    key.to_owned(),
                    answer(),
                )
                .await
                .unwrap();
        }

        let leaderboard = store
            .find_leaderboard_quiz_session(&session.id)
            .await
            .unwrap();
        assert_eq!(leaderboard[0].score, 85, "ranked score");

        let found = store
            .find_quiz_player_session(&session.id, "p1")
            .await
            .unwrap()
            .expect("player session");
        assert_eq!(found.players[0].score, 85, "denormalized record");
        assert!(found.answers.contains_key("q1:p1"));
        assert!(found.answers.contains_key("q2:p1"));
    }

    #[tokio::test]
    async fn leaderboard_is_ordered_by_descending_score() {
        let store = InMemorySessionStore::new();
        let session = seeded_session(&store).await;
        for id in ["p1", "p2", "p3"] {
            store
                .add_player_to_quiz_session(&session.id, player(id, "quiz1"))
                .await
                .unwrap();
        }
        for (id, delta) in [("p1", 10), ("p2", 100), ("p3", 55)] {
            store
                .update_quiz_player_score_session(
                    &session.id,
                    id,
                    delta,
                    format!("q1:{id}"),
                    answer(),
                )
                .await
                .unwrap();
        }

        let leaderboard = store
            .find_leaderboard_quiz_session(&session.id)
            .await
            .unwrap();
        let order: Vec<&str> = leaderboard.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, ["p2", "p3", "p1"]);
    }

    #[tokio::test]
    async fn player_miss_and_session_miss_are_both_none() {
        let store = InMemorySessionStore::new();
        let session = seeded_session(&store).await;

        // Session exists, player does not: empty result, not an error.
        assert!(
            store
                .find_quiz_player_session(&session.id, "ghost")
                .await
                .unwrap()
                .is_none()
        );
        // Session itself absent.
        assert!(
            store
                .find_quiz_player_session("missing", "ghost")
                .await
                .unwrap()
                .is_none()
        );
    }
}
