//! Live multiplayer timed-quiz server library.
//!
//! Players join a quiz over HTTP, connect over a hand-rolled WebSocket
//! implementation, answer questions, and watch the leaderboard update in real
//! time. The crate is split into a protocol layer ([`ws`]), an in-process
//! broadcast layer ([`hub`]), a distributed session/leaderboard store
//! ([`store`]) and the quiz business logic ([`quiz`]).

pub mod common;
pub mod domain;
pub mod hub;
pub mod quiz;
pub mod server;
pub mod store;
pub mod ws;
