//! End-to-end tests over real TCP: HTTP join, raw WebSocket handshake, frame
//! traffic and leaderboard fan-out.

use std::{sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tokio_util::codec::Framed;

use quizrush::{
    domain::WsMessage,
    hub::Hub,
    quiz::{InMemoryQuizRepository, JoinQuizResponse, QuizService},
    server::{AppState, router},
    store::InMemorySessionStore,
    ws::{Frame, FrameCodec, OpCode, accept_key},
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// In-process server bound to an ephemeral port.
struct TestServer {
    addr: std::net::SocketAddr,
    http: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let hub = Arc::new(Hub::new());
        tokio::spawn(hub.clone().run());

        let service = QuizService::new(
            Arc::new(InMemoryQuizRepository::new()),
            Arc::new(InMemorySessionStore::new()),
            hub.clone(),
        );
        let state = Arc::new(AppState { service, hub });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.expect("serve");
        });

        Self {
            addr,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn join(&self, quiz_id: &str, username: &str) -> JoinQuizResponse {
        let response = self
            .http
            .post(self.url("/api/quiz/join"))
            .json(&serde_json::json!({"quiz_id": quiz_id, "username": username}))
            .send()
            .await
            .expect("join request");
        assert!(response.status().is_success(), "join failed");
        response.json().await.expect("join response body")
    }

    async fn submit_answer(
        &self,
        joined: &JoinQuizResponse,
        question_id: &str,
        answer: &str,
        answer_time: f64,
    ) -> reqwest::StatusCode {
        self.http
            .post(self.url("/api/quiz/answer"))
            .json(&serde_json::json!({
                "player_id": joined.player_id,
                "session_id": joined.session_id,
                "quiz_id": "quiz1",
                "question_id": question_id,
                "answer": answer,
                "answer_time": answer_time,
            }))
            .send()
            .await
            .expect("answer request")
            .status()
    }

    /// Open a raw TCP connection and perform the WebSocket handshake by hand.
    /// Panics unless the server answers 101 with the right accept key.
    async fn connect_ws(&self, session_id: &str, player_id: &str) -> WsClient {
        let (status, headers, stream) = self.try_connect_ws(session_id, player_id).await;
        assert_eq!(status, 101, "expected protocol switch, headers: {headers}");
        assert!(
            headers.contains(&format!(
                "sec-websocket-accept: {}",
                accept_key("dGhlIHNhbXBsZSBub25jZQ==")
            )),
            "accept key missing or wrong: {headers}"
        );
        WsClient {
            framed: Framed::new(stream, FrameCodec),
        }
    }

    /// Handshake attempt that reports the status line instead of panicking,
    /// for rejection tests.
    async fn try_connect_ws(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> (u16, String, TcpStream) {
        let mut stream = TcpStream::connect(self.addr).await.expect("tcp connect");

        let request = format!(
            "GET /ws?session_id={session_id}&player_id={player_id} HTTP/1.1\r\n\
             Host: {}\r\n\
             Connection: Upgrade\r\n\
             Upgrade: websocket\r\n\
             Sec-WebSocket-Version: 13\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
             \r\n",
            self.addr
        );
        stream
            .write_all(request.as_bytes())
            .await
            .expect("write handshake");

        // Read byte-wise so no frame bytes after the header block are
        // swallowed.
        let mut head = Vec::new();
        while !head.ends_with(b"\r\n\r\n") {
            let mut byte = [0u8; 1];
            let n = stream.read(&mut byte).await.expect("read handshake");
            assert!(n > 0, "connection closed during handshake");
            head.push(byte[0]);
        }

        // hyper writes lowercase header names, so no case folding is needed.
        let head = String::from_utf8_lossy(&head).into_owned();
        let status: u16 = head
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .expect("status code in response line");
        (status, head, stream)
    }
}

/// A connected WebSocket client speaking raw frames.
struct WsClient {
    framed: Framed<TcpStream, FrameCodec>,
}

impl WsClient {
    async fn next_frame(&mut self) -> Frame {
        timeout(RECV_TIMEOUT, self.framed.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("frame decode")
    }

    async fn next_message(&mut self) -> WsMessage {
        let frame = self.next_frame().await;
        assert_eq!(frame.opcode, OpCode::Text);
        serde_json::from_slice(&frame.payload).expect("text frame holds a message envelope")
    }

    /// Read messages until one of the wanted kind arrives.
    async fn wait_for(&mut self, kind: &str) -> WsMessage {
        loop {
            let message = self.next_message().await;
            if message.kind == kind {
                return message;
            }
        }
    }

    async fn send(&mut self, frame: Frame) {
        self.framed.send(frame).await.expect("send frame");
    }
}

#[tokio::test]
async fn join_returns_session_and_questions() {
    let server = TestServer::start().await;

    let joined = server.join("quiz1", "alice").await;
    assert!(!joined.session_id.is_empty());
    assert!(!joined.player_id.is_empty());
    assert_eq!(joined.questions.len(), 3);

    // Second player lands in the same session.
    let second = server.join("quiz1", "bob").await;
    assert_eq!(second.session_id, joined.session_id);
    assert_ne!(second.player_id, joined.player_id);
}

#[tokio::test]
async fn connected_player_is_greeted_then_announced() {
    let server = TestServer::start().await;
    let joined = server.join("quiz1", "alice").await;

    let mut client = server.connect_ws(&joined.session_id, &joined.player_id).await;

    let greeting = client.next_message().await;
    assert_eq!(greeting.kind, "room_joined");
    assert_eq!(greeting.data["session_id"], joined.session_id);
    assert_eq!(greeting.data["player_id"], joined.player_id);

    // The connect broadcast reaches the room, the new player included.
    let announced = client.next_message().await;
    assert_eq!(announced.kind, "player_connected");
    assert_eq!(announced.data["username"], "alice");
}

#[tokio::test]
async fn other_players_see_a_late_joiner_connect() {
    let server = TestServer::start().await;
    let alice = server.join("quiz1", "alice").await;
    let bob = server.join("quiz1", "bob").await;

    let mut alice_ws = server.connect_ws(&alice.session_id, &alice.player_id).await;
    alice_ws.wait_for("room_joined").await;

    let mut bob_ws = server.connect_ws(&bob.session_id, &bob.player_id).await;
    bob_ws.wait_for("room_joined").await;

    let seen = alice_ws.wait_for("player_connected").await;
    // Alice first sees her own announcement, then Bob's.
    let seen = if seen.data["player_id"] == alice.player_id {
        alice_ws.wait_for("player_connected").await
    } else {
        seen
    };
    assert_eq!(seen.data["player_id"], bob.player_id);
    assert_eq!(seen.data["username"], "bob");
}

#[tokio::test]
async fn answers_fan_out_scores_to_every_connection() {
    let server = TestServer::start().await;
    let alice = server.join("quiz1", "alice").await;
    let bob = server.join("quiz1", "bob").await;

    let mut alice_ws = server.connect_ws(&alice.session_id, &alice.player_id).await;
    alice_ws.wait_for("room_joined").await;
    let mut bob_ws = server.connect_ws(&bob.session_id, &bob.player_id).await;
    bob_ws.wait_for("room_joined").await;

    let status = server
        .submit_answer(&alice, "q1_1", "A monotreme", 1.0)
        .await;
    assert_eq!(status, reqwest::StatusCode::NO_CONTENT);

    for ws in [&mut alice_ws, &mut bob_ws] {
        let result = ws.wait_for("answer_submitted").await;
        assert_eq!(result.data["player_id"], alice.player_id);
        assert_eq!(result.data["correct"], true);
        assert_eq!(result.data["score"], 100);

        let update = ws.wait_for("leaderboard_update").await;
        let leaderboard = update.data["leaderboard"]
            .as_array()
            .expect("leaderboard array");
        assert_eq!(leaderboard.len(), 2);
        assert_eq!(leaderboard[0]["id"], alice.player_id);
        assert_eq!(leaderboard[0]["score"], 100);
        assert_eq!(leaderboard[1]["score"], 0);
    }
}

#[tokio::test]
async fn duplicate_answer_conflicts_and_changes_nothing() {
    let server = TestServer::start().await;
    let alice = server.join("quiz1", "alice").await;

    let mut ws = server.connect_ws(&alice.session_id, &alice.player_id).await;
    ws.wait_for("room_joined").await;

    let first = server.submit_answer(&alice, "q1_1", "A monotreme", 1.0).await;
    assert_eq!(first, reqwest::StatusCode::NO_CONTENT);
    ws.wait_for("leaderboard_update").await;

    let second = server.submit_answer(&alice, "q1_1", "A monotreme", 1.0).await;
    assert_eq!(second, reqwest::StatusCode::CONFLICT);
}

#[tokio::test]
async fn pings_are_answered_with_matching_pongs() {
    let server = TestServer::start().await;
    let joined = server.join("quiz1", "alice").await;

    let mut ws = server.connect_ws(&joined.session_id, &joined.player_id).await;
    ws.wait_for("player_connected").await;

    ws.send(Frame::ping("heartbeat")).await;
    loop {
        let frame = ws.next_frame().await;
        if frame.opcode == OpCode::Pong {
            assert_eq!(frame.payload.as_ref(), b"heartbeat");
            break;
        }
    }
}

#[tokio::test]
async fn unknown_player_is_rejected_before_the_upgrade() {
    let server = TestServer::start().await;
    let joined = server.join("quiz1", "alice").await;

    let (status, _headers, _stream) = server
        .try_connect_ws(&joined.session_id, "not-a-player")
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn missing_websocket_key_is_a_bad_request() {
    let server = TestServer::start().await;
    let joined = server.join("quiz1", "alice").await;

    let response = server
        .http
        .get(server.url(&format!(
            "/ws?session_id={}&player_id={}",
            joined.session_id, joined.player_id
        )))
        .send()
        .await
        .expect("plain http request");
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}
