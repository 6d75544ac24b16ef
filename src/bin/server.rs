//! Live multiplayer quiz server.
//!
//! Players join over HTTP, connect over WebSocket, and race to answer
//! vocabulary questions while the leaderboard updates in real time.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin quizrush-server
//! cargo run --bin quizrush-server -- --host 0.0.0.0 --port 3000 --in-memory
//! ```

use std::sync::Arc;

use clap::Parser;
use quizrush::{
    common::logger::setup_logger,
    hub::Hub,
    quiz::{InMemoryQuizRepository, QuizService},
    server::{AppState, run_server},
    store::{InMemorySessionStore, RedisSessionStore, SessionStore},
};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Live multiplayer quiz server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Redis connection URL
    #[arg(long, env = "REDIS_URL", default_value = "redis://localhost:6379/0")]
    redis_url: String,

    /// Keep sessions in process memory instead of Redis
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let store: Arc<dyn SessionStore> = if args.in_memory {
        tracing::info!("using in-memory session store");
        Arc::new(InMemorySessionStore::new())
    } else {
        match RedisSessionStore::connect(&args.redis_url).await {
            Ok(store) => {
                tracing::info!("connected to redis at {}", args.redis_url);
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!("failed to connect to redis: {}", e);
                std::process::exit(1);
            }
        }
    };

    let hub = Arc::new(Hub::new());
    tokio::spawn(hub.clone().run());

    let service = QuizService::new(Arc::new(InMemoryQuizRepository::new()), store, hub.clone());
    let state = Arc::new(AppState { service, hub });

    if let Err(e) = run_server(args.host, args.port, state).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
