use backend::{app, AppState};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let persist_path = env::var("PERSIST_PATH").unwrap_or_else(|_| "players.json".to_string());
    let state = AppState::with_persistence(persist_path).await;

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    info!(port, players = state.player_count().await, "starting server");

    let app = app(state);
    axum::serve(
        tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .expect("bind"),
        app,
    )
    .await
    .expect("server error");
}
