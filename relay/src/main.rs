mod heartbeat;
mod hub;
mod registry;
mod routes;
mod state;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let config = state::RelayConfig::from_env();
    let state = state::AppState::new(config);

    // Spawn the background liveness monitor.
    let _heartbeat = heartbeat::spawn_heartbeat_task(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, partition_by_board = config.partition_by_board, "relay listening");
    axum::serve(listener, app).await.expect("server failed");
}
