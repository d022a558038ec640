use std::env;
use std::sync::Arc;

use resonance_bus::NatsBus;
use resonance_idgen::IdGenerator;
use resonance_presence::RedisPresenceStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_owned());
    let redis_url = env::var("REDIS_URL").expect("REDIS_URL must be set");
    let nats_url = env::var("NATS_URL").expect("NATS_URL must be set");
    let nats_partitions: u32 = env::var("NATS_PARTITIONS")
        .unwrap_or_else(|_| "8".to_owned())
        .parse()
        .expect("NATS_PARTITIONS must be a number");
    let worker_id: u64 = env::var("LOGIC_WORKER_ID")
        .expect("LOGIC_WORKER_ID must be set")
        .parse()
        .expect("LOGIC_WORKER_ID must be a number");

    info!("connecting to database...");
    let pool = logic::db::create_pool(&database_url).await;
    logic::db::run_migrations(&pool).await;
    info!("migrations applied");

    let presence = RedisPresenceStore::connect(&redis_url)
        .await
        .expect("failed to connect to redis");
    let bus = NatsBus::connect(&nats_url, nats_partitions)
        .await
        .expect("failed to connect to nats");
    let idgen = IdGenerator::new(worker_id).expect("invalid LOGIC_WORKER_ID");

    let state = logic::AppState::new(pool, Arc::new(presence), Arc::new(bus), Arc::new(idgen));
    logic::outbox_relay::spawn(state.clone());

    let router = logic::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind");
    info!(addr = %bind_addr, "logic listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
    info!("logic shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
