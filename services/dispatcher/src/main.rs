use std::env;
use std::sync::Arc;

use dispatcher::edge_client::{parse_edge_endpoints, EdgeClient};
use resonance_bus::NatsBus;
use resonance_presence::RedisPresenceStore;
use resonance_wire::push_subject_for_partition;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let redis_url = env::var("REDIS_URL").expect("REDIS_URL must be set");
    let nats_url = env::var("NATS_URL").expect("NATS_URL must be set");
    let nats_partitions: u32 = env::var("NATS_PARTITIONS")
        .unwrap_or_else(|_| "8".to_owned())
        .parse()
        .expect("NATS_PARTITIONS must be a number");
    let edge_endpoints = parse_edge_endpoints(&env::var("EDGE_ENDPOINTS").unwrap_or_default());

    info!("connecting to database...");
    let pool = dispatcher::db::create_pool(&database_url).await;

    let presence = RedisPresenceStore::connect(&redis_url)
        .await
        .expect("failed to connect to redis");
    let bus = NatsBus::connect(&nats_url, nats_partitions)
        .await
        .expect("failed to connect to nats");
    let edges = EdgeClient::new(edge_endpoints);

    let state = dispatcher::AppState::new(pool, Arc::new(presence), edges);

    // One subscription, hence one consumer task, per partition, so each
    // session's events stay confined to a single consumer for ordering.
    let mut tasks = Vec::new();
    for partition in 0..nats_partitions {
        let subject = push_subject_for_partition(partition);
        let subscription = bus
            .subscribe(&subject)
            .await
            .unwrap_or_else(|err| panic!("failed to subscribe to {subject}: {err}"));
        let state = state.clone();
        tasks.push(tokio::spawn(
            async move { dispatcher::consumer::run(subscription, state).await },
        ));
        info!(%subject, "subscribed");
    }

    tokio::select! {
        _ = shutdown_signal() => { info!("received shutdown signal"); }
    }
    for task in tasks {
        task.abort();
    }
}

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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
