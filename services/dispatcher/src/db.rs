use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connects to the same Postgres instance Logic migrates, but never runs
/// migrations itself -- only `logic::db::run_migrations` does.
pub async fn create_pool(database_url: &str) -> PgPool {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .expect("failed to connect to Postgres")
}
