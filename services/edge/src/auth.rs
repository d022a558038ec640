use sha2::{Digest, Sha256};
use sqlx::PgPool;

pub async fn validate_token(pool: &PgPool, raw_token: &str) -> Option<String> {
    let hash = Sha256::digest(raw_token.as_bytes());
    let hash_bytes = hash.as_slice().to_vec();
    let row = sqlx::query!(
        r#"SELECT username FROM user_tokens WHERE token_hash = $1 AND revoked_at IS NULL"#,
        hash_bytes.as_slice()
    )
    .fetch_optional(pool)
    .await
    .ok()??;
    Some(row.username)
}

pub fn extract_bearer(authorization: &str) -> Option<&str> {
    authorization.strip_prefix("Bearer ")
}
