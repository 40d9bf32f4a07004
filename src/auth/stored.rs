//! Opaque random tokens tracked in the `sessions` table with an explicit
//! expiry. Expired rows are deleted when they are presented.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::db;

pub async fn issue(pool: &SqlitePool, admin_id: i64, ttl: chrono::Duration) -> Result<String> {
    let token = new_session_token();
    let expires_at = (chrono::Utc::now() + ttl).timestamp();
    db::insert_session(pool, &token, admin_id, expires_at).await?;
    Ok(token)
}

pub async fn verify(pool: &SqlitePool, token: &str) -> Result<Option<i64>> {
    let Some(session) = db::find_session(pool, token).await? else {
        return Ok(None);
    };

    if session.expires_at < chrono::Utc::now().timestamp() {
        db::delete_session(pool, token).await?;
        return Ok(None);
    }

    Ok(Some(session.admin_id))
}

fn new_session_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
