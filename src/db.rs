use anyhow::{Context, Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
// rand_core 0.6 is what password-hash/argon2 depends on; must match that version.
use rand_core::OsRng;
use serde_json::Value;
use sqlx::{Row, SqlitePool, sqlite::SqliteConnectOptions};
use std::{path::Path, str::FromStr};

use crate::tools::config::ToolsConfig;

#[derive(Debug, Clone)]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy)]
pub struct StoredSession {
    pub admin_id: i64,
    /// Unix seconds.
    pub expires_at: i64,
}

/// Branding metadata for the hosted site. One row, last write wins.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SiteConfig {
    pub title: String,
    pub title_description: String,
    pub description: String,
    pub logo_url: String,
    pub canonical_url: String,
    pub og_title: String,
    pub og_description: String,
    pub og_image_url: String,
    pub og_url: String,
    pub twitter_title: String,
    pub twitter_description: String,
    pub twitter_image_url: String,
}

/// Columns added to `site_config` after the first release. Older databases
/// get them via `ALTER TABLE` on startup.
const SITE_CONFIG_LATE_COLUMNS: &[&str] = &[
    "title_description",
    "canonical_url",
    "og_title",
    "og_description",
    "og_image_url",
    "og_url",
    "twitter_title",
    "twitter_description",
    "twitter_image_url",
];

pub async fn init_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Cannot create data directory {}", dir.display()))?;
    }

    let url = format!("sqlite:{}", db_path.display());
    let opts = SqliteConnectOptions::from_str(&url)
        .context("Invalid DB path")?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(opts)
        .await
        .context("Failed to open SQLite database")?;

    init_schema(&pool).await?;
    upgrade_site_config(&pool).await?;
    prune_expired_sessions(&pool).await?;
    seed_site_config(&pool).await?;

    Ok(pool)
}

async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS admins (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            username      TEXT    NOT NULL UNIQUE,
            password_hash TEXT    NOT NULL,
            created_at    TEXT    NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create admins table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS sessions (
            token      TEXT    PRIMARY KEY,
            admin_id   INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create sessions table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tools_config (
            id          INTEGER PRIMARY KEY CHECK (id = 1),
            config_json TEXT,
            updated_at  TEXT
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create tools_config table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS site_config (
            id          INTEGER PRIMARY KEY CHECK (id = 1),
            title       TEXT,
            description TEXT,
            logo_url    TEXT,
            updated_at  TEXT
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create site_config table")?;

    Ok(())
}

async fn upgrade_site_config(pool: &SqlitePool) -> Result<()> {
    let existing: Vec<String> = sqlx::query("PRAGMA table_info(site_config)")
        .fetch_all(pool)
        .await
        .context("Failed to inspect site_config")?
        .into_iter()
        .map(|r| r.get::<String, _>("name"))
        .collect();

    for column in SITE_CONFIG_LATE_COLUMNS {
        if existing.iter().any(|c| c == column) {
            continue;
        }
        // Column names come from the constant list above, never from input.
        sqlx::query(&format!("ALTER TABLE site_config ADD COLUMN {column} TEXT"))
            .execute(pool)
            .await
            .with_context(|| format!("Failed to add site_config.{column}"))?;
        tracing::debug!("Added site_config.{}", column);
    }

    Ok(())
}

async fn prune_expired_sessions(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(chrono::Utc::now().timestamp())
        .execute(pool)
        .await
        .context("Failed to prune expired sessions")?;
    Ok(())
}

async fn seed_site_config(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "INSERT OR IGNORE INTO site_config (
            id, title, title_description, description, logo_url, canonical_url,
            og_title, og_description, og_image_url, og_url,
            twitter_title, twitter_description, twitter_image_url, updated_at
         ) VALUES (1, '', '', '', '', '', '', '', '', '', '', '', '', ?)",
    )
    .bind(now_rfc3339())
    .execute(pool)
    .await
    .context("Failed to seed site_config")?;
    Ok(())
}

/// Create the first admin if the table is empty. Returns `true` if an admin
/// was created.
pub async fn seed_admin(pool: &SqlitePool, username: &str, password: &str) -> Result<bool> {
    let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM admins")
        .fetch_one(pool)
        .await?
        .get("n");
    if count > 0 {
        return Ok(false);
    }

    add_admin(pool, username, password).await?;
    Ok(true)
}

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ── Admins ────────────────────────────────────────────────────────────────────

/// Hash a password with argon2id and return the PHC string.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// Check `password` against a stored PHC string. Malformed hashes never match.
pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Add an admin. Returns an error if the username already exists.
pub async fn add_admin(pool: &SqlitePool, username: &str, password: &str) -> Result<i64> {
    let hash = hash_password(password)?;
    let id = sqlx::query("INSERT INTO admins (username, password_hash) VALUES (?, ?)")
        .bind(username)
        .bind(&hash)
        .execute(pool)
        .await
        .context("Failed to insert admin — username may already exist")?
        .last_insert_rowid();
    Ok(id)
}

fn admin_from_row(row: sqlx::sqlite::SqliteRow) -> Admin {
    Admin {
        id: row.get("id"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
    }
}

pub async fn find_admin_by_username(pool: &SqlitePool, username: &str) -> Result<Option<Admin>> {
    let row = sqlx::query("SELECT id, username, password_hash FROM admins WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(admin_from_row))
}

pub async fn find_admin_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Admin>> {
    let row = sqlx::query("SELECT id, username, password_hash FROM admins WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(admin_from_row))
}

pub async fn set_admin_password(pool: &SqlitePool, id: i64, password: &str) -> Result<()> {
    let hash = hash_password(password)?;
    sqlx::query("UPDATE admins SET password_hash = ? WHERE id = ?")
        .bind(&hash)
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to update admin password")?;
    Ok(())
}

// ── Sessions ──────────────────────────────────────────────────────────────────

pub async fn insert_session(
    pool: &SqlitePool,
    token: &str,
    admin_id: i64,
    expires_at: i64,
) -> Result<()> {
    sqlx::query("INSERT INTO sessions (token, admin_id, expires_at) VALUES (?, ?, ?)")
        .bind(token)
        .bind(admin_id)
        .bind(expires_at)
        .execute(pool)
        .await
        .context("Failed to insert session")?;
    Ok(())
}

pub async fn find_session(pool: &SqlitePool, token: &str) -> Result<Option<StoredSession>> {
    let row = sqlx::query("SELECT admin_id, expires_at FROM sessions WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| StoredSession {
        admin_id: r.get("admin_id"),
        expires_at: r.get("expires_at"),
    }))
}

pub async fn delete_session(pool: &SqlitePool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await
        .context("Failed to delete session")?;
    Ok(())
}

// ── Tools config ──────────────────────────────────────────────────────────────

async fn get_tools_config_text(pool: &SqlitePool) -> Result<Option<String>> {
    let row = sqlx::query("SELECT config_json FROM tools_config WHERE id = 1")
        .fetch_optional(pool)
        .await
        .context("Failed to load tools config")?;
    Ok(row.and_then(|r| r.get::<Option<String>, _>("config_json")))
}

/// The stored config blob exactly as it was written. A blob that is not JSON
/// reads as absent.
pub async fn get_tools_config_raw(pool: &SqlitePool) -> Result<Option<Value>> {
    let Some(json) = get_tools_config_text(pool).await? else {
        return Ok(None);
    };
    match serde_json::from_str::<Value>(&json) {
        Ok(value) => Ok((!value.is_null()).then_some(value)),
        Err(e) => {
            tracing::warn!("Stored tools config is not JSON: {}", e);
            Ok(None)
        }
    }
}

/// The stored config parsed into its typed form, not yet normalized.
pub async fn get_tools_config(pool: &SqlitePool) -> Result<Option<ToolsConfig>> {
    let Some(json) = get_tools_config_text(pool).await? else {
        return Ok(None);
    };
    let config: Option<ToolsConfig> =
        serde_json::from_str(&json).context("Stored tools config is malformed")?;
    Ok(config)
}

/// Replace the stored config wholesale. `updatedAt` is stamped into the blob.
pub async fn put_tools_config(pool: &SqlitePool, config: &Value) -> Result<()> {
    let now = now_rfc3339();
    let mut stamped = config.clone();
    if let Some(obj) = stamped.as_object_mut() {
        obj.insert("updatedAt".to_string(), Value::String(now.clone()));
    }

    sqlx::query(
        "INSERT INTO tools_config (id, config_json, updated_at) VALUES (1, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            config_json = excluded.config_json,
            updated_at  = excluded.updated_at",
    )
    .bind(stamped.to_string())
    .bind(&now)
    .execute(pool)
    .await
    .context("Failed to write tools config")?;
    Ok(())
}

// ── Site config ───────────────────────────────────────────────────────────────

pub async fn get_site_config(pool: &SqlitePool) -> Result<SiteConfig> {
    let row = sqlx::query(
        "SELECT title, title_description, description, logo_url, canonical_url,
                og_title, og_description, og_image_url, og_url,
                twitter_title, twitter_description, twitter_image_url
         FROM site_config WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    let Some(r) = row else {
        return Ok(SiteConfig::default());
    };
    let text = |col: &str| r.get::<Option<String>, _>(col).unwrap_or_default();

    Ok(SiteConfig {
        title: text("title"),
        title_description: text("title_description"),
        description: text("description"),
        logo_url: text("logo_url"),
        canonical_url: text("canonical_url"),
        og_title: text("og_title"),
        og_description: text("og_description"),
        og_image_url: text("og_image_url"),
        og_url: text("og_url"),
        twitter_title: text("twitter_title"),
        twitter_description: text("twitter_description"),
        twitter_image_url: text("twitter_image_url"),
    })
}

pub async fn put_site_config(pool: &SqlitePool, config: &SiteConfig) -> Result<()> {
    sqlx::query(
        "INSERT INTO site_config (
            id, title, title_description, description, logo_url, canonical_url,
            og_title, og_description, og_image_url, og_url,
            twitter_title, twitter_description, twitter_image_url, updated_at
         ) VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            title               = excluded.title,
            title_description   = excluded.title_description,
            description         = excluded.description,
            logo_url            = excluded.logo_url,
            canonical_url       = excluded.canonical_url,
            og_title            = excluded.og_title,
            og_description      = excluded.og_description,
            og_image_url        = excluded.og_image_url,
            og_url              = excluded.og_url,
            twitter_title       = excluded.twitter_title,
            twitter_description = excluded.twitter_description,
            twitter_image_url   = excluded.twitter_image_url,
            updated_at          = excluded.updated_at",
    )
    .bind(&config.title)
    .bind(&config.title_description)
    .bind(&config.description)
    .bind(&config.logo_url)
    .bind(&config.canonical_url)
    .bind(&config.og_title)
    .bind(&config.og_description)
    .bind(&config.og_image_url)
    .bind(&config.og_url)
    .bind(&config.twitter_title)
    .bind(&config.twitter_description)
    .bind(&config.twitter_image_url)
    .bind(now_rfc3339())
    .execute(pool)
    .await
    .context("Failed to write site config")?;
    Ok(())
}

pub async fn set_logo_url(pool: &SqlitePool, logo_url: &str) -> Result<()> {
    sqlx::query("UPDATE site_config SET logo_url = ?, updated_at = ? WHERE id = 1")
        .bind(logo_url)
        .bind(now_rfc3339())
        .execute(pool)
        .await
        .context("Failed to update logo URL")?;
    Ok(())
}
