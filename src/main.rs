mod api;
mod auth;
mod db;
mod error;
mod frontend;
mod state;
mod tools;

use anyhow::Context;
use auth::{SessionMode, Sessions};
use axum::{Router, http::StatusCode, routing::get};
use clap::Parser;
use state::AppState;
use std::path::PathBuf;
use tools::store::ToolsConfigStore;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
const DEFAULT_JWT_SECRET: &str = "change-me";

#[derive(Parser, Debug)]
#[command(name = "it-tools-admin", about = "Serve the IT tools site and its admin API")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "3001")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Directory holding the SQLite database (`admin.sqlite`).
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Built frontend directory served at `/`.
    #[arg(long, env = "DIST_DIR", default_value = "dist")]
    dist_dir: PathBuf,

    /// Where uploaded logos are written and served from (`/uploads`).
    /// Defaults to `uploads` inside the frontend directory.
    #[arg(long, env = "UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Username of the admin created on first run.
    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    admin_username: String,

    /// Password of the admin created on first run. Change it in production.
    #[arg(long, env = "ADMIN_PASSWORD", default_value = DEFAULT_ADMIN_PASSWORD, hide_env_values = true)]
    admin_password: String,

    /// How admin tokens are issued: `stored` (revocable, kept in SQLite) or
    /// `signed` (stateless JWT).
    #[arg(long, env = "ADMIN_SESSION_MODE", value_enum, default_value = "stored")]
    session_mode: SessionMode,

    /// Secret for signing tokens in `signed` mode.
    #[arg(long, env = "ADMIN_JWT_SECRET", default_value = DEFAULT_JWT_SECRET, hide_env_values = true)]
    jwt_secret: String,

    /// Token lifetime in hours (1 to 87600).
    #[arg(
        long,
        env = "ADMIN_TOKEN_TTL_HOURS",
        default_value = "12",
        value_parser = clap::value_parser!(i64).range(1..=87600)
    )]
    session_ttl_hours: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "it_tools_admin=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present (silently ignored if absent).
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let pool = db::init_pool(&args.data_dir.join("admin.sqlite")).await?;
    if db::seed_admin(&pool, &args.admin_username, &args.admin_password).await? {
        tracing::info!("Created default admin user: {}", args.admin_username);
    }
    if args.admin_password == DEFAULT_ADMIN_PASSWORD {
        tracing::warn!("ADMIN_PASSWORD is the default. Set it before deploying to production.");
    }
    if args.session_mode == SessionMode::Signed && args.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("ADMIN_JWT_SECRET is not set. Please set it before deploying to production.");
    }

    tracing::info!("dist root: {}", args.dist_dir.display());
    if !args.dist_dir.exists() {
        tracing::warn!("dist root does not exist yet: {}", args.dist_dir.display());
    }

    let upload_dir = args
        .upload_dir
        .unwrap_or_else(|| args.dist_dir.join("uploads"));
    tokio::fs::create_dir_all(&upload_dir)
        .await
        .with_context(|| format!("Cannot create upload directory {}", upload_dir.display()))?;

    // Resolve symlinks for security comparisons at request time.
    // Falls back to the lexical path if the directory doesn't exist yet.
    let dist_root = tokio::fs::canonicalize(&args.dist_dir)
        .await
        .unwrap_or_else(|_| args.dist_dir.clone());
    let upload_root = tokio::fs::canonicalize(&upload_dir)
        .await
        .context("Cannot resolve upload directory")?;

    let sessions = Sessions::new(
        args.session_mode,
        &args.jwt_secret,
        chrono::Duration::hours(args.session_ttl_hours),
    );
    tracing::info!("Admin sessions: {:?}", args.session_mode);

    let state = AppState {
        tools: ToolsConfigStore::from_db(pool.clone()),
        db: pool,
        sessions,
        dist_root,
        upload_root,
    };

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;

    tracing::info!("Admin server listening on http://{addr}");
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

/// The full application: health check, admin API, and the frontend fallback.
fn app(state: AppState) -> Router {
    // CatchPanicLayer is outermost so it recovers from panics anywhere in the stack.
    Router::new()
        .route("/healthz", get(|| async { StatusCode::OK }))
        .merge(api::router(state.clone()))
        .fallback(frontend::handle)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result { tracing::error!("ctrl-c error: {}", e); }
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
    tracing::info!("Shutting down gracefully");
}
