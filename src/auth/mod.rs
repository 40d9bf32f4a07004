mod signed;
mod stored;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{db::Admin, error::ApiError, state::AppState};

pub use signed::SignedTokens;

/// How bearer tokens are issued and checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SessionMode {
    /// Random tokens stored in SQLite with an expiry; revocable server-side.
    Stored,
    /// Stateless signed JWTs; valid until their embedded expiry.
    Signed,
}

#[derive(Clone)]
pub enum Sessions {
    Stored { ttl: chrono::Duration },
    Signed(SignedTokens),
}

impl Sessions {
    pub fn new(mode: SessionMode, secret: &str, ttl: chrono::Duration) -> Self {
        match mode {
            SessionMode::Stored => Sessions::Stored { ttl },
            SessionMode::Signed => Sessions::Signed(SignedTokens::new(secret, ttl)),
        }
    }

    pub async fn issue(&self, state: &AppState, admin: &Admin) -> anyhow::Result<String> {
        match self {
            Sessions::Stored { ttl } => stored::issue(&state.db, admin.id, *ttl).await,
            Sessions::Signed(tokens) => tokens.issue(admin.id, &admin.username),
        }
    }

    /// Admin id for a live token, `None` for anything else.
    pub async fn verify(&self, state: &AppState, token: &str) -> anyhow::Result<Option<i64>> {
        match self {
            Sessions::Stored { .. } => stored::verify(&state.db, token).await,
            Sessions::Signed(tokens) => Ok(tokens.verify(token)),
        }
    }
}

/// The admin a request was authenticated as. Inserted by [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct AuthedAdmin {
    pub id: i64,
}

pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let Some(token) = bearer_token(req.headers()) else {
        return ApiError::Unauthorized.into_response();
    };

    match state.sessions.verify(&state, &token).await {
        Ok(Some(id)) => {
            req.extensions_mut().insert(AuthedAdmin { id });
            next.run(req).await
        }
        Ok(None) => ApiError::Unauthorized.into_response(),
        Err(e) => ApiError::Internal(e).into_response(),
    }
}

/// Token from `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively; an empty token counts as missing.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
