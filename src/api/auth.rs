//! Session check applied to every `/api` route.
//!
//! The browser carries an opaque token in the `session_token` cookie; the
//! token is looked up in `USER_SESSIONS`. Expired sessions are removed on
//! sight. A valid session attaches a [`CurrentUser`] to the request.

use super::AppState;
use crate::db::{Database, QueryBuilder, StoreError};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

pub const SESSION_COOKIE: &str = "session_token";
pub const SESSIONS_TABLE: &str = "USER_SESSIONS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub user_id: i64,
    pub username: String,
}

#[derive(Serialize)]
struct Unauthorized {
    success: bool,
    authenticated: bool,
    message: &'static str,
}

fn unauthorized(message: &'static str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(Unauthorized {
            success: false,
            authenticated: false,
            message,
        }),
    )
        .into_response()
}

#[derive(Deserialize)]
struct SessionRow {
    #[serde(rename = "USER_ID")]
    user_id: i64,
    #[serde(rename = "USERNAME")]
    username: String,
    #[serde(rename = "EXPIRED")]
    expired: bool,
}

/// Resolves a session token to its user. Returns `None` for unknown or
/// expired tokens; an expired session is deleted.
pub async fn verify_session(db: &Database, token: String) -> Result<Option<CurrentUser>, StoreError> {
    let table = db.table(SESSIONS_TABLE);

    let mut qb = QueryBuilder::new(format!(
        "SELECT \"USER_ID\", \"USERNAME\", \"EXPIRES_AT\" <= now() AS \"EXPIRED\" \
         FROM {table} WHERE \"SESSION_ID\" = "
    ));
    qb.push_bind(token.as_str());
    let Some(row) = db.query_one(qb.finish()).await? else {
        return Ok(None);
    };

    let session: SessionRow = serde_json::from_value(Value::Object(row))
        .map_err(|err| StoreError::Decode(err.to_string()))?;

    if session.expired {
        let mut qb = QueryBuilder::new(format!("DELETE FROM {table} WHERE \"SESSION_ID\" = "));
        qb.push_bind(token);
        db.execute(qb.finish()).await?;
        return Ok(None);
    }

    Ok(Some(CurrentUser {
        user_id: session.user_id,
        username: session.username,
    }))
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let token = match jar.get(SESSION_COOKIE) {
        Some(cookie) if !cookie.value().is_empty() => cookie.value().to_string(),
        _ => {
            debug!("no session token");
            return unauthorized("Authentication required");
        }
    };

    match verify_session(&state.db, token).await {
        Ok(Some(user)) => {
            debug!(username = %user.username, "authenticated");
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(None) => unauthorized("Invalid or expired session"),
        Err(err) => {
            error!(error = %err, "session lookup failed");
            unauthorized("Invalid or expired session")
        }
    }
}
