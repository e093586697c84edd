//! HTTP client for the REST surface, used by the `client` subcommand.
//!
//! Every call carries the caller's session token as the `session_token`
//! cookie; the server rejects requests without one.

pub mod proposals;

pub use proposals::*;

use crate::api::{Envelope, HealthResponse, API_PREFIX, SESSION_COOKIE};
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Server error ({status}): {message}")]
    ServerError { status: StatusCode, message: String },

    #[error("Response carried no data")]
    MissingData,
}

#[derive(serde::Deserialize)]
struct AuthFailure {
    message: String,
}

pub(crate) fn api_url(base_url: &str, path: &str) -> String {
    format!("{}{API_PREFIX}/{path}", base_url.trim_end_matches('/'))
}

fn authed_get(url: String, session: &str) -> reqwest::RequestBuilder {
    reqwest::Client::new()
        .get(url)
        .header(header::COOKIE, format!("{SESSION_COOKIE}={session}"))
}

/// Sends the request and unwraps the envelope's `data`.
pub(crate) async fn fetch_data<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ClientError> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        let failure = response.json::<AuthFailure>().await?;
        return Err(ClientError::Unauthorized(failure.message));
    }

    let envelope = response.json::<Envelope<T>>().await?;
    if !envelope.success {
        let message = envelope.error.unwrap_or_default();
        return Err(if status == StatusCode::NOT_FOUND {
            ClientError::NotFound(message)
        } else {
            ClientError::ServerError { status, message }
        });
    }
    envelope.data.ok_or(ClientError::MissingData)
}

pub async fn fetch_health(base_url: &str, session: &str) -> Result<HealthResponse, ClientError> {
    let response = authed_get(api_url(base_url, "health"), session)
        .send()
        .await?;

    if response.status() == StatusCode::UNAUTHORIZED {
        let failure = response.json::<AuthFailure>().await?;
        return Err(ClientError::Unauthorized(failure.message));
    }
    Ok(response.error_for_status()?.json::<HealthResponse>().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::get, Json, Router};
    use serde_json::json;

    /// Serves `router` on an ephemeral port and returns its base URL.
    pub(crate) async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_api_url_joins_prefix() {
        assert_eq!(
            api_url("http://localhost:37240/", "proposals/counts"),
            "http://localhost:37240/api/proposals/counts"
        );
    }

    #[tokio::test]
    async fn test_unauthorized_carries_server_message() {
        let router = Router::new().route(
            "/api/health",
            get(|| async {
                (
                    AxumStatus::UNAUTHORIZED,
                    Json(json!({"success": false, "authenticated": false, "message": "Authentication required"})),
                )
            }),
        );
        let base_url = spawn_stub(router).await;

        let err = fetch_health(&base_url, "").await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized(ref m) if m == "Authentication required"));
    }

    #[tokio::test]
    async fn test_health_sends_session_cookie() {
        let router = Router::new().route(
            "/api/health",
            get(|headers: axum::http::HeaderMap| async move {
                let cookie = headers
                    .get(axum::http::header::COOKIE)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(json!({
                    "success": true,
                    "message": cookie,
                    "timestamp": "2025-01-02T03:04:05Z"
                }))
            }),
        );
        let base_url = spawn_stub(router).await;

        let health = fetch_health(&base_url, "tok").await.unwrap();
        assert!(health.success);
        assert_eq!(health.message, "session_token=tok");
    }
}
