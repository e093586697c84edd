use super::events::create_event;
use super::organizations::create_organization;
use super::proposals::{
    archive_and_copy_to_proposal, create_proposal, form_config, get_proposal, update_proposal,
};
use super::*;
use crate::config::PoolSettings;
use crate::db::{ConnectionSource, Database, PooledConnector, Row};
use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use lazy_static::lazy_static;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

lazy_static! {
    // Backed by a pool that is already shut down, so every statement fails
    // fast without a server.
    static ref TEST_STATE: AppState = {
        let connector = PooledConnector::new(
            "postgres://nobody@127.0.0.1:1/none".to_string(),
            PoolSettings::default(),
            Duration::from_secs(1),
        );
        connector.shutdown();
        AppState::new(Database::with_source(Arc::new(connector), "bd"))
    };
}

pub fn setup_test_state() -> AppState {
    TEST_STATE.clone()
}

fn payload(value: Value) -> ApiJson<Row> {
    ApiJson(value.as_object().cloned().unwrap())
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_cookie_is_rejected() {
    let app = create_router(setup_test_state());

    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"success": false, "authenticated": false, "message": "Authentication required"})
    );
}

#[tokio::test]
async fn test_unverifiable_session_is_rejected() {
    let app = create_router(setup_test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/proposals?category=Pursuits")
                .header(header::COOKIE, format!("{SESSION_COOKIE}=abc123"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid or expired session");
    assert_eq!(body["authenticated"], false);
}

#[tokio::test]
async fn test_organization_requires_full_name() {
    let state = setup_test_state();

    for body in [
        json!({"ORG_ABBREVIATION": "ACME"}),
        json!({"ORG_FULL_NAME": ""}),
        json!({"ORG_FULL_NAME": null}),
    ] {
        let err = create_organization(State(state.clone()), payload(body))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"success": false, "error": "ORG_FULL_NAME is required"})
        );
    }
}

#[tokio::test]
async fn test_event_requires_title_and_dates() {
    let state = setup_test_state();

    for (body, missing) in [
        (json!({"TITLE": "Kickoff"}), "START_DATE"),
        (json!({"TITLE": "Kickoff", "START_DATE": "2025-03-04T15:30:00Z", "END_DATE": ""}), "END_DATE"),
        (json!({"TITLE": null, "START_DATE": "2025-03-04T15:30:00Z"}), "TITLE"),
    ] {
        let err = create_event(State(state.clone()), payload(body)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), format!("{missing} is required"));
    }
}

async fn send_to_proposals(request: Request<Body>) -> Response {
    proposals::create_router()
        .with_state(setup_test_state())
        .oneshot(request)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_malformed_id_uses_envelope() {
    let response = send_to_proposals(
        Request::builder().uri("/proposals/abc").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("abc"));
}

#[tokio::test]
async fn test_malformed_body_uses_envelope() {
    let array_body = Request::builder()
        .method("POST")
        .uri("/proposals")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("[1, 2]"))
        .unwrap();
    let untyped_body = Request::builder()
        .method("PUT")
        .uri("/proposals/4")
        .body(Body::from("{\"TITLE\": \"x\"}"))
        .unwrap();

    for request in [array_body, untyped_body] {
        let response = send_to_proposals(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(!body["error"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_unknown_proposal_column_is_bad_request() {
    let state = setup_test_state();

    let err = create_proposal(
        State(state),
        payload(json!({"TITLE": "Levee", "TITLE = 'x' --": "y"})),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::Schema(_)));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_without_writable_columns_is_bad_request() {
    let state = setup_test_state();

    let err = update_proposal(
        State(state),
        ApiPath(3),
        payload(json!({"PID": 3, "CLIENT_NAME": "City"})),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ApiError::Schema(SchemaError::NothingToWrite)));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_failure_is_internal_error_envelope() {
    let state = setup_test_state();

    let err = get_proposal(State(state.clone()), ApiPath(1)).await.unwrap_err();
    assert!(matches!(err, ApiError::Store(_)));

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("shut down"));
    assert!(body.get("data").is_none());

    let err = archive_and_copy_to_proposal(State(state), ApiPath(1))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_not_found_message_names_entity() {
    let err = ApiError::NotFound("Pursuit");
    assert_eq!(err.to_string(), "Pursuit not found");
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_envelope_omits_absent_fields() {
    let listed = serde_json::to_value(Envelope::counted(vec![1, 2])).unwrap();
    assert_eq!(listed, json!({"success": true, "data": [1, 2], "count": 2}));

    let message = serde_json::to_value(Envelope::message("Event deleted successfully")).unwrap();
    assert_eq!(
        message,
        json!({"success": true, "message": "Event deleted successfully"})
    );
}

#[tokio::test]
async fn test_form_config_shares_proposal_descriptor() {
    let Json(envelope) = form_config().await;
    let value = serde_json::to_value(envelope).unwrap();
    let config = &value["data"];

    assert_eq!(config["entity"]["table"], "PROPOSALS");
    assert_eq!(config["fieldsets"].as_array().unwrap().len(), 3);
    assert_eq!(config["widgets"]["PRIME"], "select-with-add");
    assert_eq!(config["options"]["ARCHIVE"], json!(["Y", "N"]));
    assert_eq!(config["defaults"]["Fee Proposal"]["ARCHIVE"], "N");
    assert!(config["clearable"]
        .as_array()
        .unwrap()
        .contains(&json!("SELECTION_CHANCE")));
}
