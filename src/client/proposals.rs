use super::{api_url, authed_get, fetch_data, ClientError};
use crate::dashboard::ProposalCounts;
use crate::db::Row;

pub async fn fetch_proposals(
    base_url: &str,
    session: &str,
    filters: &[(String, String)],
) -> Result<Vec<Row>, ClientError> {
    let request = authed_get(api_url(base_url, "proposals"), session).query(filters);
    fetch_data(request).await
}

pub async fn fetch_proposal(base_url: &str, session: &str, id: i64) -> Result<Row, ClientError> {
    let request = authed_get(api_url(base_url, &format!("proposals/{id}")), session);
    fetch_data(request).await
}

pub async fn fetch_counts(base_url: &str, session: &str) -> Result<ProposalCounts, ClientError> {
    let request = authed_get(api_url(base_url, "proposals/counts"), session);
    fetch_data(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::spawn_stub;
    use axum::{
        extract::{Path, RawQuery},
        http::StatusCode,
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    fn stub_router() -> Router {
        Router::new()
            .route(
                "/api/proposals",
                get(|RawQuery(query): RawQuery| async move {
                    let title = query.unwrap_or_default();
                    Json(json!({"success": true, "data": [{"PID": 1, "TITLE": title}], "count": 1}))
                }),
            )
            .route(
                "/api/proposals/counts",
                get(|| async { Json(json!({"success": true, "data": {"futurePursuits": 4}})) }),
            )
            .route(
                "/api/proposals/:id",
                get(|Path(id): Path<i64>| async move {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({"success": false, "error": format!("Proposal {id} not found")})),
                    )
                }),
            )
    }

    #[tokio::test]
    async fn test_fetch_proposals_sends_filters() {
        let base_url = spawn_stub(stub_router()).await;
        let filters = vec![
            ("category".to_string(), "Pursuits".to_string()),
            ("stage_in".to_string(), "A".to_string()),
            ("stage_in".to_string(), "B".to_string()),
        ];

        let rows = fetch_proposals(&base_url, "tok", &filters).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["TITLE"], "category=Pursuits&stage_in=A&stage_in=B");
    }

    #[tokio::test]
    async fn test_missing_proposal_is_not_found() {
        let base_url = spawn_stub(stub_router()).await;

        let err = fetch_proposal(&base_url, "tok", 9).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(ref m) if m == "Proposal 9 not found"));
    }

    #[tokio::test]
    async fn test_counts_fill_missing_keys_with_zero() {
        let base_url = spawn_stub(stub_router()).await;

        let counts = fetch_counts(&base_url, "tok").await.unwrap();
        assert_eq!(counts.future_pursuits, 4);
        assert_eq!(counts.project_avenue, 0);
    }
}
