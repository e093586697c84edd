use super::{crud, ApiError, ApiJson, ApiPath, ApiResult, AppState, Envelope};
use crate::db::{QueryBuilder, Row, StoreError};
use crate::tables::{
    CATEGORY_PROPOSAL_SUBMITTED, CONTRACT_STAGES, ORGANIZATIONS, PROPOSALS, STATUS_AWARDED,
};
use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde_json::Value;
use tracing::{info, warn};

pub const ORGANIZATIONS_API: &str = "organizations";

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{ORGANIZATIONS_API}").as_str(),
            get(list_organizations).post(create_organization),
        )
        .route(
            format!("/{ORGANIZATIONS_API}/:id").as_str(),
            get(get_organization)
                .put(update_organization)
                .delete(delete_organization),
        )
        .route(
            "/project-avenue/organizations",
            get(project_avenue_organizations),
        )
}

pub async fn list_organizations(State(state): State<AppState>) -> ApiResult<Vec<Row>> {
    crud::list(&state.db, &ORGANIZATIONS).await
}

pub async fn get_organization(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Row> {
    crud::get(&state.db, &ORGANIZATIONS, id).await
}

pub async fn create_organization(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Row>,
) -> ApiResult<Row> {
    crud::require(&payload, &["ORG_FULL_NAME"])?;
    crud::create(&state.db, &ORGANIZATIONS, payload, "created").await
}

pub async fn update_organization(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<Row>,
) -> ApiResult<()> {
    crud::update(&state.db, &ORGANIZATIONS, id, payload).await
}

enum DeleteOutcome {
    Referenced(i64),
    Deleted(usize),
}

/// Deletes an organization unless proposals still point at it. The check and
/// the delete share one transaction.
pub async fn delete_organization(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT COUNT(*) AS \"COUNT\" FROM {} WHERE \"ORG_ID\" = CAST(",
        state.db.table(PROPOSALS.table)
    ));
    qb.push_bind(id.to_string()).push(" AS BIGINT)");
    let references = qb.finish();
    let delete = ORGANIZATIONS.delete(&state.db.table(ORGANIZATIONS.table), id);

    let outcome = state
        .db
        .transaction(move |tx| {
            let count = tx
                .query_one(&references)?
                .and_then(|row| row.get("COUNT").and_then(Value::as_i64))
                .ok_or_else(|| StoreError::Decode("missing COUNT".to_string()))?;
            if count > 0 {
                return Ok(DeleteOutcome::Referenced(count));
            }
            Ok(DeleteOutcome::Deleted(tx.execute(&delete)?))
        })
        .await?;

    match outcome {
        DeleteOutcome::Referenced(count) => {
            warn!(id, count, "organization still referenced");
            Err(ApiError::ReferentialIntegrity(format!(
                "Cannot delete organization. It is referenced by {count} proposal(s)."
            )))
        }
        DeleteOutcome::Deleted(affected) => {
            info!(id, affected, "organization deleted");
            Ok(Json(Envelope::message(crud::done(&ORGANIZATIONS, "deleted"))))
        }
    }
}

/// Clients with awarded, active contract vehicles, labelled
/// `"<name> (<count>)"`.
pub async fn project_avenue_organizations(State(state): State<AppState>) -> ApiResult<Vec<Row>> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT O.\"ORG_FULL_NAME\", \
         O.\"ORG_FULL_NAME\" || ' (' || COUNT(O.\"ORG_FULL_NAME\") || ')' AS \"OLABEL\", \
         COUNT(O.\"ORG_FULL_NAME\") AS \"COUNT\" \
         FROM {} P LEFT JOIN {} O ON O.\"ORG_ID\" = P.\"ORG_ID\" \
         WHERE P.\"ARCHIVE\" = 'N' AND P.\"CATEGORY\" = ",
        state.db.table(PROPOSALS.table),
        state.db.table(ORGANIZATIONS.table),
    ));
    qb.push_bind(CATEGORY_PROPOSAL_SUBMITTED)
        .push(" AND P.\"STATUS\" = ")
        .push_bind(STATUS_AWARDED);

    let stages: Vec<String> = CONTRACT_STAGES
        .iter()
        .map(|stage| qb.bind(Some(stage.to_string())))
        .collect();
    qb.push(&format!(" AND P.\"STAGE\" IN ({})", stages.join(", ")));
    qb.push(" GROUP BY O.\"ORG_FULL_NAME\" ORDER BY O.\"ORG_FULL_NAME\"");

    Ok(Json(Envelope::data(state.db.query(qb.finish()).await?)))
}
