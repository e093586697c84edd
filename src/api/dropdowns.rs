use super::{ApiResult, AppState, Envelope};
use crate::db::{QueryBuilder, Row, Statement};
use crate::tables::{ORGANIZATIONS, ORG_TYPE_PRIVATE_ENTITY, PREDEFINED_STAGES, PROPOSALS};
use axum::{extract::State, routing::get, Json, Router};
use serde_json::Value;
use std::collections::BTreeSet;

pub const DROPDOWNS_API: &str = "dropdowns";

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(format!("/{DROPDOWNS_API}/org-type").as_str(), get(org_types))
        .route(format!("/{DROPDOWNS_API}/org-id").as_str(), get(org_ids))
        .route(
            format!("/{DROPDOWNS_API}/private-entities").as_str(),
            get(private_entities),
        )
        .route(format!("/{DROPDOWNS_API}/status").as_str(), get(statuses))
        .route(format!("/{DROPDOWNS_API}/stage").as_str(), get(stages))
}

/// Picks one column out of each row, skipping nulls.
fn column_values(rows: Vec<Row>, column: &str) -> Vec<String> {
    rows.into_iter()
        .filter_map(|mut row| match row.remove(column) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        })
        .collect()
}

/// Store values merged with the predefined stages, deduplicated and sorted.
pub fn merge_stages(stored: Vec<String>) -> Vec<String> {
    PREDEFINED_STAGES
        .iter()
        .map(|stage| stage.to_string())
        .chain(stored)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Rows of `{VALUE}`.
pub async fn org_types(State(state): State<AppState>) -> ApiResult<Vec<Row>> {
    let stmt = Statement::new(format!(
        "SELECT DISTINCT \"ORG_TYPE\" AS \"VALUE\" FROM {} \
         WHERE \"ORG_TYPE\" IS NOT NULL ORDER BY \"VALUE\"",
        state.db.table(ORGANIZATIONS.table)
    ));
    Ok(Json(Envelope::data(state.db.query(stmt).await?)))
}

/// `{label, value}` pairs for the proposal ORG_ID select, labelled
/// `TYPE | Full Name-ABBR`.
pub async fn org_ids(State(state): State<AppState>) -> ApiResult<Vec<Row>> {
    let stmt = Statement::new(format!(
        "SELECT COALESCE(O.\"ORG_TYPE\", '') || ' | ' || COALESCE(O.\"ORG_FULL_NAME\", '') \
         || COALESCE('-' || O.\"ORG_ABBREVIATION\", '') AS \"label\", \
         O.\"ORG_ID\" AS \"value\" \
         FROM {} O ORDER BY O.\"ORG_TYPE\", O.\"ORG_FULL_NAME\"",
        state.db.table(ORGANIZATIONS.table)
    ));
    Ok(Json(Envelope::data(state.db.query(stmt).await?)))
}

/// Names offered for PRIME / SUB: abbreviation when present, else full name.
pub async fn private_entities(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT COALESCE(\"ORG_ABBREVIATION\", \"ORG_FULL_NAME\") AS \"VALUE\" FROM {} \
         WHERE \"ORG_TYPE\" = ",
        state.db.table(ORGANIZATIONS.table)
    ));
    qb.push_bind(ORG_TYPE_PRIVATE_ENTITY)
        .push(" ORDER BY COALESCE(\"ORG_ABBREVIATION\", \"ORG_FULL_NAME\")");

    let rows = state.db.query(qb.finish()).await?;
    Ok(Json(Envelope::data(column_values(rows, "VALUE"))))
}

pub async fn statuses(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let stmt = Statement::new(format!(
        "SELECT DISTINCT \"STATUS\" FROM {} WHERE \"STATUS\" IS NOT NULL ORDER BY \"STATUS\"",
        state.db.table(PROPOSALS.table)
    ));
    let rows = state.db.query(stmt).await?;
    Ok(Json(Envelope::data(column_values(rows, "STATUS"))))
}

pub async fn stages(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let stmt = Statement::new(format!(
        "SELECT DISTINCT \"STAGE\" FROM {} WHERE \"STAGE\" IS NOT NULL ORDER BY \"STAGE\"",
        state.db.table(PROPOSALS.table)
    ));
    let rows = state.db.query(stmt).await?;
    Ok(Json(Envelope::data(merge_stages(column_values(rows, "STAGE")))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_stages_dedups_and_sorts() {
        let merged = merge_stages(vec![
            "Awarded Task Order".to_string(),
            "Fee Proposal".to_string(),
        ]);
        assert_eq!(
            merged,
            vec![
                "AE Selected List",
                "Awarded Task Order",
                "Fee Proposal",
                "Multi-Use Contract",
                "Single Use Contract (Project)",
            ]
        );
    }

    #[test]
    fn test_column_values_skips_nulls() {
        let rows = vec![
            json!({"STATUS": "Awarded"}),
            json!({"STATUS": null}),
            json!({"OTHER": "x"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();
        assert_eq!(column_values(rows, "STATUS"), vec!["Awarded".to_string()]);
    }
}
