use super::{ApiResult, AppState, Envelope};
use crate::db::{quote_ident, Row, Statement};
use crate::tables::LICENSES;
use axum::{extract::State, routing::get, Json, Router};

pub fn create_router() -> Router<AppState> {
    Router::new().route("/licenses", get(list_licenses))
}

/// License expirations for the calendar. Rows without an expiration date are
/// left out.
pub async fn list_licenses(State(state): State<AppState>) -> ApiResult<Vec<Row>> {
    let columns: Vec<String> = LICENSES.columns.iter().map(|c| quote_ident(c.name)).collect();
    let stmt = Statement::new(format!(
        "SELECT {} FROM {} WHERE \"EXPIRATION_DATE\" IS NOT NULL ORDER BY \"EXPIRATION_DATE\"",
        columns.join(", "),
        state.db.table(LICENSES.table)
    ));
    Ok(Json(Envelope::data(state.db.query(stmt).await?)))
}
