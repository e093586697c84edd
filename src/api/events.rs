use super::{crud, ApiJson, ApiPath, ApiResult, AppState};
use crate::db::Row;
use crate::tables::EVENTS;
use axum::{extract::State, routing::get, Router};

pub const EVENTS_API: &str = "events";

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{EVENTS_API}").as_str(),
            get(list_events).post(create_event),
        )
        .route(
            format!("/{EVENTS_API}/:id").as_str(),
            get(get_event).put(update_event).delete(delete_event),
        )
}

pub async fn list_events(State(state): State<AppState>) -> ApiResult<Vec<Row>> {
    crud::list(&state.db, &EVENTS).await
}

pub async fn get_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Row> {
    crud::get(&state.db, &EVENTS, id).await
}

pub async fn create_event(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Row>,
) -> ApiResult<Row> {
    crud::require(&payload, &["TITLE", "START_DATE", "END_DATE"])?;
    crud::create(&state.db, &EVENTS, payload, "created").await
}

pub async fn update_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<Row>,
) -> ApiResult<()> {
    crud::update(&state.db, &EVENTS, id, payload).await
}

pub async fn delete_event(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    crud::delete(&state.db, &EVENTS, id).await
}
