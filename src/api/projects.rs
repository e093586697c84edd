//! Calendar projects and their milestones, resources and tasks.

use super::{crud, ApiJson, ApiPath, ApiResult, AppState};
use crate::db::{Database, Row};
use crate::schema::EntitySchema;
use crate::tables::{MILESTONES, PROJECTS, RESOURCES, TASKS};
use axum::{
    extract::State,
    routing::{get, put},
    Router,
};
use serde_json::Value;

pub const PROJECTS_API: &str = "projects";

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{PROJECTS_API}").as_str(),
            get(list_projects).post(create_project),
        )
        .route(
            format!("/{PROJECTS_API}/:id").as_str(),
            get(get_project).put(update_project).delete(delete_project),
        )
        .merge(child_routes(&MILESTONES, "milestones", "created"))
        .merge(child_routes(&RESOURCES, "resources", "added"))
        .merge(child_routes(&TASKS, "tasks", "created"))
}

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Vec<Row>> {
    crud::list(&state.db, &PROJECTS).await
}

pub async fn get_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Row> {
    crud::get(&state.db, &PROJECTS, id).await
}

pub async fn create_project(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Row>,
) -> ApiResult<Row> {
    crud::create(&state.db, &PROJECTS, payload, "created").await
}

pub async fn update_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<Row>,
) -> ApiResult<()> {
    crud::update(&state.db, &PROJECTS, id, payload).await
}

pub async fn delete_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    crud::delete(&state.db, &PROJECTS, id).await
}

/// Creates a child row. The project id from the path always wins over one in
/// the body.
pub async fn create_child(
    db: &Database,
    schema: &'static EntitySchema,
    project_id: i64,
    mut payload: Row,
    verb: &str,
) -> ApiResult<Row> {
    if let Some(parent) = schema.parent {
        payload.insert(parent.to_string(), Value::from(project_id));
    }
    crud::create(db, schema, payload, verb).await
}

/// `GET/POST /projects/:id/<path>` and `PUT/DELETE /<path>/:id`.
fn child_routes(
    schema: &'static EntitySchema,
    path: &'static str,
    created: &'static str,
) -> Router<AppState> {
    Router::new()
        .route(
            format!("/{PROJECTS_API}/:id/{path}").as_str(),
            get(
                move |State(state): State<AppState>, ApiPath(project_id): ApiPath<i64>| async move {
                    crud::list_children(&state.db, schema, project_id).await
                },
            )
            .post(
                move |State(state): State<AppState>,
                      ApiPath(project_id): ApiPath<i64>,
                      ApiJson(payload): ApiJson<Row>| async move {
                    create_child(&state.db, schema, project_id, payload, created).await
                },
            ),
        )
        .route(
            format!("/{path}/:id").as_str(),
            put(
                move |State(state): State<AppState>,
                      ApiPath(id): ApiPath<i64>,
                      ApiJson(payload): ApiJson<Row>| async move {
                    crud::update(&state.db, schema, id, payload).await
                },
            )
            .delete(
                move |State(state): State<AppState>, ApiPath(id): ApiPath<i64>| async move {
                    crud::delete(&state.db, schema, id).await
                },
            ),
        )
}
