//! The list/get/create/update/delete shapes every entity shares, driven by
//! its [`EntitySchema`].

use super::{ApiError, ApiResult, Envelope};
use crate::db::{Database, Row, StoreError};
use crate::schema::EntitySchema;
use axum::Json;
use serde_json::Value;
use tracing::info;

pub(super) fn done(schema: &EntitySchema, verb: &str) -> String {
    format!("{} {verb} successfully", schema.label)
}

/// Rejects the payload unless every named column carries a value; missing,
/// null and empty string all count as absent.
pub(super) fn require(payload: &Row, columns: &[&str]) -> Result<(), ApiError> {
    let missing = columns.iter().find(|column| match payload.get(**column) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    });
    match missing {
        Some(column) => Err(ApiError::Validation(format!("{column} is required"))),
        None => Ok(()),
    }
}

pub(super) async fn list(db: &Database, schema: &'static EntitySchema) -> ApiResult<Vec<Row>> {
    let rows = db.query(schema.select_all(&db.table(schema.table))).await?;
    Ok(Json(Envelope::data(rows)))
}

pub(super) async fn list_children(
    db: &Database,
    schema: &'static EntitySchema,
    parent_id: i64,
) -> ApiResult<Vec<Row>> {
    let stmt = schema.select_by_parent(&db.table(schema.table), parent_id);
    Ok(Json(Envelope::data(db.query(stmt).await?)))
}

pub(super) async fn get(db: &Database, schema: &'static EntitySchema, id: i64) -> ApiResult<Row> {
    let stmt = schema.select_by_id(&db.table(schema.table), id);
    match db.query_one(stmt).await? {
        Some(row) => Ok(Json(Envelope::data(row))),
        None => Err(ApiError::NotFound(schema.label)),
    }
}

/// Inserts the payload and answers with the generated key, e.g.
/// `data: {"EVENT_ID": 7}`.
pub(super) async fn create(
    db: &Database,
    schema: &'static EntitySchema,
    payload: Row,
    verb: &str,
) -> ApiResult<Row> {
    let stmt = schema.insert(&db.table(schema.table), &payload)?;
    let key = db
        .query_one(stmt)
        .await?
        .ok_or_else(|| StoreError::Internal(format!("insert into {} returned no key", schema.table)))?;

    info!(entity = schema.label, key = ?key.get(schema.key), "created");
    Ok(Json(Envelope::data(key).with_message(done(schema, verb))))
}

/// Overwrites the supplied columns. An id with no row still reports success.
pub(super) async fn update(
    db: &Database,
    schema: &'static EntitySchema,
    id: i64,
    payload: Row,
) -> ApiResult<()> {
    let stmt = schema.update(&db.table(schema.table), id, &payload)?;
    let affected = db.execute(stmt).await?;

    info!(entity = schema.label, id, affected, "updated");
    Ok(Json(Envelope::message(done(schema, "updated"))))
}

pub(super) async fn delete(db: &Database, schema: &'static EntitySchema, id: i64) -> ApiResult<()> {
    let affected = db.execute(schema.delete(&db.table(schema.table), id)).await?;

    info!(entity = schema.label, id, affected, "deleted");
    Ok(Json(Envelope::message(done(schema, "deleted"))))
}
