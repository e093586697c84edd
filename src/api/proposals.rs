use super::{crud, ApiError, ApiJson, ApiPath, ApiQuery, ApiResult, AppState, Envelope};
use crate::dashboard::{count_proposals, CountRow, ProposalCounts};
use crate::db::{QueryBuilder, Row, Statement, StoreError};
use crate::filters::{proposal_select, ProposalFilter};
use crate::schema::{EntitySchema, SchemaError};
use crate::tables::{
    Fieldset, CATEGORY_FEE_PROPOSAL, CATEGORY_FIELDSETS, CATEGORY_PROPOSAL_SUBMITTED,
    CATEGORY_PURSUITS, FIELD_WIDGETS, ORGANIZATIONS, PROPOSALS, STATUS_AWAITING_VERDICT,
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub const PROPOSALS_API: &str = "proposals";

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            format!("/{PROPOSALS_API}").as_str(),
            get(list_proposals).post(create_proposal),
        )
        .route(
            format!("/{PROPOSALS_API}/columns").as_str(),
            get(proposal_columns),
        )
        .route(
            format!("/{PROPOSALS_API}/counts").as_str(),
            get(proposal_counts),
        )
        .route(
            format!("/{PROPOSALS_API}/form-config").as_str(),
            get(form_config),
        )
        .route(
            format!("/{PROPOSALS_API}/:id").as_str(),
            get(get_proposal)
                .put(update_proposal)
                .delete(delete_proposal),
        )
        .route(
            format!("/{PROPOSALS_API}/:id/archive-and-copy-to-proposal").as_str(),
            post(archive_and_copy_to_proposal),
        )
        .route(
            format!("/{PROPOSALS_API}/:id/copy-to-new-pursuit").as_str(),
            post(copy_to_new_pursuit),
        )
}

pub async fn list_proposals(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<Vec<(String, String)>>,
) -> ApiResult<Vec<Row>> {
    let filter = ProposalFilter::from_pairs(params);
    debug!(?filter, "listing proposals");

    let stmt = filter.to_statement(
        &state.db.table(PROPOSALS.table),
        &state.db.table(ORGANIZATIONS.table),
    );
    let rows = state.db.query(stmt).await?;
    Ok(Json(Envelope::counted(rows)))
}

pub async fn get_proposal(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Row> {
    let mut qb = QueryBuilder::new(proposal_select(
        &state.db.table(PROPOSALS.table),
        &state.db.table(ORGANIZATIONS.table),
    ));
    qb.push(" WHERE P.\"PID\" = CAST(")
        .push_bind(id.to_string())
        .push(" AS BIGINT)");

    match state.db.query_one(qb.finish()).await? {
        Some(row) => Ok(Json(Envelope::data(row))),
        None => Err(ApiError::NotFound(PROPOSALS.label)),
    }
}

pub async fn create_proposal(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Row>,
) -> ApiResult<Row> {
    crud::create(&state.db, &PROPOSALS, payload, "created").await
}

pub async fn update_proposal(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<Row>,
) -> ApiResult<()> {
    crud::update(&state.db, &PROPOSALS, id, payload).await
}

pub async fn delete_proposal(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    crud::delete(&state.db, &PROPOSALS, id).await
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub length: i64,
}

impl ColumnInfo {
    fn virtual_column(name: &str, data_type: &str, nullable: bool, length: i64) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
            length,
        }
    }
}

/// Table columns as the store reports them, framed by the grid's virtual
/// columns.
pub async fn proposal_columns(State(state): State<AppState>) -> ApiResult<Vec<ColumnInfo>> {
    let mut qb = QueryBuilder::new(
        "SELECT column_name AS \"name\", data_type AS \"type\", \
         (is_nullable = 'YES') AS \"nullable\", \
         COALESCE(character_maximum_length, 0) AS \"length\" \
         FROM information_schema.columns WHERE table_schema = ",
    );
    qb.push_bind(state.db.schema())
        .push(" AND table_name = ")
        .push_bind(PROPOSALS.table)
        .push(" ORDER BY ordinal_position");

    let mut columns = vec![ColumnInfo::virtual_column("ACTION", "VIRTUAL", false, 0)];
    for row in state.db.query(qb.finish()).await? {
        let column: ColumnInfo = serde_json::from_value(Value::Object(row))
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        columns.push(column);
    }
    columns.push(ColumnInfo::virtual_column("CLIENT_NAME", "character varying", true, 4000));
    columns.push(ColumnInfo::virtual_column("ORG_TYPE", "character varying", true, 200));

    Ok(Json(Envelope::data(columns)))
}

pub async fn proposal_counts(State(state): State<AppState>) -> ApiResult<ProposalCounts> {
    let stmt = Statement::new(format!(
        "SELECT \"CATEGORY\", \"ARCHIVE\", \"STAGE\", \"STATUS\", \"PRIME\", \"SUB\" FROM {}",
        state.db.table(PROPOSALS.table)
    ));

    let rows = state
        .db
        .query(stmt)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value::<CountRow>(Value::Object(row)))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| StoreError::Decode(err.to_string()))?;

    Ok(Json(Envelope::data(count_proposals(&rows, &state.home_company))))
}

/// Everything the proposal editor needs to render its form.
#[derive(Serialize)]
pub struct FormConfig {
    pub entity: &'static EntitySchema,
    pub fieldsets: &'static [Fieldset],
    pub widgets: BTreeMap<&'static str, &'static str>,
    pub clearable: Vec<&'static str>,
    pub options: BTreeMap<&'static str, Vec<&'static str>>,
    pub defaults: BTreeMap<&'static str, Value>,
}

pub fn proposal_form_config() -> FormConfig {
    let categories = vec![
        CATEGORY_PURSUITS,
        CATEGORY_PROPOSAL_SUBMITTED,
        CATEGORY_FEE_PROPOSAL,
    ];
    let defaults = categories
        .iter()
        .map(|category| (*category, json!({"CATEGORY": category, "ARCHIVE": "N"})))
        .collect();

    FormConfig {
        entity: &PROPOSALS,
        fieldsets: CATEGORY_FIELDSETS,
        widgets: FIELD_WIDGETS.iter().copied().collect(),
        clearable: PROPOSALS.clearable_columns(),
        options: BTreeMap::from([("ARCHIVE", vec!["Y", "N"]), ("CATEGORY", categories)]),
        defaults,
    }
}

pub async fn form_config() -> Json<Envelope<FormConfig>> {
    Json(Envelope::data(proposal_form_config()))
}

fn copy_failed(err: SchemaError) -> StoreError {
    StoreError::Internal(format!("Could not copy proposal: {err}"))
}

/// Archives the pursuit and inserts a proposal carrying its pre-archive
/// values, both or neither.
pub async fn archive_and_copy_to_proposal(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Row> {
    let table = state.db.table(PROPOSALS.table);
    let mut archive = Row::new();
    archive.insert("ARCHIVE".to_string(), Value::from("Y"));
    let archive = PROPOSALS.update(&table, id, &archive)?;

    let created = state
        .db
        .transaction(move |tx| {
            let Some(mut source) = tx.query_one(&PROPOSALS.select_by_id(&table, id))? else {
                return Ok(None);
            };
            tx.execute(&archive)?;

            source.insert("STATUS".to_string(), Value::from(STATUS_AWAITING_VERDICT));
            source.insert("CATEGORY".to_string(), Value::from(CATEGORY_PROPOSAL_SUBMITTED));
            let insert = PROPOSALS.copy_insert(&table, &source).map_err(copy_failed)?;
            tx.query_one(&insert)
        })
        .await?;

    let key = created.ok_or(ApiError::NotFound("Pursuit"))?;
    info!(source = id, key = ?key.get(PROPOSALS.key), "pursuit archived and copied to proposal");

    Ok(Json(Envelope::data(key).with_message(
        "The Current Pursuit Record has been Archived and New Proposal has been created \
         with the same information. Please go edit the new proposal.",
    )))
}

/// Duplicates a pursuit with " - Copy" appended to its title. The source row
/// is left untouched.
pub async fn copy_to_new_pursuit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Row> {
    let table = state.db.table(PROPOSALS.table);

    let created = state
        .db
        .transaction(move |tx| {
            let Some(mut source) = tx.query_one(&PROPOSALS.select_by_id(&table, id))? else {
                return Ok(None);
            };

            if let Some(Value::String(title)) = source.get("TITLE") {
                if !title.is_empty() {
                    let copied = format!("{title} - Copy");
                    source.insert("TITLE".to_string(), Value::from(copied));
                }
            }
            let insert = PROPOSALS.copy_insert(&table, &source).map_err(copy_failed)?;
            tx.query_one(&insert)
        })
        .await?;

    let key = created.ok_or(ApiError::NotFound("Pursuit"))?;
    info!(source = id, key = ?key.get(PROPOSALS.key), "pursuit copied");

    Ok(Json(Envelope::data(key).with_message(
        "A New Pursuit has been created with the same information. \
         Please go edit the new pursuit.",
    )))
}
