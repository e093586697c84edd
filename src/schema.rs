//! Entity descriptors shared by the write-statement builders and the form
//! configuration served to the browser.
//!
//! Each entity lists its columns once, with the type used to cast bind
//! values, how an empty string is stored, and whether the column may be
//! written by callers at all.

use crate::db::{quote_ident, QueryBuilder, Row, Statement};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    /// 'Y' / 'N'
    Flag,
    Integer,
    Numeric,
    /// Calendar date sent as `YYYY-MM-DD`.
    Date,
    /// Instant with offset, round-trips through ISO 8601.
    Timestamp,
    LargeText,
}

impl ColumnType {
    pub fn is_textual(self) -> bool {
        matches!(self, ColumnType::Text | ColumnType::Flag | ColumnType::LargeText)
    }
}

/// What an empty string written to the column turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyRule {
    Keep,
    NullOnUpdate,
    NullAlways,
    NullIfBlank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteRole {
    Writable,
    /// Generated by the store.
    Identity,
    /// Maintained by store-side triggers.
    Audit,
    /// Produced by a join, not a column of the table.
    Joined,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnType,
    pub empty: EmptyRule,
    pub role: WriteRole,
}

impl Column {
    pub const fn new(name: &'static str, kind: ColumnType) -> Self {
        Column {
            name,
            kind,
            empty: EmptyRule::Keep,
            role: WriteRole::Writable,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub const fn identity(name: &'static str) -> Self {
        Self::new(name, ColumnType::Integer).role(WriteRole::Identity)
    }

    pub const fn audit(name: &'static str, kind: ColumnType) -> Self {
        Self::new(name, kind).role(WriteRole::Audit)
    }

    pub const fn joined(name: &'static str) -> Self {
        Self::new(name, ColumnType::Text).role(WriteRole::Joined)
    }

    pub const fn role(mut self, role: WriteRole) -> Self {
        self.role = role;
        self
    }

    pub const fn empty(mut self, rule: EmptyRule) -> Self {
        self.empty = rule;
        self
    }

    pub fn is_writable(&self) -> bool {
        self.role == WriteRole::Writable
    }

    /// Converts a JSON payload value into the text bind for this column.
    pub fn normalize(&self, value: &Value, mode: WriteMode) -> Result<Option<String>, SchemaError> {
        let text = match value {
            Value::Null => return Ok(None),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => match self.kind {
                ColumnType::Flag => (if *b { "Y" } else { "N" }).to_string(),
                _ => b.to_string(),
            },
            // Multi-value text fields (PRIME / SUB) are stored semicolon-joined.
            Value::Array(items) if self.kind.is_textual() => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Number(n) => Ok(n.to_string()),
                    _ => Err(SchemaError::UnsupportedValue(self.name.to_string())),
                })
                .collect::<Result<Vec<_>, _>>()?
                .join(";"),
            _ => return Err(SchemaError::UnsupportedValue(self.name.to_string())),
        };

        if text.is_empty() && !self.kind.is_textual() {
            return Ok(None);
        }

        let cleared = match self.empty {
            EmptyRule::Keep => false,
            EmptyRule::NullOnUpdate => mode == WriteMode::Update && text.is_empty(),
            EmptyRule::NullAlways => text.is_empty(),
            EmptyRule::NullIfBlank => text.trim().is_empty(),
        };

        Ok(if cleared { None } else { Some(text) })
    }

    /// SQL expression that turns the text placeholder into the column type.
    pub fn value_expr(&self, placeholder: &str, value: Option<&str>) -> String {
        match self.kind {
            ColumnType::Text | ColumnType::Flag | ColumnType::LargeText => placeholder.to_string(),
            ColumnType::Integer => format!("CAST({placeholder} AS BIGINT)"),
            ColumnType::Numeric => format!("CAST({placeholder} AS NUMERIC)"),
            ColumnType::Date if value.is_some() => format!("TO_DATE({placeholder}, 'YYYY-MM-DD')"),
            ColumnType::Date => format!("CAST({placeholder} AS DATE)"),
            ColumnType::Timestamp => format!("CAST({placeholder} AS TIMESTAMPTZ)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Insert,
    Update,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unknown column {column} for {entity}")]
    UnknownColumn { entity: &'static str, column: String },

    #[error("Unsupported value for column {0}")]
    UnsupportedValue(String),

    #[error("No writable columns supplied")]
    NothingToWrite,
}

#[derive(Debug, Serialize)]
pub struct EntitySchema {
    /// Human-readable name used in messages, e.g. "Proposal".
    pub label: &'static str,
    pub table: &'static str,
    pub key: &'static str,
    /// Foreign key to the owning entity for child tables.
    pub parent: Option<&'static str>,
    pub order_by: &'static [&'static str],
    pub columns: &'static [Column],
}

impl EntitySchema {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn writable_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_writable())
    }

    /// Columns whose empty string is stored as NULL on update.
    pub fn clearable_columns(&self) -> Vec<&'static str> {
        self.columns
            .iter()
            .filter(|c| c.empty == EmptyRule::NullOnUpdate)
            .map(|c| c.name)
            .collect()
    }

    /// Payload entries that may be written, normalized, in descriptor order.
    /// Excluded roles are dropped; unknown keys are an error when `strict`,
    /// skipped otherwise.
    fn collect_values(
        &self,
        payload: &Row,
        mode: WriteMode,
        strict: bool,
    ) -> Result<Vec<(&Column, Option<String>)>, SchemaError> {
        if strict {
            if let Some(key) = payload.keys().find(|key| self.column(key).is_none()) {
                return Err(SchemaError::UnknownColumn {
                    entity: self.label,
                    column: key.clone(),
                });
            }
        }

        let mut values = Vec::new();
        for column in self.writable_columns() {
            if let Some(value) = payload.get(column.name) {
                values.push((column, column.normalize(value, mode)?));
            }
        }
        if values.is_empty() {
            return Err(SchemaError::NothingToWrite);
        }
        Ok(values)
    }

    fn insert_statement(
        &self,
        table_ref: &str,
        values: Vec<(&Column, Option<String>)>,
    ) -> Statement {
        let mut qb = QueryBuilder::new(format!("INSERT INTO {table_ref} ("));
        let names: Vec<String> = values.iter().map(|(c, _)| quote_ident(c.name)).collect();
        qb.push(&names.join(", "));
        qb.push(") VALUES (");

        let exprs: Vec<String> = values
            .into_iter()
            .map(|(column, value)| {
                let expr_value = value.clone();
                let placeholder = qb.bind(value);
                column.value_expr(&placeholder, expr_value.as_deref())
            })
            .collect();
        qb.push(&exprs.join(", "));
        qb.push(&format!(") RETURNING {}", quote_ident(self.key)));
        qb.finish()
    }

    /// INSERT of caller-supplied columns, returning the generated key.
    pub fn insert(&self, table_ref: &str, payload: &Row) -> Result<Statement, SchemaError> {
        let values = self.collect_values(payload, WriteMode::Insert, true)?;
        Ok(self.insert_statement(table_ref, values))
    }

    /// INSERT built from a stored row. Columns the descriptor does not know
    /// are skipped.
    pub fn copy_insert(&self, table_ref: &str, row: &Row) -> Result<Statement, SchemaError> {
        let values = self.collect_values(row, WriteMode::Insert, false)?;
        Ok(self.insert_statement(table_ref, values))
    }

    /// UPDATE overwriting exactly the supplied writable columns.
    pub fn update(&self, table_ref: &str, id: i64, payload: &Row) -> Result<Statement, SchemaError> {
        let values = self.collect_values(payload, WriteMode::Update, true)?;

        let mut qb = QueryBuilder::new(format!("UPDATE {table_ref} SET "));
        let assignments: Vec<String> = values
            .into_iter()
            .map(|(column, value)| {
                let expr_value = value.clone();
                let placeholder = qb.bind(value);
                format!(
                    "{} = {}",
                    quote_ident(column.name),
                    column.value_expr(&placeholder, expr_value.as_deref())
                )
            })
            .collect();
        qb.push(&assignments.join(", "));
        self.push_key_filter(&mut qb, id);
        Ok(qb.finish())
    }

    pub fn select_all(&self, table_ref: &str) -> Statement {
        let mut qb = QueryBuilder::new(format!("SELECT * FROM {table_ref}"));
        self.push_order(&mut qb);
        qb.finish()
    }

    pub fn select_by_id(&self, table_ref: &str, id: i64) -> Statement {
        let mut qb = QueryBuilder::new(format!("SELECT * FROM {table_ref}"));
        self.push_key_filter(&mut qb, id);
        qb.finish()
    }

    /// Rows of a child table belonging to `parent_id`.
    pub fn select_by_parent(&self, table_ref: &str, parent_id: i64) -> Statement {
        let parent = self.parent.unwrap_or(self.key);
        let mut qb = QueryBuilder::new(format!(
            "SELECT * FROM {table_ref} WHERE {} = CAST(",
            quote_ident(parent)
        ));
        qb.push_bind(parent_id.to_string()).push(" AS BIGINT)");
        self.push_order(&mut qb);
        qb.finish()
    }

    pub fn delete(&self, table_ref: &str, id: i64) -> Statement {
        let mut qb = QueryBuilder::new(format!("DELETE FROM {table_ref}"));
        self.push_key_filter(&mut qb, id);
        qb.finish()
    }

    fn push_key_filter(&self, qb: &mut QueryBuilder, id: i64) {
        qb.push(&format!(" WHERE {} = CAST(", quote_ident(self.key)));
        qb.push_bind(id.to_string()).push(" AS BIGINT)");
    }

    fn push_order(&self, qb: &mut QueryBuilder) {
        if self.order_by.is_empty() {
            return;
        }
        let order: Vec<String> = self
            .order_by
            .iter()
            .map(|entry| match entry.strip_suffix(" DESC") {
                Some(name) => format!("{} DESC", quote_ident(name)),
                None => quote_ident(entry),
            })
            .collect();
        qb.push(&format!(" ORDER BY {}", order.join(", ")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static WIDGETS: EntitySchema = EntitySchema {
        label: "Widget",
        table: "WIDGETS",
        key: "WIDGET_ID",
        parent: Some("OWNER_ID"),
        order_by: &["CREATED_AT DESC", "NAME"],
        columns: &[
            Column::identity("WIDGET_ID"),
            Column::new("OWNER_ID", ColumnType::Integer),
            Column::text("NAME"),
            Column::text("LABEL").empty(EmptyRule::NullOnUpdate),
            Column::new("ACTIVE", ColumnType::Flag),
            Column::new("WEIGHT", ColumnType::Numeric),
            Column::new("DUE", ColumnType::Date),
            Column::new("NOTES", ColumnType::LargeText).empty(EmptyRule::NullIfBlank),
            Column::audit("CREATED_AT", ColumnType::Timestamp),
            Column::joined("OWNER_NAME"),
        ],
    };

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_insert_skips_excluded_roles() {
        let stmt = WIDGETS
            .insert(
                "\"s\".\"WIDGETS\"",
                &row(json!({
                    "WIDGET_ID": 5,
                    "NAME": "Bolt",
                    "CREATED_AT": "2024-01-01T00:00:00Z",
                    "OWNER_NAME": "Acme"
                })),
            )
            .unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO \"s\".\"WIDGETS\" (\"NAME\") VALUES ($1) RETURNING \"WIDGET_ID\""
        );
        assert_eq!(stmt.binds, vec![Some("Bolt".to_string())]);
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let err = WIDGETS
            .insert("t", &row(json!({"NAME": "x", "NAME); DROP TABLE t;--": "y"})))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownColumn { entity: "Widget", .. }));
    }

    #[test]
    fn test_copy_insert_ignores_unknown_columns() {
        let stmt = WIDGETS
            .copy_insert("t", &row(json!({"NAME": "x", "LEGACY": "y"})))
            .unwrap();
        assert_eq!(stmt.binds, vec![Some("x".to_string())]);
    }

    #[test]
    fn test_empty_payload_has_nothing_to_write() {
        let err = WIDGETS.update("t", 1, &row(json!({"WIDGET_ID": 1}))).unwrap_err();
        assert_eq!(err, SchemaError::NothingToWrite);
    }

    #[test]
    fn test_typed_columns_are_cast() {
        let stmt = WIDGETS
            .update(
                "t",
                9,
                &row(json!({"OWNER_ID": 3, "WEIGHT": 1.5, "DUE": "2025-03-01", "ACTIVE": true})),
            )
            .unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE t SET \"OWNER_ID\" = CAST($1 AS BIGINT), \"ACTIVE\" = $2, \
             \"WEIGHT\" = CAST($3 AS NUMERIC), \"DUE\" = TO_DATE($4, 'YYYY-MM-DD') \
             WHERE \"WIDGET_ID\" = CAST($5 AS BIGINT)"
        );
        assert_eq!(
            stmt.binds,
            vec![
                Some("3".to_string()),
                Some("Y".to_string()),
                Some("1.5".to_string()),
                Some("2025-03-01".to_string()),
                Some("9".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_date_is_null_not_parsed() {
        let stmt = WIDGETS.insert("t", &row(json!({"DUE": ""}))).unwrap();
        assert!(stmt.sql.contains("CAST($1 AS DATE)"));
        assert!(!stmt.sql.contains("TO_DATE"));
        assert_eq!(stmt.binds, vec![None]);
    }

    #[test]
    fn test_empty_string_rules() {
        let label = WIDGETS.column("LABEL").unwrap();
        let name = WIDGETS.column("NAME").unwrap();
        let notes = WIDGETS.column("NOTES").unwrap();
        let empty = json!("");

        assert_eq!(label.normalize(&empty, WriteMode::Update).unwrap(), None);
        assert_eq!(
            label.normalize(&empty, WriteMode::Insert).unwrap(),
            Some(String::new())
        );
        assert_eq!(
            name.normalize(&empty, WriteMode::Update).unwrap(),
            Some(String::new())
        );
        assert_eq!(notes.normalize(&json!("  \n"), WriteMode::Insert).unwrap(), None);
    }

    #[test]
    fn test_arrays_join_for_text_columns() {
        let name = WIDGETS.column("NAME").unwrap();
        assert_eq!(
            name.normalize(&json!(["A", "B"]), WriteMode::Insert).unwrap(),
            Some("A;B".to_string())
        );
        let weight = WIDGETS.column("WEIGHT").unwrap();
        assert!(weight.normalize(&json!(["1"]), WriteMode::Insert).is_err());
        assert!(name.normalize(&json!({"a": 1}), WriteMode::Insert).is_err());
    }

    #[test]
    fn test_select_by_parent_orders_rows() {
        let stmt = WIDGETS.select_by_parent("t", 4);
        assert_eq!(
            stmt.sql,
            "SELECT * FROM t WHERE \"OWNER_ID\" = CAST($1 AS BIGINT) ORDER BY \"CREATED_AT\" DESC, \"NAME\""
        );
        assert_eq!(stmt.binds, vec![Some("4".to_string())]);
    }

    #[test]
    fn test_delete_binds_key() {
        let stmt = WIDGETS.delete("t", 12);
        assert_eq!(stmt.sql, "DELETE FROM t WHERE \"WIDGET_ID\" = CAST($1 AS BIGINT)");
        assert_eq!(stmt.binds, vec![Some("12".to_string())]);
    }
}
