//! Connection management and statement execution.
//!
//! Every public operation acquires a connection through the configured
//! [`ConnectionSource`], runs on a blocking worker thread and releases the
//! connection before returning, whichever way the statement ends. Statements
//! outside [`Database::transaction`] commit on their own.

pub mod connection;
pub mod statement;

pub use connection::{connector_for, ConnectionSource, DbConnection, PooledConnector, RetryingConnector};
pub use statement::{qualified, quote_ident, QueryBuilder, Statement};

use crate::config::{ConnectionStrategy, DbConfig};
use diesel::connection::SimpleConnection;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::sql_types::{Jsonb, Nullable, Text};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Reference DDL for every table the service reads or writes.
pub const SCHEMA_DDL: &str = include_str!("../../sql/schema.sql");

/// A result row keyed by upper-case column name.
pub type Row = Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Could not connect to database after {attempts} attempt(s): {message}")]
    Connection { attempts: u32, message: String },

    #[error("{0}")]
    Query(#[from] diesel::result::Error),

    #[error("Unexpected row shape: {0}")]
    Decode(String),

    #[error("Database worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Internal(String),
}

#[derive(QueryableByName)]
struct JsonRows {
    #[diesel(sql_type = Jsonb)]
    json_rows: Value,
}

fn bind_all(stmt: &Statement) -> diesel::query_builder::BoxedSqlQuery<'static, Pg, diesel::query_builder::SqlQuery> {
    bind_sql(stmt.sql.clone(), &stmt.binds)
}

fn bind_sql(
    sql: String,
    binds: &[Option<String>],
) -> diesel::query_builder::BoxedSqlQuery<'static, Pg, diesel::query_builder::SqlQuery> {
    let mut query = diesel::sql_query(sql).into_boxed::<Pg>();
    for value in binds {
        query = query.bind::<Nullable<Text>, _>(value.clone());
    }
    query
}

/// Wraps a row-returning statement so the store hands back one JSON array
/// holding its rows in statement order.
fn aggregate_sql(sql: &str) -> String {
    format!(
        "WITH q AS ({sql}) \
         SELECT COALESCE(jsonb_agg(to_jsonb(q)), '[]'::jsonb) AS json_rows FROM q"
    )
}

fn decode_rows(value: Value) -> Result<Vec<Row>, StoreError> {
    let Value::Array(items) = value else {
        return Err(StoreError::Decode(value.to_string()));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::Decode(other.to_string())),
        })
        .collect()
}

/// Runs a row-returning statement (a SELECT, or a write with RETURNING) and
/// decodes every row into a JSON object.
pub fn run_query(conn: &mut PgConnection, stmt: &Statement) -> Result<Vec<Row>, StoreError> {
    let result = bind_sql(aggregate_sql(&stmt.sql), &stmt.binds).get_result::<JsonRows>(conn)?;
    decode_rows(result.json_rows)
}

/// Runs a statement and returns the number of affected rows.
pub fn run_execute(conn: &mut PgConnection, stmt: &Statement) -> Result<usize, StoreError> {
    Ok(bind_all(stmt).execute(conn)?)
}

/// Statements run on one connection under a single commit/rollback boundary.
pub struct Transaction<'a> {
    conn: &'a mut PgConnection,
}

impl Transaction<'_> {
    pub fn query(&mut self, stmt: &Statement) -> Result<Vec<Row>, StoreError> {
        run_query(self.conn, stmt)
    }

    pub fn query_one(&mut self, stmt: &Statement) -> Result<Option<Row>, StoreError> {
        Ok(run_query(self.conn, stmt)?.into_iter().next())
    }

    pub fn execute(&mut self, stmt: &Statement) -> Result<usize, StoreError> {
        run_execute(self.conn, stmt)
    }
}

/// Process-wide database handle. Cloning is cheap; all clones share the
/// same connection source.
#[derive(Clone)]
pub struct Database {
    source: Arc<dyn ConnectionSource>,
    schema: Arc<str>,
}

impl Database {
    pub fn new(config: &DbConfig) -> Self {
        Self {
            source: Arc::from(connector_for(config)),
            schema: Arc::from(config.schema.as_str()),
        }
    }

    pub fn with_source(source: Arc<dyn ConnectionSource>, schema: &str) -> Self {
        Self {
            source,
            schema: Arc::from(schema),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Schema-qualified, quoted table reference.
    pub fn table(&self, name: &str) -> String {
        qualified(&self.schema, name)
    }

    pub fn strategy(&self) -> ConnectionStrategy {
        self.source.strategy()
    }

    /// Checks that a connection can be acquired. For the pooled strategy this
    /// also creates the pool.
    pub async fn init(&self) -> Result<(), StoreError> {
        self.with_connection(|_| Ok(())).await
    }

    pub fn shutdown(&self) {
        self.source.shutdown();
    }

    async fn with_connection<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let source = self.source.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = source.acquire()?;
            f(&mut conn)
        })
        .await?
    }

    pub async fn query(&self, stmt: Statement) -> Result<Vec<Row>, StoreError> {
        self.with_connection(move |conn| run_query(conn, &stmt)).await
    }

    pub async fn query_one(&self, stmt: Statement) -> Result<Option<Row>, StoreError> {
        Ok(self.query(stmt).await?.into_iter().next())
    }

    pub async fn execute(&self, stmt: Statement) -> Result<usize, StoreError> {
        self.with_connection(move |conn| run_execute(conn, &stmt)).await
    }

    /// Runs raw SQL containing several statements, without binds.
    pub async fn batch_execute(&self, sql: String) -> Result<(), StoreError> {
        self.with_connection(move |conn| Ok(conn.batch_execute(&sql)?))
            .await
    }

    /// Creates the configured schema and its tables if they are missing.
    pub async fn install_schema(&self) -> Result<(), StoreError> {
        let schema = quote_ident(&self.schema);
        self.batch_execute(format!(
            "BEGIN; CREATE SCHEMA IF NOT EXISTS {schema}; SET LOCAL search_path TO {schema};\n{SCHEMA_DDL}\nCOMMIT;"
        ))
        .await
    }

    /// Runs `f` inside a transaction on a single connection. An `Err` from
    /// `f` rolls everything back.
    pub async fn transaction<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        self.with_connection(move |conn| {
            conn.transaction::<T, StoreError, _>(|conn| f(&mut Transaction { conn }))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PoolSettings, RetryPolicy};
    use std::time::Duration;

    fn closed_database() -> Database {
        let connector = PooledConnector::new(
            "postgres://nobody@127.0.0.1:1/none".to_string(),
            PoolSettings::default(),
            Duration::from_secs(1),
        );
        connector.shutdown();
        Database::with_source(Arc::new(connector), "bd")
    }

    #[test]
    fn test_rows_come_back_as_one_ordered_array() {
        let sql = aggregate_sql("SELECT 1 AS \"A\" ORDER BY 1");
        assert_eq!(
            sql,
            "WITH q AS (SELECT 1 AS \"A\" ORDER BY 1) \
             SELECT COALESCE(jsonb_agg(to_jsonb(q)), '[]'::jsonb) AS json_rows FROM q"
        );

        let rows = decode_rows(serde_json::json!([{"PID": 2}, {"PID": 1}])).unwrap();
        let pids: Vec<&Value> = rows.iter().map(|row| &row["PID"]).collect();
        assert_eq!(pids, vec![&Value::from(2), &Value::from(1)]);

        assert!(decode_rows(serde_json::json!([])).unwrap().is_empty());
        assert!(matches!(
            decode_rows(serde_json::json!([1])),
            Err(StoreError::Decode(_))
        ));
        assert!(matches!(
            decode_rows(serde_json::json!({"PID": 1})),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn test_table_is_schema_qualified() {
        let config = DbConfig {
            url: "postgres://h/d".to_string(),
            schema: "MSMM DASHBOARD".to_string(),
            strategy: ConnectionStrategy::Direct,
            connect_timeout: Duration::from_secs(1),
            call_timeout: Duration::from_secs(1),
            retry: RetryPolicy::default(),
            pool: PoolSettings::default(),
        };
        let db = Database::new(&config);
        assert_eq!(db.table("PROPOSALS"), "\"MSMM DASHBOARD\".\"PROPOSALS\"");
        assert_eq!(db.strategy(), ConnectionStrategy::Direct);
    }

    #[tokio::test]
    async fn test_connection_errors_propagate_from_worker() {
        let db = closed_database();
        let result = db.query(Statement::new("SELECT 1")).await;
        assert!(matches!(result, Err(StoreError::Connection { .. })));

        let result = db
            .transaction(|tx| tx.execute(&Statement::new("SELECT 1")))
            .await;
        assert!(matches!(result, Err(StoreError::Connection { .. })));
    }
}
