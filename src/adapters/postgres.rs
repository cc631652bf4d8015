//! Postgres executor backed by a `sqlx` connection pool.

use crate::core::query::{Param, Projection, Query, Relation};
use crate::domain::model::Record;
use crate::domain::ports::{ConfigProvider, QueryExecutor};
use crate::utils::error::{DashboardError, Result, UNDEFINED_TABLE};
use crate::utils::validation::redact_database_url;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect<C: ConfigProvider>(config: &C) -> Result<Self> {
        let url = config.database_url();
        tracing::info!("connecting to {}", redact_database_url(&url));

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections())
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds()))
            .connect(&url)
            .await?;

        Ok(Self::new(pool))
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn fetch(&self, query: &Query) -> Result<Vec<Record>> {
        let statement = query.render();

        let mut sql_query = sqlx::query(&statement.sql);
        for param in &statement.params {
            sql_query = match param {
                Param::Text(value) => sql_query.bind(value.clone()),
                Param::TextArray(values) => sql_query.bind(values.clone()),
            };
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_error(err, query.relation()))?;

        rows.iter()
            .map(|row| decode_row(row, query.projection()))
            .collect()
    }
}

fn map_error(err: sqlx::Error, relation: Relation) -> DashboardError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNDEFINED_TABLE) {
            return DashboardError::MissingRelation {
                relation: relation.table_name().to_string(),
            };
        }
    }
    DashboardError::Database(err)
}

fn decode_row(row: &PgRow, projection: Projection) -> Result<Record> {
    let column = projection.output_column();
    let value = match projection {
        Projection::Count => Value::from(row.try_get::<i64, _>(column)?),
        Projection::SumAmount | Projection::Column(_) => row
            .try_get::<Option<String>, _>(column)?
            .map(Value::String)
            .unwrap_or(Value::Null),
    };
    Ok(Record::default().with(column, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics;
    use crate::domain::model::MentorScope;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct SqlStateError {
        code: &'static str,
    }

    impl fmt::Display for SqlStateError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "sqlstate {}", self.code)
        }
    }

    impl StdError for SqlStateError {}

    impl DatabaseError for SqlStateError {
        fn message(&self) -> &str {
            "simulated database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.code))
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn sqlstate(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(SqlStateError { code }))
    }

    /// Fails every query the way Postgres does, through `map_error`.
    struct FailingPg {
        code: &'static str,
        only: Option<Relation>,
    }

    #[async_trait]
    impl QueryExecutor for FailingPg {
        async fn fetch(&self, query: &Query) -> Result<Vec<Record>> {
            match self.only {
                Some(relation) if relation != query.relation() => Ok(vec![
                    Record::default().with("phone_number", Value::from("+111")),
                ]),
                _ => Err(map_error(sqlstate(self.code), query.relation())),
            }
        }
    }

    #[test]
    fn test_undefined_table_maps_to_missing_relation() {
        let err = map_error(sqlstate(UNDEFINED_TABLE), Relation::Contracts);

        assert!(matches!(
            &err,
            DashboardError::MissingRelation { relation } if relation == "contracts"
        ));
        assert!(err.is_missing_relation("contracts"));
        assert!(!err.is_missing_relation("users"));
    }

    #[test]
    fn test_other_sqlstates_stay_database_errors() {
        // undefined_column
        let err = map_error(sqlstate("42703"), Relation::Contracts);
        assert!(matches!(err, DashboardError::Database(_)));
        assert!(!err.is_missing_relation("contracts"));

        let err = map_error(sqlx::Error::PoolTimedOut, Relation::Contracts);
        assert!(matches!(err, DashboardError::Database(sqlx::Error::PoolTimedOut)));
    }

    #[tokio::test]
    async fn test_missing_contracts_table_soft_fails_paid_amount() {
        let executor = FailingPg {
            code: UNDEFINED_TABLE,
            only: Some(Relation::Contracts),
        };

        assert_eq!(metrics::paid_amount(&executor, None).await.ok(), Some(0.0));
        let alice = MentorScope::new("Alice");
        assert_eq!(
            metrics::paid_amount(&executor, Some(&alice)).await.ok(),
            Some(0.0)
        );
    }

    #[tokio::test]
    async fn test_missing_users_table_is_not_swallowed() {
        let executor = FailingPg {
            code: UNDEFINED_TABLE,
            only: Some(Relation::Users),
        };

        let alice = MentorScope::new("Alice");
        let err = metrics::paid_amount(&executor, Some(&alice)).await.unwrap_err();
        assert!(err.is_missing_relation("users"));
    }

    #[tokio::test]
    async fn test_undefined_column_on_contracts_propagates() {
        let executor = FailingPg {
            code: "42703",
            only: None,
        };

        let err = metrics::paid_amount(&executor, None).await.unwrap_err();
        assert!(matches!(err, DashboardError::Database(_)));
    }
}
