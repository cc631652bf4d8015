use crate::core::query::{Column, Predicate, Query, Relation};
use crate::domain::model::{MentorScope, Record};
use crate::domain::ports::QueryExecutor;
use crate::utils::error::{DashboardError, Result};
use serde_json::Value;

/// Users counted as students, optionally limited to one mentor's cohort.
pub async fn student_count<E: QueryExecutor + ?Sized>(
    executor: &E,
    scope: Option<&MentorScope>,
) -> Result<u64> {
    let query = Query::count(Relation::Users)
        .filter(Predicate::StudentPopulation)
        .scoped(scope);

    let rows = run(executor, &query).await?;
    read_count(&rows, "count")
}

/// Students whose progress marker matches `marker` after trimming and lower-casing.
pub async fn employed_count<E: QueryExecutor + ?Sized>(
    executor: &E,
    scope: Option<&MentorScope>,
    marker: &str,
) -> Result<u64> {
    let query = Query::count(Relation::Users)
        .filter(Predicate::StudentPopulation)
        .filter(Predicate::step_is(marker))
        .scoped(scope);

    let rows = run(executor, &query).await?;
    read_count(&rows, "count")
}

/// All mentors. Never scoped.
pub async fn mentor_count<E: QueryExecutor + ?Sized>(executor: &E) -> Result<u64> {
    let query = Query::count(Relation::Users).filter(Predicate::IsMentor);
    let rows = run(executor, &query).await?;
    read_count(&rows, "count")
}

/// Phone numbers of the mentor's students, with null and empty values dropped.
pub async fn mentor_student_phones<E: QueryExecutor + ?Sized>(
    executor: &E,
    scope: &MentorScope,
) -> Result<Vec<String>> {
    let query = Query::select(Column::PhoneNumber).scoped(Some(scope));
    let rows = run(executor, &query).await?;

    let phones = rows
        .iter()
        .filter_map(|row| row.get(Column::PhoneNumber.name()))
        .filter_map(Value::as_str)
        .filter(|phone| !phone.is_empty())
        .map(str::to_string)
        .collect();
    Ok(phones)
}

/// Sum of settled contract amounts.
///
/// A deployment without a `contracts` table reports 0 instead of failing.
/// Any other error is returned to the caller.
pub async fn paid_amount<E: QueryExecutor + ?Sized>(
    executor: &E,
    scope: Option<&MentorScope>,
) -> Result<f64> {
    match settled_amount(executor, scope).await {
        Err(err) if err.is_missing_relation(Relation::Contracts.table_name()) => {
            tracing::warn!("contracts table is absent, reporting paid amount as 0");
            Ok(0.0)
        }
        result => result,
    }
}

async fn settled_amount<E: QueryExecutor + ?Sized>(
    executor: &E,
    scope: Option<&MentorScope>,
) -> Result<f64> {
    let mut query = Query::sum_amount().filter(Predicate::SettledContract);

    if let Some(scope) = scope {
        let phones = mentor_student_phones(executor, scope).await?;
        if phones.is_empty() {
            tracing::debug!(
                mentor = scope.mentor_name(),
                "mentor has no students with a phone number, skipping contracts sum"
            );
            return Ok(0.0);
        }
        query = query.filter(Predicate::AnyOf(Column::StudentPhone, phones));
    }

    let rows = run(executor, &query).await?;
    read_amount(&rows, "total")
}

async fn run<E: QueryExecutor + ?Sized>(executor: &E, query: &Query) -> Result<Vec<Record>> {
    let statement = query.render();
    tracing::debug!(
        sql = %statement.sql,
        params = statement.params.len(),
        "executing aggregation query"
    );
    executor.fetch(query).await
}

/// Reads a row count from the first row. A missing row or NULL counts as 0.
pub fn read_count(rows: &[Record], column: &str) -> Result<u64> {
    let invalid = |message: String| DashboardError::InvalidResult {
        column: column.to_string(),
        message,
    };

    match rows.first().and_then(|row| row.get(column)) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| invalid(format!("{} is not a non-negative integer", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(format!("cannot parse '{}': {}", s, e))),
        Some(other) => Err(invalid(format!("unexpected value {}", other))),
    }
}

/// Reads a numeric sum from the first row. Engines may return sums as text
/// or decimal; both are accepted. A missing row or NULL sum is 0.
pub fn read_amount(rows: &[Record], column: &str) -> Result<f64> {
    let invalid = |message: String| DashboardError::InvalidResult {
        column: column.to_string(),
        message,
    };

    match rows.first().and_then(|row| row.get(column)) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| invalid(format!("{} is not representable as f64", n))),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| invalid(format!("cannot parse '{}': {}", s, e))),
        Some(other) => Err(invalid(format!("unexpected value {}", other))),
    }
}
