//! Aggregation query builder.
//!
//! A [`Query`] is a relation, a projection and a conjunction of predicates.
//! Predicate text is fixed; every caller-supplied value travels as a
//! positional [`Param`] and is referenced from the SQL as `$n`.

use crate::domain::model::{MentorScope, SETTLED_STATUSES};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Users,
    Contracts,
}

impl Relation {
    pub fn table_name(&self) -> &'static str {
        match self {
            Relation::Users => "users",
            Relation::Contracts => "contracts",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    IsMentor,
    CurrentStep,
    MentorName,
    PhoneNumber,
    Amount,
    Status,
    StudentPhone,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::IsMentor => "is_mentor",
            Column::CurrentStep => "current_step",
            Column::MentorName => "mentor_name",
            Column::PhoneNumber => "phone_number",
            Column::Amount => "amount",
            Column::Status => "status",
            Column::StudentPhone => "student_phone",
        }
    }

    pub fn relation(&self) -> Relation {
        match self {
            Column::IsMentor | Column::CurrentStep | Column::MentorName | Column::PhoneNumber => {
                Relation::Users
            }
            Column::Amount | Column::Status | Column::StudentPhone => Relation::Contracts,
        }
    }
}

/// What a query returns. Each projection yields exactly one output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// `COUNT(*)`, output column `count`.
    Count,
    /// `COALESCE(SUM(amount), 0)` rendered as text, output column `total`.
    SumAmount,
    /// A single nullable text column.
    Column(Column),
}

impl Projection {
    pub fn output_column(&self) -> &'static str {
        match self {
            Projection::Count => "count",
            Projection::SumAmount => "total",
            Projection::Column(column) => column.name(),
        }
    }

    fn render(&self) -> String {
        match self {
            Projection::Count => "COUNT(*) AS count".to_string(),
            Projection::SumAmount => "COALESCE(SUM(amount), 0)::text AS total".to_string(),
            Projection::Column(column) => column.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Text(String),
    TextArray(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Non-mentors, or mentors whose progress marker is set and non-empty.
    StudentPopulation,
    /// `is_mentor = TRUE`.
    IsMentor,
    /// Contract status is one of [`SETTLED_STATUSES`].
    SettledContract,
    /// Trimmed, lower-cased `current_step` equals the bound marker.
    /// The marker is stored already normalized.
    StepIs(String),
    /// `column = $n`.
    Equals(Column, String),
    /// `column = ANY($n)` with a text array parameter.
    AnyOf(Column, Vec<String>),
}

impl Predicate {
    pub fn step_is(marker: &str) -> Self {
        Predicate::StepIs(normalize_step(marker))
    }

    /// Appends this predicate's SQL to `sql`, pushing any bound values onto `params`.
    fn render(&self, sql: &mut String, params: &mut Vec<Param>) {
        match self {
            Predicate::StudentPopulation => sql.push_str(
                "(is_mentor IS DISTINCT FROM TRUE OR (is_mentor = TRUE AND current_step IS NOT NULL AND current_step != ''))",
            ),
            Predicate::IsMentor => sql.push_str("is_mentor = TRUE"),
            Predicate::SettledContract => {
                let statuses: Vec<String> =
                    SETTLED_STATUSES.iter().map(|s| format!("'{}'", s)).collect();
                sql.push_str(&format!("status IN ({})", statuses.join(", ")));
            }
            Predicate::StepIs(marker) => {
                params.push(Param::Text(marker.clone()));
                sql.push_str(&format!(
                    "LOWER(BTRIM(current_step, {})) = ${}",
                    step_trim_literal(),
                    params.len()
                ));
            }
            Predicate::Equals(column, value) => {
                params.push(Param::Text(value.clone()));
                sql.push_str(&format!("{} = ${}", column.name(), params.len()));
            }
            Predicate::AnyOf(column, values) => {
                params.push(Param::TextArray(values.clone()));
                sql.push_str(&format!("{} = ANY(${})", column.name(), params.len()));
            }
        }
    }
}

/// Characters stripped from both ends of a progress marker, in Rust and in SQL.
pub const STEP_TRIM_CHARS: [char; 4] = [' ', '\t', '\r', '\n'];

/// Case and surrounding-whitespace normalization applied to progress markers.
///
/// Only [`STEP_TRIM_CHARS`] are trimmed so the result matches the rendered
/// `BTRIM` expression; other Unicode whitespace is kept.
pub fn normalize_step(step: &str) -> String {
    step.trim_matches(&STEP_TRIM_CHARS[..]).to_lowercase()
}

/// [`STEP_TRIM_CHARS`] as a Postgres escape string literal, e.g. `E' \t\r\n'`.
fn step_trim_literal() -> String {
    let escaped: String = STEP_TRIM_CHARS
        .iter()
        .map(|c| match c {
            '\t' => "\\t".to_string(),
            '\r' => "\\r".to_string(),
            '\n' => "\\n".to_string(),
            other => other.to_string(),
        })
        .collect();
    format!("E'{}'", escaped)
}

/// SQL text plus the positional parameters it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    relation: Relation,
    projection: Projection,
    predicates: Vec<Predicate>,
}

impl Query {
    pub fn count(relation: Relation) -> Self {
        Self {
            relation,
            projection: Projection::Count,
            predicates: Vec::new(),
        }
    }

    pub fn sum_amount() -> Self {
        Self {
            relation: Relation::Contracts,
            projection: Projection::SumAmount,
            predicates: Vec::new(),
        }
    }

    pub fn select(column: Column) -> Self {
        Self {
            relation: column.relation(),
            projection: Projection::Column(column),
            predicates: Vec::new(),
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Narrows the query to one mentor's cohort when a scope is present.
    pub fn scoped(self, scope: Option<&MentorScope>) -> Self {
        match scope {
            Some(scope) => self.filter(Predicate::Equals(
                Column::MentorName,
                scope.mentor_name().to_string(),
            )),
            None => self,
        }
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn render(&self) -> SqlStatement {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.projection.render(),
            self.relation.table_name()
        );
        let mut params = Vec::new();

        for (i, predicate) in self.predicates.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            predicate.render(&mut sql, &mut params);
        }

        SqlStatement { sql, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDENTS: &str = "(is_mentor IS DISTINCT FROM TRUE OR (is_mentor = TRUE AND current_step IS NOT NULL AND current_step != ''))";

    #[test]
    fn test_unscoped_student_count() {
        let statement = Query::count(Relation::Users)
            .filter(Predicate::StudentPopulation)
            .scoped(None)
            .render();

        assert_eq!(
            statement.sql,
            format!("SELECT COUNT(*) AS count FROM users WHERE {}", STUDENTS)
        );
        assert!(statement.params.is_empty());
    }

    #[test]
    fn test_scope_is_bound_not_interpolated() {
        let scope = MentorScope::new("O'Brien; DROP TABLE users;--");
        let statement = Query::count(Relation::Users)
            .filter(Predicate::StudentPopulation)
            .scoped(Some(&scope))
            .render();

        assert!(statement.sql.ends_with(" AND mentor_name = $1"));
        assert!(!statement.sql.contains("O'Brien"));
        assert_eq!(
            statement.params,
            vec![Param::Text("O'Brien; DROP TABLE users;--".to_string())]
        );
    }

    #[test]
    fn test_employed_marker_numbering() {
        let scope = MentorScope::new("Alice");
        let statement = Query::count(Relation::Users)
            .filter(Predicate::StudentPopulation)
            .filter(Predicate::step_is(" Офер "))
            .scoped(Some(&scope))
            .render();

        assert_eq!(
            statement.sql,
            format!(
                "SELECT COUNT(*) AS count FROM users WHERE {} AND LOWER(BTRIM(current_step, E' \\t\\r\\n')) = $1 AND mentor_name = $2",
                STUDENTS
            )
        );
        assert_eq!(
            statement.params,
            vec![
                Param::Text("офер".to_string()),
                Param::Text("Alice".to_string())
            ]
        );
    }

    #[test]
    fn test_step_trim_set_is_shared_with_sql() {
        let statement = Query::count(Relation::Users)
            .filter(Predicate::step_is("offer"))
            .render();
        assert_eq!(
            statement.sql,
            r"SELECT COUNT(*) AS count FROM users WHERE LOWER(BTRIM(current_step, E' \t\r\n')) = $1"
        );

        assert_eq!(normalize_step("\tОфер\r\n"), "офер");
        assert_eq!(normalize_step("  OFFER "), "offer");
        // BTRIM leaves these alone, so normalization must too
        assert_eq!(normalize_step("\u{00A0}offer"), "\u{00A0}offer");
        assert_eq!(normalize_step("offer\u{000B}"), "offer\u{000B}");
    }

    #[test]
    fn test_paid_sum_with_phone_set() {
        let statement = Query::sum_amount()
            .filter(Predicate::SettledContract)
            .filter(Predicate::AnyOf(
                Column::StudentPhone,
                vec!["+111".to_string(), "+222".to_string()],
            ))
            .render();

        assert_eq!(
            statement.sql,
            "SELECT COALESCE(SUM(amount), 0)::text AS total FROM contracts WHERE status IN ('paid', 'completed') AND student_phone = ANY($1)"
        );
        assert_eq!(
            statement.params,
            vec![Param::TextArray(vec!["+111".to_string(), "+222".to_string()])]
        );
    }

    #[test]
    fn test_select_column_targets_its_relation() {
        let query = Query::select(Column::PhoneNumber);
        assert_eq!(query.relation(), Relation::Users);
        assert_eq!(query.render().sql, "SELECT phone_number FROM users");
    }
}
