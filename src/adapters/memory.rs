//! In-process executor that evaluates queries against plain vectors.
//!
//! Used by tests and local demos. Every executed statement is recorded so
//! callers can assert which queries ran and with which parameters.

use crate::core::query::{normalize_step, Column, Predicate, Projection, Query, Relation, SqlStatement};
use crate::domain::model::{Contract, Record, User};
use crate::domain::ports::QueryExecutor;
use crate::utils::error::{DashboardError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct InMemoryExecutor {
    users: Vec<User>,
    /// `None` models a deployment where the contracts table was never created.
    contracts: Option<Vec<Contract>>,
    failing: HashSet<Relation>,
    executed: Mutex<Vec<(Relation, SqlStatement)>>,
}

impl InMemoryExecutor {
    pub fn new(users: Vec<User>, contracts: Vec<Contract>) -> Self {
        Self {
            users,
            contracts: Some(contracts),
            ..Self::default()
        }
    }

    pub fn without_contracts(users: Vec<User>) -> Self {
        Self {
            users,
            contracts: None,
            ..Self::default()
        }
    }

    /// Makes every query against `relation` fail as if the connection dropped.
    pub fn failing_on(mut self, relation: Relation) -> Self {
        self.failing.insert(relation);
        self
    }

    pub fn executed(&self) -> Vec<SqlStatement> {
        self.log()
            .iter()
            .map(|(_, statement)| statement.clone())
            .collect()
    }

    pub fn executed_against(&self, relation: Relation) -> usize {
        self.log().iter().filter(|(r, _)| *r == relation).count()
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<(Relation, SqlStatement)>> {
        // A panic while holding the lock cannot leave the log half-written.
        self.executed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fetch_users(&self, query: &Query) -> Result<Vec<Record>> {
        let mut matched = Vec::new();
        for user in &self.users {
            if user_matches(user, query.predicates())? {
                matched.push(user);
            }
        }

        match query.projection() {
            Projection::Count => Ok(vec![count_row(matched.len())]),
            Projection::Column(column) => matched
                .into_iter()
                .map(|user| {
                    let value = user_text(user, column)?
                        .map(|s| Value::String(s.to_string()))
                        .unwrap_or(Value::Null);
                    Ok(Record::default().with(column.name(), value))
                })
                .collect(),
            Projection::SumAmount => Err(wrong_relation(Column::Amount, Relation::Users)),
        }
    }

    fn fetch_contracts(&self, query: &Query) -> Result<Vec<Record>> {
        let contracts = self
            .contracts
            .as_ref()
            .ok_or_else(|| DashboardError::MissingRelation {
                relation: Relation::Contracts.table_name().to_string(),
            })?;

        let mut matched = Vec::new();
        for contract in contracts {
            if contract_matches(contract, query.predicates())? {
                matched.push(contract);
            }
        }

        match query.projection() {
            Projection::Count => Ok(vec![count_row(matched.len())]),
            // Postgres hands the sum back as text; mirror that.
            Projection::SumAmount => {
                let total: f64 = matched.iter().map(|c| c.amount).sum();
                Ok(vec![Record::default().with("total", total.to_string())])
            }
            Projection::Column(column) => matched
                .into_iter()
                .map(|contract| {
                    let value = match column {
                        Column::Status => Value::String(contract.status.clone()),
                        Column::StudentPhone => contract
                            .student_phone
                            .clone()
                            .map(Value::String)
                            .unwrap_or(Value::Null),
                        Column::Amount => Value::String(contract.amount.to_string()),
                        other => return Err(wrong_relation(other, Relation::Contracts)),
                    };
                    Ok(Record::default().with(column.name(), value))
                })
                .collect(),
        }
    }
}

#[async_trait]
impl QueryExecutor for InMemoryExecutor {
    async fn fetch(&self, query: &Query) -> Result<Vec<Record>> {
        let relation = query.relation();
        self.log().push((relation, query.render()));

        if self.failing.contains(&relation) {
            return Err(DashboardError::QueryFailed {
                message: format!("connection lost while reading {}", relation),
            });
        }

        match relation {
            Relation::Users => self.fetch_users(query),
            Relation::Contracts => self.fetch_contracts(query),
        }
    }
}

fn count_row(n: usize) -> Record {
    Record::default().with("count", n as u64)
}

fn wrong_relation(column: Column, relation: Relation) -> DashboardError {
    DashboardError::QueryFailed {
        message: format!(
            "column \"{}\" does not exist in relation \"{}\"",
            column.name(),
            relation
        ),
    }
}

fn user_text(user: &User, column: Column) -> Result<Option<&str>> {
    match column {
        Column::CurrentStep => Ok(user.current_step.as_deref()),
        Column::MentorName => Ok(user.mentor_name.as_deref()),
        Column::PhoneNumber => Ok(user.phone_number.as_deref()),
        other => Err(wrong_relation(other, Relation::Users)),
    }
}

fn user_matches(user: &User, predicates: &[Predicate]) -> Result<bool> {
    for predicate in predicates {
        let matched = match predicate {
            Predicate::StudentPopulation => user.is_student(),
            Predicate::IsMentor => user.is_mentor,
            Predicate::StepIs(marker) => user
                .current_step
                .as_deref()
                .is_some_and(|step| normalize_step(step) == *marker),
            Predicate::Equals(column, value) => user_text(user, *column)? == Some(value.as_str()),
            Predicate::AnyOf(column, values) => user_text(user, *column)?
                .is_some_and(|v| values.iter().any(|candidate| candidate == v)),
            Predicate::SettledContract => {
                return Err(wrong_relation(Column::Status, Relation::Users))
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn contract_matches(contract: &Contract, predicates: &[Predicate]) -> Result<bool> {
    for predicate in predicates {
        let matched = match predicate {
            Predicate::SettledContract => contract.is_settled(),
            Predicate::Equals(Column::Status, value) => contract.status == *value,
            Predicate::Equals(Column::StudentPhone, value) => {
                contract.student_phone.as_deref() == Some(value.as_str())
            }
            Predicate::AnyOf(Column::StudentPhone, values) => contract
                .student_phone
                .as_deref()
                .is_some_and(|phone| values.iter().any(|candidate| candidate == phone)),
            Predicate::Equals(column, _) | Predicate::AnyOf(column, _) => {
                return Err(wrong_relation(*column, Relation::Contracts))
            }
            Predicate::StudentPopulation | Predicate::StepIs(_) => {
                return Err(wrong_relation(Column::CurrentStep, Relation::Contracts))
            }
            Predicate::IsMentor => {
                return Err(wrong_relation(Column::IsMentor, Relation::Contracts))
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}
