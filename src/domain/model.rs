use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One result row as returned by a `QueryExecutor`, keyed by output column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn with(mut self, column: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(column.to_string(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.data.get(column)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub is_mentor: bool,
    pub current_step: Option<String>,
    pub mentor_name: Option<String>,
    pub phone_number: Option<String>,
}

impl User {
    /// Student population membership: every non-mentor, plus mentors that
    /// have a non-empty progress marker.
    pub fn is_student(&self) -> bool {
        !self.is_mentor || self.current_step.as_deref().is_some_and(|step| !step.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: i64,
    pub amount: f64,
    pub status: String,
    pub student_phone: Option<String>,
}

/// Contract statuses that count towards the paid amount.
pub const SETTLED_STATUSES: [&str; 2] = ["paid", "completed"];

impl Contract {
    pub fn is_settled(&self) -> bool {
        SETTLED_STATUSES.contains(&self.status.as_str())
    }
}

/// Restricts aggregation to the cohort of a single mentor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentorScope {
    pub mentor_name: String,
}

impl MentorScope {
    pub fn new(mentor_name: impl Into<String>) -> Self {
        Self {
            mentor_name: mentor_name.into(),
        }
    }

    pub fn mentor_name(&self) -> &str {
        &self.mentor_name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Mentor,
    #[serde(untagged)]
    Other(String),
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "admin" => Role::Admin,
            "mentor" => Role::Mentor,
            other => Role::Other(other.to_string()),
        }
    }
}

impl FromStr for Role {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Role::from(s))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Mentor => write!(f, "mentor"),
            Role::Other(role) => write!(f, "{}", role),
        }
    }
}

/// The authenticated caller a dashboard request is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_students: u64,
    pub total_mentors: u64,
    pub employed_students: u64,
    pub paid_amount: f64,
    pub mentor_name: Option<String>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentsSummary {
    pub paid_amount: f64,
    pub mentor_name: Option<String>,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_student_population() {
        let plain = User::default();
        assert!(plain.is_student());

        let pending_mentor = User {
            is_mentor: true,
            ..User::default()
        };
        assert!(!pending_mentor.is_student());

        let empty_step_mentor = User {
            is_mentor: true,
            current_step: Some(String::new()),
            ..User::default()
        };
        assert!(!empty_step_mentor.is_student());

        let progressing_mentor = User {
            is_mentor: true,
            current_step: Some("інтерв'ю".to_string()),
            ..User::default()
        };
        assert!(progressing_mentor.is_student());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(" mentor ".parse::<Role>().unwrap(), Role::Mentor);
        assert_eq!(
            "student".parse::<Role>().unwrap(),
            Role::Other("student".to_string())
        );
    }

    #[test]
    fn test_scope_serializes_camel_case() {
        let scope = MentorScope::new("Alice");
        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(json, serde_json::json!({ "mentorName": "Alice" }));
    }
}
