use thiserror::Error;

/// SQLSTATE reported by Postgres when a referenced table does not exist.
pub const UNDEFINED_TABLE: &str = "42P01";

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Relation \"{relation}\" does not exist")]
    MissingRelation { relation: String },

    #[error("Query failed: {message}")]
    QueryFailed { message: String },

    #[error("Invalid value in column '{column}': {message}")]
    InvalidResult { column: String, message: String },

    #[error("Access denied: {message}")]
    Forbidden { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Database,
    Access,
    Configuration,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DashboardError {
    /// True when the error reports that `relation` is absent from the store.
    pub fn is_missing_relation(&self, relation: &str) -> bool {
        matches!(self, DashboardError::MissingRelation { relation: r } if r == relation)
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            DashboardError::Database(_)
            | DashboardError::MissingRelation { .. }
            | DashboardError::QueryFailed { .. }
            | DashboardError::InvalidResult { .. } => ErrorCategory::Database,
            DashboardError::Forbidden { .. } => ErrorCategory::Access,
            DashboardError::ConfigValidationError { .. }
            | DashboardError::InvalidConfigValueError { .. }
            | DashboardError::MissingConfigError { .. } => ErrorCategory::Configuration,
            DashboardError::IoError(_)
            | DashboardError::SerializationError(_)
            | DashboardError::CsvError(_) => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DashboardError::Database(err) => match err {
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                    ErrorSeverity::Medium
                }
                _ => ErrorSeverity::High,
            },
            DashboardError::QueryFailed { .. } => ErrorSeverity::Medium,
            DashboardError::MissingRelation { .. }
            | DashboardError::InvalidResult { .. }
            | DashboardError::Forbidden { .. }
            | DashboardError::ConfigValidationError { .. }
            | DashboardError::InvalidConfigValueError { .. }
            | DashboardError::MissingConfigError { .. } => ErrorSeverity::High,
            DashboardError::IoError(_)
            | DashboardError::SerializationError(_)
            | DashboardError::CsvError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DashboardError::Database(_) | DashboardError::QueryFailed { .. } => {
                "Check that the database is reachable and the connection settings are correct"
            }
            DashboardError::MissingRelation { .. } => {
                "Run the schema migrations for the dashboard tables"
            }
            DashboardError::InvalidResult { .. } => {
                "Inspect the column types of the users and contracts tables"
            }
            DashboardError::Forbidden { .. } => "Sign in as an admin or a mentor",
            DashboardError::ConfigValidationError { .. }
            | DashboardError::InvalidConfigValueError { .. }
            | DashboardError::MissingConfigError { .. } => {
                "Fix the configuration file or command line flags and retry"
            }
            DashboardError::IoError(_)
            | DashboardError::SerializationError(_)
            | DashboardError::CsvError(_) => "Check that stdout is writable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Database => format!("Could not compute dashboard statistics: {}", self),
            ErrorCategory::Access => format!("Not allowed to view the dashboard: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Output => format!("Could not write the report: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
