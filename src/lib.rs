pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{memory::InMemoryExecutor, postgres::PgExecutor};
pub use config::toml_config::TomlConfig;
pub use crate::core::{dashboard::DashboardEngine, report::OutputFormat};
pub use domain::model::{
    Contract, DashboardStats, MentorScope, PaymentsSummary, Principal, Role, User,
};
pub use utils::error::{DashboardError, Result};
