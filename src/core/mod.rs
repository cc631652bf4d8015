pub mod dashboard;
pub mod metrics;
pub mod query;
pub mod report;
pub mod scope;

pub use crate::domain::model::{MentorScope, Record};
pub use crate::domain::ports::{ConfigProvider, QueryExecutor};
pub use crate::utils::error::Result;
