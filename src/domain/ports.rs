use crate::core::query::Query;
use crate::domain::model::Record;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Data-access boundary: runs one parameterized read query and returns its rows.
///
/// Implementations must keep the query text and its bound parameters apart,
/// and must report a missing table as `DashboardError::MissingRelation`.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn fetch(&self, query: &Query) -> Result<Vec<Record>>;
}

#[async_trait]
impl<T: QueryExecutor + ?Sized> QueryExecutor for std::sync::Arc<T> {
    async fn fetch(&self, query: &Query) -> Result<Vec<Record>> {
        (**self).fetch(query).await
    }
}

pub trait ConfigProvider: Send + Sync {
    fn database_url(&self) -> String;
    fn max_connections(&self) -> u32;
    fn acquire_timeout_seconds(&self) -> u64;
    fn employed_marker(&self) -> &str;
}
