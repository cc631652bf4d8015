use crate::core::metrics;
use crate::core::scope::resolve_scope;
use crate::domain::model::{DashboardStats, MentorScope, PaymentsSummary, Principal};
use crate::domain::ports::{ConfigProvider, QueryExecutor};
use crate::utils::error::Result;
use chrono::Utc;

/// Marker stored in `current_step` once a student has accepted a job offer.
pub const DEFAULT_EMPLOYED_MARKER: &str = "офер";

pub struct DashboardEngine<E: QueryExecutor> {
    executor: E,
    employed_marker: String,
}

impl<E: QueryExecutor> DashboardEngine<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            employed_marker: DEFAULT_EMPLOYED_MARKER.to_string(),
        }
    }

    pub fn from_config<C: ConfigProvider>(executor: E, config: &C) -> Self {
        Self::new(executor).with_employed_marker(config.employed_marker())
    }

    pub fn with_employed_marker(mut self, marker: impl Into<String>) -> Self {
        self.employed_marker = marker.into();
        self
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Computes all dashboard metrics. The individual reads are independent
    /// and run concurrently; the first hard failure aborts the whole request.
    pub async fn stats(&self, scope: Option<&MentorScope>) -> Result<DashboardStats> {
        tracing::info!(
            mentor = scope.map(MentorScope::mentor_name),
            "computing dashboard stats"
        );

        let (total_students, total_mentors, employed_students, paid_amount) = tokio::try_join!(
            metrics::student_count(&self.executor, scope),
            metrics::mentor_count(&self.executor),
            metrics::employed_count(&self.executor, scope, &self.employed_marker),
            metrics::paid_amount(&self.executor, scope),
        )?;

        tracing::info!(
            total_students,
            total_mentors,
            employed_students,
            paid_amount,
            "dashboard stats ready"
        );

        Ok(DashboardStats {
            total_students,
            total_mentors,
            employed_students,
            paid_amount,
            mentor_name: scope.map(|s| s.mentor_name().to_string()),
            generated_at: Utc::now(),
        })
    }

    pub async fn payments_summary(&self, scope: Option<&MentorScope>) -> Result<PaymentsSummary> {
        let paid_amount = metrics::paid_amount(&self.executor, scope).await?;
        tracing::info!(paid_amount, "payments summary ready");

        Ok(PaymentsSummary {
            paid_amount,
            mentor_name: scope.map(|s| s.mentor_name().to_string()),
            generated_at: Utc::now(),
        })
    }

    pub async fn stats_for(&self, principal: &Principal) -> Result<DashboardStats> {
        let scope = resolve_scope(principal)?;
        self.stats(scope.as_ref()).await
    }

    pub async fn payments_summary_for(&self, principal: &Principal) -> Result<PaymentsSummary> {
        let scope = resolve_scope(principal)?;
        self.payments_summary(scope.as_ref()).await
    }
}
