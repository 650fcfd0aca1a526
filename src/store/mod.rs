//! Document storage backends.
//!
//! The experiment engine only reads documents. Reads take a population
//! `depth`: at `0` every relation is a bare id, and each additional level
//! inlines one more hop (reusable blocks inside block lists, the page behind a
//! variant, the variants behind an experiment).

pub mod memory;
pub mod populate;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;

use crate::types::{AnalyticsEvent, DocumentId, Experiment, ExperimentStatus, Page, PageVariant};

/// Selection criteria for experiments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentFilter {
    /// Only experiments on this page.
    pub page: Option<DocumentId>,
    /// Only experiments in one of these statuses. Empty means any status.
    pub statuses: Vec<ExperimentStatus>,
}

impl ExperimentFilter {
    /// Running experiments on one page.
    pub fn running_on(page: DocumentId) -> Self {
        Self {
            page: Some(page),
            statuses: vec![ExperimentStatus::Running],
        }
    }

    /// Experiments in any of `statuses`, on any page.
    pub fn with_statuses(statuses: &[ExperimentStatus]) -> Self {
        Self {
            page: None,
            statuses: statuses.to_vec(),
        }
    }

    /// Whether an experiment passes the filter.
    pub fn matches(&self, experiment: &Experiment) -> bool {
        let page_ok = self.page.as_ref().map_or(true, |p| experiment.page_id() == p);
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&experiment.status);
        page_ok && status_ok
    }
}

/// Trait for document storage backends.
///
/// Implementations return experiments and events in a stable order
/// (insertion order), so "first running experiment" is well defined.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync;

    /// Fetch a page by slug.
    async fn find_page_by_slug(&self, slug: &str, depth: u8) -> Result<Option<Page>, Self::Error>;

    /// Fetch a page variant by id.
    async fn find_variant(&self, id: &DocumentId, depth: u8) -> Result<Option<PageVariant>, Self::Error>;

    /// Fetch experiments matching a filter.
    async fn find_experiments(
        &self,
        filter: &ExperimentFilter,
        depth: u8,
    ) -> Result<Vec<Experiment>, Self::Error>;

    /// Fetch up to `limit` analytics events recorded for an experiment.
    async fn find_events(
        &self,
        experiment: &DocumentId,
        limit: usize,
    ) -> Result<Vec<AnalyticsEvent>, Self::Error>;

    /// Whether the backend is reachable.
    async fn is_healthy(&self) -> bool {
        true
    }
}

pub use memory::{InMemoryDocumentStore, InMemoryError};
pub use populate::Library;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresConfig, PostgresDocumentStore, PostgresError};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExperimentVariantEntry;

    #[test]
    fn test_filter_matching() {
        let exp = Experiment::new(
            "e1",
            "Test",
            "p1",
            ExperimentStatus::Paused,
            vec![ExperimentVariantEntry::new("v1", 50)],
        );

        assert!(ExperimentFilter::default().matches(&exp));
        assert!(!ExperimentFilter::running_on(DocumentId::from("p1")).matches(&exp));
        assert!(ExperimentFilter::with_statuses(&[ExperimentStatus::Running, ExperimentStatus::Paused]).matches(&exp));

        let other_page = ExperimentFilter {
            page: Some(DocumentId::from("p2")),
            statuses: vec![],
        };
        assert!(!other_page.matches(&exp));
    }
}
