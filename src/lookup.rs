//! Experiment lookup: from a page slug and visitor to a composed page.
//!
//! ## Algorithm
//!
//! 1. Load the page by slug (absent page ⇒ no result)
//! 2. Load running experiments for the page (none ⇒ no result)
//! 3. Pick the first experiment (or refuse, in strict mode)
//! 4. Hash the visitor into a bucket and walk the traffic split
//! 5. Load the assigned variant and check it belongs to the page
//! 6. Resolve the page and compose the variant on top

use serde::Serialize;
use std::sync::Arc;

use crate::assignment::{assign_variant, AssignmentError, VariantAllocation};
use crate::resolve::{compose, resolve_page};
use crate::store::{DocumentStore, ExperimentFilter};
use crate::types::{DocumentId, Experiment, PageVariant, ResolvedPage, ResolvedPageWithVariant};

/// Population depth for page reads (page -> reusable blocks).
pub const PAGE_DEPTH: u8 = 2;

/// Population depth for experiment reads (experiment -> variants).
pub const EXPERIMENT_DEPTH: u8 = 1;

/// Population depth for variant reads (variant -> page -> reusable blocks).
pub const VARIANT_DEPTH: u8 = 2;

/// Error type for experiment lookup.
///
/// Not-found conditions are not errors; they surface as `Ok(None)` or a
/// [`PreviewOutcome`]. Everything here is a broken invariant or a store
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Store error.
    #[error("Store error: {0}")]
    StoreError(String),

    /// A running experiment has no variants.
    #[error("Experiment {0} has no variants")]
    ExperimentWithoutVariants(DocumentId),

    /// The assigned variant is missing or belongs to another page.
    #[error("Variant {variant_id} not found or does not belong to page \"{slug}\"")]
    AssignedVariantUnavailable {
        /// The assigned variant.
        variant_id: DocumentId,
        /// The requested page.
        slug: String,
    },

    /// Several experiments run on one page and strict mode is on.
    #[error("{} running experiments on page \"{slug}\"", experiments.len())]
    AmbiguousExperiments {
        /// The requested page.
        slug: String,
        /// The running experiments, in store order.
        experiments: Vec<DocumentId>,
    },

    /// Assignment failed.
    #[error(transparent)]
    Assignment(#[from] AssignmentError),
}

impl LookupError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::StoreError(e.to_string())
    }
}

/// What to do when more than one experiment runs on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultipleRunningPolicy {
    /// Use the first experiment the store returns and log a warning.
    #[default]
    FirstWins,
    /// Fail with [`LookupError::AmbiguousExperiments`].
    Reject,
}

/// Resolver configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Multiple-running-experiment policy.
    pub multiple_running: MultipleRunningPolicy,
}

impl ResolverConfig {
    /// Strict configuration: ambiguous pages are errors.
    pub fn strict() -> Self {
        Self {
            multiple_running: MultipleRunningPolicy::Reject,
        }
    }
}

/// Result of a preview request.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewOutcome {
    /// The composed page.
    Composed(Box<ResolvedPageWithVariant>),
    /// No page has the slug.
    PageNotFound,
    /// No variant has the id.
    VariantNotFound,
    /// The variant exists but belongs to a different page.
    VariantBelongsToOtherPage {
        /// The requested variant.
        variant_id: DocumentId,
        /// The page it actually belongs to.
        variant_page: DocumentId,
    },
}

/// A visitor's assignment and the page they should see.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedVariant {
    /// The experiment that was run.
    pub experiment_id: DocumentId,
    /// The assigned variant.
    pub variant_id: DocumentId,
    /// The visitor.
    pub visitor_id: String,
    /// Hash bucket the visitor fell into.
    pub bucket: u32,
    /// The composed page.
    pub resolved_page: ResolvedPageWithVariant,
}

/// Experiment resolver over a document store.
pub struct ExperimentResolver<S: DocumentStore> {
    store: Arc<S>,
    config: ResolverConfig,
}

impl<S: DocumentStore> Clone for ExperimentResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config,
        }
    }
}

impl<S: DocumentStore> ExperimentResolver<S> {
    /// Create a resolver with the default configuration.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, ResolverConfig::default())
    }

    /// Create a resolver with an explicit configuration.
    pub fn with_config(store: Arc<S>, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The resolver configuration.
    pub fn config(&self) -> ResolverConfig {
        self.config
    }

    /// The page with its reusable-block references resolved.
    pub async fn resolved_page(&self, slug: &str) -> Result<Option<ResolvedPage>, LookupError> {
        let page = self
            .store
            .find_page_by_slug(slug, PAGE_DEPTH)
            .await
            .map_err(LookupError::from_store)?;
        Ok(page.as_ref().map(resolve_page))
    }

    /// Compose an explicit variant onto its page, for editors.
    pub async fn preview(&self, slug: &str, variant_id: &DocumentId) -> Result<PreviewOutcome, LookupError> {
        let Some(page) = self
            .store
            .find_page_by_slug(slug, PAGE_DEPTH)
            .await
            .map_err(LookupError::from_store)?
        else {
            return Ok(PreviewOutcome::PageNotFound);
        };

        let Some(variant) = self.find_variant(variant_id).await? else {
            return Ok(PreviewOutcome::VariantNotFound);
        };

        if variant.page_id() != &page.id {
            return Ok(PreviewOutcome::VariantBelongsToOtherPage {
                variant_id: variant.id.clone(),
                variant_page: variant.page_id().clone(),
            });
        }

        let composed = compose(resolve_page(&page), &variant);
        Ok(PreviewOutcome::Composed(Box::new(composed)))
    }

    /// Assign a visitor to the page's running experiment and compose the result.
    ///
    /// `Ok(None)` when the page does not exist or runs no experiment.
    pub async fn assigned_variant(
        &self,
        slug: &str,
        visitor_id: &str,
    ) -> Result<Option<AssignedVariant>, LookupError> {
        let Some(page) = self
            .store
            .find_page_by_slug(slug, PAGE_DEPTH)
            .await
            .map_err(LookupError::from_store)?
        else {
            return Ok(None);
        };

        let experiments = self
            .store
            .find_experiments(&ExperimentFilter::running_on(page.id.clone()), EXPERIMENT_DEPTH)
            .await
            .map_err(LookupError::from_store)?;

        let Some(experiment) = self.select_experiment(slug, &experiments)? else {
            return Ok(None);
        };

        let allocations = VariantAllocation::from_experiment(experiment);
        if allocations.is_empty() {
            return Err(LookupError::ExperimentWithoutVariants(experiment.id.clone()));
        }

        let assignment = assign_variant(visitor_id, experiment.id.as_str(), &allocations)?;
        tracing::debug!(
            experiment_id = %experiment.id,
            variant_id = %assignment.variant_id,
            bucket = assignment.bucket,
            "Assigned visitor"
        );

        let unavailable = || LookupError::AssignedVariantUnavailable {
            variant_id: assignment.variant_id.clone(),
            slug: slug.to_string(),
        };
        let variant = self
            .find_variant(&assignment.variant_id)
            .await?
            .ok_or_else(unavailable)?;
        if variant.page_id() != &page.id {
            return Err(unavailable());
        }

        Ok(Some(AssignedVariant {
            experiment_id: experiment.id.clone(),
            variant_id: assignment.variant_id.clone(),
            visitor_id: visitor_id.to_string(),
            bucket: assignment.bucket,
            resolved_page: compose(resolve_page(&page), &variant),
        }))
    }

    fn select_experiment<'a>(
        &self,
        slug: &str,
        experiments: &'a [Experiment],
    ) -> Result<Option<&'a Experiment>, LookupError> {
        if experiments.len() > 1 {
            let ids: Vec<DocumentId> = experiments.iter().map(|e| e.id.clone()).collect();
            match self.config.multiple_running {
                MultipleRunningPolicy::Reject => {
                    return Err(LookupError::AmbiguousExperiments {
                        slug: slug.to_string(),
                        experiments: ids,
                    });
                }
                MultipleRunningPolicy::FirstWins => {
                    tracing::warn!(
                        slug,
                        experiments = ?ids,
                        chosen = %experiments[0].id,
                        "Multiple running experiments on one page; using the first"
                    );
                }
            }
        }
        Ok(experiments.first())
    }

    async fn find_variant(&self, id: &DocumentId) -> Result<Option<PageVariant>, LookupError> {
        self.store
            .find_variant(id, VARIANT_DEPTH)
            .await
            .map_err(LookupError::from_store)
    }
}
