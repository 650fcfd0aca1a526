//! Per-variant experiment statistics.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::lookup::LookupError;
use crate::store::{DocumentStore, ExperimentFilter};
use crate::types::{AnalyticsEvent, DocumentId, EventType, Experiment, ExperimentStatus};

/// Maximum number of events read per experiment.
pub const EVENT_LIMIT: usize = 10_000;

/// Experiment statuses that are reported on.
pub const REPORTED_STATUSES: [ExperimentStatus; 2] = [ExperimentStatus::Running, ExperimentStatus::Paused];

/// Counts and conversion rate for one variant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantMetrics {
    /// Variant id.
    pub variant_id: DocumentId,
    /// Variant name, when the experiment entry was populated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    /// Impression events.
    pub impressions: u64,
    /// Conversion events.
    pub conversions: u64,
    /// `conversions / impressions * 100`, or 0 without impressions.
    pub conversion_rate: f64,
}

/// Statistics for one experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentStats {
    /// Experiment id.
    pub experiment_id: DocumentId,
    /// Experiment name.
    pub experiment_name: String,
    /// Experiment status.
    pub status: ExperimentStatus,
    /// One entry per listed variant, in experiment order.
    pub variants: Vec<VariantMetrics>,
    /// Highest conversion rate among variants with at least one conversion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winning_variant_id: Option<DocumentId>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Counts {
    impressions: u64,
    conversions: u64,
}

/// Aggregate one experiment's events.
///
/// Events for variants the experiment does not list are ignored, as are
/// event types other than impressions and conversions. Ties for the winner
/// go to the variant listed first.
pub fn aggregate(experiment: &Experiment, events: &[AnalyticsEvent]) -> ExperimentStats {
    let mut counts: BTreeMap<&DocumentId, Counts> = experiment
        .variants
        .iter()
        .map(|entry| (entry.variant.id(), Counts::default()))
        .collect();

    for event in events {
        let Some(slot) = event.variant_id().and_then(|id| counts.get_mut(id)) else {
            continue;
        };
        match event.event_type {
            EventType::Impression => slot.impressions += 1,
            EventType::Conversion => slot.conversions += 1,
            EventType::Click | EventType::Custom => {}
        }
    }

    let mut variants = Vec::with_capacity(experiment.variants.len());
    let mut winning_variant_id = None;
    let mut best_rate = -1.0_f64;

    for entry in &experiment.variants {
        let id = entry.variant.id();
        let Counts { impressions, conversions } = counts.get(id).copied().unwrap_or_default();
        let conversion_rate = if impressions > 0 {
            conversions as f64 / impressions as f64 * 100.0
        } else {
            0.0
        };

        if conversions > 0 && conversion_rate > best_rate {
            best_rate = conversion_rate;
            winning_variant_id = Some(id.clone());
        }

        variants.push(VariantMetrics {
            variant_id: id.clone(),
            variant_name: entry.variant.populated().map(|v| v.name.clone()),
            impressions,
            conversions,
            conversion_rate,
        });
    }

    ExperimentStats {
        experiment_id: experiment.id.clone(),
        experiment_name: experiment.name.clone(),
        status: experiment.status,
        variants,
        winning_variant_id,
    }
}

/// Computes statistics for every running or paused experiment.
pub struct StatsAggregator<S: DocumentStore> {
    store: Arc<S>,
}

impl<S: DocumentStore> StatsAggregator<S> {
    /// Create an aggregator over a store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Statistics for all running and paused experiments, in store order.
    pub async fn compute_stats(&self) -> Result<Vec<ExperimentStats>, LookupError> {
        let experiments = self
            .store
            .find_experiments(&ExperimentFilter::with_statuses(&REPORTED_STATUSES), 1)
            .await
            .map_err(LookupError::from_store)?;

        let mut stats = Vec::with_capacity(experiments.len());
        for experiment in &experiments {
            let events = self
                .store
                .find_events(&experiment.id, EVENT_LIMIT)
                .await
                .map_err(LookupError::from_store)?;
            if events.len() == EVENT_LIMIT {
                tracing::warn!(
                    experiment_id = %experiment.id,
                    limit = EVENT_LIMIT,
                    "Event cap reached; statistics are truncated"
                );
            }
            stats.push(aggregate(experiment, &events));
        }
        Ok(stats)
    }
}
