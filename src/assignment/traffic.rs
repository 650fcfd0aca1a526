//! Weighted traffic splitting over hash buckets.

use serde::{Deserialize, Serialize};

use super::bucket::visitor_bucket;
use crate::types::{DocumentId, Experiment};

/// Error type for variant assignment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignmentError {
    /// Assignment was attempted without any allocation.
    #[error("Variants array cannot be empty")]
    EmptyAllocations,
}

/// A variant's share of an experiment's traffic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantAllocation {
    /// Variant id.
    pub variant_id: DocumentId,
    /// Percentage of traffic (0-100).
    pub traffic_percent: u32,
}

impl VariantAllocation {
    /// Create an allocation.
    pub fn new(variant_id: impl Into<DocumentId>, traffic_percent: u32) -> Self {
        Self {
            variant_id: variant_id.into(),
            traffic_percent,
        }
    }

    /// Allocations of an experiment's arms, in declaration order.
    ///
    /// Populated and bare variant references are both accepted.
    pub fn from_experiment(experiment: &Experiment) -> Vec<Self> {
        experiment
            .variants
            .iter()
            .map(|entry| Self::new(entry.variant.id().clone(), entry.traffic_percent))
            .collect()
    }
}

/// Outcome of assigning a visitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    /// The hash bucket (0-99) the visitor fell into.
    pub bucket: u32,
    /// The assigned variant.
    pub variant_id: DocumentId,
}

/// Pick the allocation covering `bucket`.
///
/// Walks allocations in order, accumulating percentages; the first entry with
/// `bucket < cumulative` wins. When the percentages sum to less than the
/// bucket, the last allocation is used.
pub fn pick_for_bucket(
    bucket: u32,
    allocations: &[VariantAllocation],
) -> Result<&VariantAllocation, AssignmentError> {
    let last = allocations.last().ok_or(AssignmentError::EmptyAllocations)?;

    let mut cumulative = 0u32;
    for allocation in allocations {
        cumulative = cumulative.saturating_add(allocation.traffic_percent);
        if bucket < cumulative {
            return Ok(allocation);
        }
    }

    Ok(last)
}

/// Deterministically assign a visitor to one of an experiment's variants.
///
/// The same `(visitor_id, experiment_id, allocations)` always yields the same
/// variant; across many visitors the split converges to the percentages.
pub fn assign_variant(
    visitor_id: &str,
    experiment_id: &str,
    allocations: &[VariantAllocation],
) -> Result<Assignment, AssignmentError> {
    if allocations.is_empty() {
        return Err(AssignmentError::EmptyAllocations);
    }

    let bucket = visitor_bucket(visitor_id, experiment_id);
    let allocation = pick_for_bucket(bucket, allocations)?;

    Ok(Assignment {
        bucket,
        variant_id: allocation.variant_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExperimentStatus, ExperimentVariantEntry};

    fn split(a: u32, b: u32) -> Vec<VariantAllocation> {
        vec![VariantAllocation::new("A", a), VariantAllocation::new("B", b)]
    }

    #[test]
    fn test_empty_allocations_rejected() {
        assert_eq!(
            assign_variant("visitor", "exp", &[]),
            Err(AssignmentError::EmptyAllocations)
        );
        assert_eq!(pick_for_bucket(0, &[]), Err(AssignmentError::EmptyAllocations));
    }

    #[test]
    fn test_boundary_buckets() {
        let allocations = split(50, 50);
        assert_eq!(pick_for_bucket(0, &allocations).unwrap().variant_id.as_str(), "A");
        assert_eq!(pick_for_bucket(49, &allocations).unwrap().variant_id.as_str(), "A");
        assert_eq!(pick_for_bucket(50, &allocations).unwrap().variant_id.as_str(), "B");
        assert_eq!(pick_for_bucket(99, &allocations).unwrap().variant_id.as_str(), "B");
    }

    #[test]
    fn test_every_bucket_covered_when_sum_is_100() {
        let allocations = vec![
            VariantAllocation::new("A", 33),
            VariantAllocation::new("B", 33),
            VariantAllocation::new("C", 34),
        ];
        let mut counts = [0u32; 3];
        for bucket in 0..100 {
            let picked = pick_for_bucket(bucket, &allocations).unwrap();
            let idx = allocations.iter().position(|a| a == picked).unwrap();
            counts[idx] += 1;
        }
        assert_eq!(counts, [33, 33, 34]);
    }

    #[test]
    fn test_underfilled_split_falls_back_to_last() {
        let allocations = split(30, 30);
        assert_eq!(pick_for_bucket(59, &allocations).unwrap().variant_id.as_str(), "B");
        assert_eq!(pick_for_bucket(60, &allocations).unwrap().variant_id.as_str(), "B");
        assert_eq!(pick_for_bucket(99, &allocations).unwrap().variant_id.as_str(), "B");
    }

    #[test]
    fn test_zero_percent_arm_never_picked() {
        let allocations = vec![
            VariantAllocation::new("A", 0),
            VariantAllocation::new("B", 100),
        ];
        for bucket in 0..100 {
            assert_eq!(pick_for_bucket(bucket, &allocations).unwrap().variant_id.as_str(), "B");
        }
    }

    #[test]
    fn test_assignment_reports_bucket() {
        let assignment = assign_variant("visitor_abc", "exp_123", &split(50, 50)).unwrap();
        assert_eq!(assignment.bucket, 10);
        assert_eq!(assignment.variant_id.as_str(), "A");
    }

    #[test]
    fn test_single_allocation_always_wins() {
        let allocations = vec![VariantAllocation::new("only", 100)];
        for i in 0..50 {
            let visitor = format!("visitor_{}", i);
            let assignment = assign_variant(&visitor, "exp", &allocations).unwrap();
            assert_eq!(assignment.variant_id.as_str(), "only");
        }
    }

    #[test]
    fn test_allocations_from_experiment() {
        let experiment = crate::types::Experiment::new(
            "e1",
            "Test",
            "p1",
            ExperimentStatus::Running,
            vec![
                ExperimentVariantEntry::new("v1", 70),
                ExperimentVariantEntry::new("v2", 30),
            ],
        );
        assert_eq!(
            VariantAllocation::from_experiment(&experiment),
            vec![VariantAllocation::new("v1", 70), VariantAllocation::new("v2", 30)]
        );
    }
}
