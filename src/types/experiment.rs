//! Experiment documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::id::{Document, DocumentId, Relation};
use super::page::{Page, PageVariant};

/// Lifecycle status of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    /// Not yet started.
    #[default]
    Draft,
    /// Assigning visitors.
    Running,
    /// Temporarily stopped; stats still reported.
    Paused,
    /// Finished.
    Completed,
}

impl ExperimentStatus {
    /// Parse status from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One arm of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentVariantEntry {
    /// The page variant for this arm.
    pub variant: Relation<PageVariant>,
    /// Share of traffic (0-100). Missing values count as 0.
    #[serde(default)]
    pub traffic_percent: u32,
}

impl ExperimentVariantEntry {
    /// Create an arm pointing at a variant id.
    pub fn new(variant: impl Into<DocumentId>, traffic_percent: u32) -> Self {
        Self {
            variant: Relation::Id(variant.into()),
            traffic_percent,
        }
    }
}

/// An A/B experiment over one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    /// Document id.
    pub id: DocumentId,
    /// Experiment name.
    pub name: String,
    /// The base page being tested.
    pub page: Relation<Page>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: ExperimentStatus,
    /// Arms with traffic allocation.
    #[serde(default)]
    pub variants: Vec<ExperimentVariantEntry>,
    /// When the experiment activates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// When the experiment ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

impl Experiment {
    /// Create an experiment with the given arms.
    pub fn new(
        id: impl Into<DocumentId>,
        name: impl Into<String>,
        page: impl Into<DocumentId>,
        status: ExperimentStatus,
        variants: Vec<ExperimentVariantEntry>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            page: Relation::Id(page.into()),
            status,
            variants,
            start_date: None,
            end_date: None,
        }
    }

    /// Id of the page under test.
    pub fn page_id(&self) -> &DocumentId {
        self.page.id()
    }

    /// Sum of all traffic percentages.
    pub fn total_traffic(&self) -> u32 {
        self.variants.iter().map(|v| v.traffic_percent).sum()
    }
}

impl Document for Experiment {
    fn id(&self) -> &DocumentId {
        &self.id
    }
}
