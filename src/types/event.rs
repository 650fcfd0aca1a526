//! Analytics events and captured leads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::experiment::Experiment;
use super::id::{DocumentId, Relation};
use super::page::{Page, PageVariant};

/// Kind of analytics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// A variant was shown.
    Impression,
    /// A visitor converted.
    Conversion,
    /// A tracked click.
    Click,
    /// Free-form event named by `eventName`.
    Custom,
}

/// A tracked analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    /// Document id, assigned by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    /// Kind of event.
    pub event_type: EventType,
    /// Experiment the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<Relation<Experiment>>,
    /// Variant that was shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Relation<PageVariant>>,
    /// Visitor id from the cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_id: Option<String>,
    /// Page the event occurred on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Relation<Page>>,
    /// Block-level tracking id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    /// Name for custom events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data: Option<Value>,
    /// When the event occurred. Set on creation if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl AnalyticsEvent {
    /// Create an event for an experiment arm.
    pub fn for_variant(
        event_type: EventType,
        experiment: impl Into<DocumentId>,
        variant: impl Into<DocumentId>,
    ) -> Self {
        Self {
            id: None,
            event_type,
            experiment: Some(Relation::Id(experiment.into())),
            variant: Some(Relation::Id(variant.into())),
            visitor_id: None,
            page: None,
            block_id: None,
            event_name: None,
            event_data: None,
            timestamp: None,
        }
    }

    /// Id of the experiment, if any.
    pub fn experiment_id(&self) -> Option<&DocumentId> {
        self.experiment.as_ref().map(Relation::id)
    }

    /// Id of the variant, if any.
    pub fn variant_id(&self) -> Option<&DocumentId> {
        self.variant.as_ref().map(Relation::id)
    }
}

/// A captured form submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Document id, assigned by the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DocumentId>,
    /// Contact email.
    pub email: String,
    /// Contact name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Experiment the lead was captured from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<Relation<Experiment>>,
    /// Variant the visitor saw.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Relation<PageVariant>>,
    /// Visitor id at submission time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_id: Option<String>,
    /// Page the form was on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Relation<Page>>,
    /// Additional form fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Value>,
    /// Where the lead came from, e.g. "hero-cta".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// When the lead converted. Set on creation if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_at: Option<DateTime<Utc>>,
}

impl Lead {
    /// Create a lead with just an email.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: None,
            email: email.into(),
            name: None,
            experiment: None,
            variant: None,
            visitor_id: None,
            page: None,
            form_data: None,
            source: None,
            converted_at: None,
        }
    }
}
