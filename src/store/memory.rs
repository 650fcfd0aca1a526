//! In-memory document store for tests and local development.

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::populate::{strip_event, strip_experiment, strip_page, strip_variant, Library};
use super::{DocumentStore, ExperimentFilter};
use crate::hooks::{
    fill_page_block_ids, fill_reusable_block_ids, fill_variant_block_ids, stamp_event, stamp_lead,
    validate_experiment, validate_page_sections, ExperimentValidationError, SectionError,
};
use crate::types::{
    AnalyticsEvent, DocumentId, Experiment, Lead, Page, PageVariant, ReusableBlockDocument,
};

/// Error type for in-memory store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InMemoryError {
    /// Another page already uses the slug.
    #[error("Slug already in use: {0}")]
    DuplicateSlug(String),

    /// Page sections rejected by the block registry.
    #[error(transparent)]
    InvalidPage(#[from] SectionError),

    /// Experiment rejected by validation.
    #[error(transparent)]
    InvalidExperiment(#[from] ExperimentValidationError),
}

/// In-memory document store.
///
/// Pages, variants and reusable blocks live in a [`Library`] (BTreeMaps);
/// experiments, events and leads keep insertion order. Writes run the same
/// hooks as any other backend. Block ids are generated when a document is
/// created and carried over when it is replaced.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentStore {
    library: Library,
    /// Slug -> page id.
    slugs: BTreeMap<String, DocumentId>,
    experiments: Vec<Experiment>,
    events: Vec<AnalyticsEvent>,
    leads: Vec<Lead>,
}

impl InMemoryDocumentStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a page.
    pub fn insert_page(&mut self, mut page: Page) -> Result<(), InMemoryError> {
        if let Some(owner) = self.slugs.get(&page.slug) {
            if owner != &page.id {
                return Err(InMemoryError::DuplicateSlug(page.slug));
            }
        }
        validate_page_sections(&page)?;
        strip_page(&mut page);
        let stored = self.library.pages.get(&page.id);
        fill_page_block_ids(&mut page, stored);
        self.slugs.retain(|_, id| id != &page.id);
        self.slugs.insert(page.slug.clone(), page.id.clone());
        self.library.extend_pages([page]);
        Ok(())
    }

    /// Insert or replace a page variant.
    pub fn insert_variant(&mut self, mut variant: PageVariant) {
        strip_variant(&mut variant);
        let stored = self.library.variants.get(&variant.id);
        fill_variant_block_ids(&mut variant, stored);
        self.library.extend_variants([variant]);
    }

    /// Insert or replace a reusable block.
    pub fn insert_reusable_block(&mut self, mut block: ReusableBlockDocument) {
        let stored = self.library.reusable_blocks.get(&block.id);
        fill_reusable_block_ids(&mut block, stored);
        self.library.extend_reusable_blocks([block]);
    }

    /// Insert or replace an experiment after validating it.
    ///
    /// A replaced experiment keeps its original position.
    pub fn insert_experiment(&mut self, mut experiment: Experiment) -> Result<(), InMemoryError> {
        validate_experiment(&experiment, |id| self.library.variant_page(id))?;
        strip_experiment(&mut experiment);

        match self.experiments.iter_mut().find(|e| e.id == experiment.id) {
            Some(existing) => *existing = experiment,
            None => self.experiments.push(experiment),
        }
        Ok(())
    }

    /// Record an analytics event.
    pub fn insert_event(&mut self, mut event: AnalyticsEvent) {
        stamp_event(&mut event);
        strip_event(&mut event);
        if event.id.is_none() {
            event.id = Some(DocumentId::new(uuid::Uuid::new_v4().to_string()));
        }
        self.events.push(event);
    }

    /// Record a captured lead.
    pub fn insert_lead(&mut self, mut lead: Lead) {
        stamp_lead(&mut lead);
        if lead.id.is_none() {
            lead.id = Some(DocumentId::new(uuid::Uuid::new_v4().to_string()));
        }
        self.leads.push(lead);
    }

    /// Stored pages, normalized.
    pub fn page(&self, id: &DocumentId) -> Option<&Page> {
        self.library.pages.get(id)
    }

    /// Number of recorded events.
    pub fn num_events(&self) -> usize {
        self.events.len()
    }

    /// Captured leads, in insertion order.
    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    type Error = InMemoryError;

    async fn find_page_by_slug(&self, slug: &str, depth: u8) -> Result<Option<Page>, Self::Error> {
        Ok(self
            .slugs
            .get(slug)
            .and_then(|id| self.library.pages.get(id))
            .map(|page| self.library.page_at_depth(page, depth)))
    }

    async fn find_variant(&self, id: &DocumentId, depth: u8) -> Result<Option<PageVariant>, Self::Error> {
        Ok(self
            .library
            .variants
            .get(id)
            .map(|variant| self.library.variant_at_depth(variant, depth)))
    }

    async fn find_experiments(
        &self,
        filter: &ExperimentFilter,
        depth: u8,
    ) -> Result<Vec<Experiment>, Self::Error> {
        Ok(self
            .experiments
            .iter()
            .filter(|e| filter.matches(e))
            .map(|e| self.library.experiment_at_depth(e, depth))
            .collect())
    }

    async fn find_events(
        &self,
        experiment: &DocumentId,
        limit: usize,
    ) -> Result<Vec<AnalyticsEvent>, Self::Error> {
        Ok(self
            .events
            .iter()
            .filter(|e| e.experiment_id() == Some(experiment))
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Block, BlockSettings, EventType, ExperimentStatus, ExperimentVariantEntry, Relation,
        ReusableCategory,
    };
    use serde_json::json;

    fn seeded() -> InMemoryDocumentStore {
        let mut store = InMemoryDocumentStore::new();

        let mut page = Page::new("p1", "home", "Home");
        page.content.push(Block::content(json!({ "text": "base" }), BlockSettings::default()));
        page.content.push(Block::reference(Relation::Id("R1".into()), BlockSettings::with_block_id("abc")));
        store.insert_page(page).unwrap();

        store.insert_reusable_block(ReusableBlockDocument::new(
            "R1",
            "Shared",
            ReusableCategory::Content,
            Some(Block::content(json!({ "text": "shared" }), BlockSettings::default())),
        ));
        store.insert_variant(PageVariant::new("v1", "A", "p1"));
        store.insert_variant(PageVariant::new("v2", "B", "p1"));
        store.insert_variant(PageVariant::new("w1", "Other", "p2"));
        store
    }

    #[tokio::test]
    async fn test_page_lookup_and_depth() {
        let store = seeded();

        assert!(store.find_page_by_slug("missing", 1).await.unwrap().is_none());

        let shallow = store.find_page_by_slug("home", 0).await.unwrap().unwrap();
        assert!(!shallow.content[1].as_reference().unwrap().block.is_populated());

        let deep = store.find_page_by_slug("home", 2).await.unwrap().unwrap();
        assert!(deep.content[1].as_reference().unwrap().block.is_populated());
    }

    #[tokio::test]
    async fn test_insert_fills_block_ids() {
        let store = seeded();
        let page = store.page(&DocumentId::from("p1")).unwrap();
        assert!(page.content[0].settings().has_block_id());
        assert_eq!(page.content[1].settings().block_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_duplicate_slug_rejected() {
        let mut store = seeded();
        let err = store.insert_page(Page::new("p9", "home", "Clash")).unwrap_err();
        assert!(matches!(err, InMemoryError::DuplicateSlug(slug) if slug == "home"));
        // Same page, same slug is an update
        assert!(store.insert_page(Page::new("p1", "home", "Renamed")).is_ok());
    }

    #[test]
    fn test_updates_keep_block_ids() {
        let draft = || {
            let mut page = Page::new("p1", "home", "Home");
            page.content.push(Block::content(json!({ "text": "draft" }), BlockSettings::default()));
            page
        };
        let mut store = InMemoryDocumentStore::new();
        let id = DocumentId::from("p1");

        store.insert_page(draft()).unwrap();
        let created = store.page(&id).unwrap().content[0].settings().block_id.clone();
        assert!(created.is_some());

        for _ in 0..2 {
            store.insert_page(draft()).unwrap();
            assert_eq!(store.page(&id).unwrap().content[0].settings().block_id, created);
        }
    }

    #[test]
    fn test_misplaced_block_rejected() {
        let mut store = InMemoryDocumentStore::new();
        let mut page = Page::new("p1", "home", "Home");
        page.hero.push(Block::footer("Bye", BlockSettings::default()));

        let err = store.insert_page(page).unwrap_err();
        assert!(matches!(err, InMemoryError::InvalidPage(SectionError::BlockNotAllowed { .. })));
        assert!(store.page(&DocumentId::from("p1")).is_none());
    }

    #[tokio::test]
    async fn test_experiments_keep_insertion_order() {
        let mut store = seeded();
        for id in ["e2", "e1"] {
            store
                .insert_experiment(Experiment::new(
                    id,
                    id,
                    "p1",
                    ExperimentStatus::Running,
                    vec![ExperimentVariantEntry::new("v1", 50), ExperimentVariantEntry::new("v2", 50)],
                ))
                .unwrap();
        }

        let found = store
            .find_experiments(&ExperimentFilter::running_on(DocumentId::from("p1")), 1)
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1"]);
        assert!(found[0].variants[0].variant.is_populated());
    }

    #[test]
    fn test_invalid_experiment_rejected() {
        let mut store = seeded();
        let foreign = Experiment::new(
            "e1",
            "Mixed pages",
            "p1",
            ExperimentStatus::Draft,
            vec![ExperimentVariantEntry::new("v1", 50), ExperimentVariantEntry::new("w1", 50)],
        );
        assert!(matches!(
            store.insert_experiment(foreign),
            Err(InMemoryError::InvalidExperiment(ExperimentValidationError::ForeignVariant { .. }))
        ));
    }

    #[tokio::test]
    async fn test_events_filtered_and_capped() {
        let mut store = seeded();
        for _ in 0..5 {
            store.insert_event(AnalyticsEvent::for_variant(EventType::Impression, "e1", "v1"));
        }
        store.insert_event(AnalyticsEvent::for_variant(EventType::Impression, "e2", "v1"));

        let events = store.find_events(&DocumentId::from("e1"), 3).await.unwrap();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.timestamp.is_some() && e.id.is_some()));
        assert_eq!(store.num_events(), 6);
    }

    #[test]
    fn test_leads_stamped() {
        let mut store = InMemoryDocumentStore::new();
        store.insert_lead(Lead::new("a@example.com"));
        assert!(store.leads()[0].converted_at.is_some());
    }
}
