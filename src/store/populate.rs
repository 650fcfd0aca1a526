//! Relation population shared by the store backends.
//!
//! Documents are stored normalized (every relation a bare id). A [`Library`]
//! holds the documents a read may need and rebuilds a requested document at
//! the requested depth. Targets missing from the library stay bare ids.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{
    AnalyticsEvent, Block, Document, DocumentId, Experiment, Page, PageVariant, Relation, ReusableBlockDocument,
};

/// Ids of the reusable blocks referenced by a block list.
pub fn referenced_block_ids(blocks: &[Block]) -> BTreeSet<DocumentId> {
    blocks
        .iter()
        .filter_map(Block::as_reference)
        .map(|r| r.block.id().clone())
        .collect()
}

/// Replace populated reusable-block references by bare ids.
pub fn strip_blocks(blocks: &mut [Block]) {
    for block in blocks.iter_mut() {
        if let Block::ReusableBlockRef(reference) = block {
            reference.block = reference.block.to_unpopulated();
        }
    }
}

/// Normalize a page for storage.
pub fn strip_page(page: &mut Page) {
    for section in page.sections_mut() {
        strip_blocks(section);
    }
}

/// Normalize a variant for storage.
pub fn strip_variant(variant: &mut PageVariant) {
    variant.page = variant.page.to_unpopulated();
    for section in variant.overrides_mut() {
        strip_blocks(section);
    }
}

/// Normalize an experiment for storage.
pub fn strip_experiment(experiment: &mut Experiment) {
    experiment.page = experiment.page.to_unpopulated();
    for entry in &mut experiment.variants {
        entry.variant = entry.variant.to_unpopulated();
    }
}

/// Normalize an analytics event for storage.
pub fn strip_event(event: &mut AnalyticsEvent) {
    event.experiment = event.experiment.as_ref().map(Relation::to_unpopulated);
    event.variant = event.variant.as_ref().map(Relation::to_unpopulated);
    event.page = event.page.as_ref().map(Relation::to_unpopulated);
}

/// Documents available for population, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Library {
    /// Pages.
    pub pages: BTreeMap<DocumentId, Page>,
    /// Page variants.
    pub variants: BTreeMap<DocumentId, PageVariant>,
    /// Reusable blocks.
    pub reusable_blocks: BTreeMap<DocumentId, ReusableBlockDocument>,
}

impl Library {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inline reusable-block references whose target is known.
    pub fn populate_blocks(&self, blocks: &mut [Block]) {
        for block in blocks.iter_mut() {
            if let Block::ReusableBlockRef(reference) = block {
                if let Some(doc) = self.reusable_blocks.get(reference.block.id()) {
                    reference.block = Relation::Populated(Box::new(doc.clone()));
                }
            }
        }
    }

    /// A page at `depth`.
    pub fn page_at_depth(&self, page: &Page, depth: u8) -> Page {
        let mut page = page.clone();
        if depth >= 1 {
            for section in page.sections_mut() {
                self.populate_blocks(section);
            }
        }
        page
    }

    /// A variant at `depth`.
    pub fn variant_at_depth(&self, variant: &PageVariant, depth: u8) -> PageVariant {
        let mut variant = variant.clone();
        if depth >= 1 {
            for section in variant.overrides_mut() {
                self.populate_blocks(section);
            }
            variant.page = self.page_relation(variant.page.id(), depth - 1);
        }
        variant
    }

    /// An experiment at `depth`.
    pub fn experiment_at_depth(&self, experiment: &Experiment, depth: u8) -> Experiment {
        let mut experiment = experiment.clone();
        if depth >= 1 {
            experiment.page = self.page_relation(experiment.page.id(), depth - 1);
            for entry in &mut experiment.variants {
                if let Some(variant) = self.variants.get(entry.variant.id()) {
                    entry.variant = Relation::Populated(Box::new(self.variant_at_depth(variant, depth - 1)));
                }
            }
        }
        experiment
    }

    /// The page a variant belongs to, by variant id.
    pub fn variant_page(&self, variant: &DocumentId) -> Option<DocumentId> {
        self.variants.get(variant).map(|v| v.page_id().clone())
    }

    fn page_relation(&self, id: &DocumentId, depth: u8) -> Relation<Page> {
        match self.pages.get(id) {
            Some(page) => Relation::Populated(Box::new(self.page_at_depth(page, depth))),
            None => Relation::Id(id.clone()),
        }
    }

    /// Register documents by id.
    pub fn extend_pages(&mut self, pages: impl IntoIterator<Item = Page>) {
        self.pages.extend(pages.into_iter().map(|p| (p.id().clone(), p)));
    }

    /// Register variants by id.
    pub fn extend_variants(&mut self, variants: impl IntoIterator<Item = PageVariant>) {
        self.variants.extend(variants.into_iter().map(|v| (v.id().clone(), v)));
    }

    /// Register reusable blocks by id.
    pub fn extend_reusable_blocks(&mut self, blocks: impl IntoIterator<Item = ReusableBlockDocument>) {
        self.reusable_blocks.extend(blocks.into_iter().map(|b| (b.id().clone(), b)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockSettings, ExperimentStatus, ExperimentVariantEntry, ReusableCategory};

    fn library() -> Library {
        let mut lib = Library::new();
        let mut page = Page::new("p1", "home", "Home");
        page.content.push(Block::reference(Relation::Id("R1".into()), BlockSettings::with_block_id("abc")));
        lib.extend_pages([page]);

        let mut variant = PageVariant::new("v1", "B", "p1");
        variant.content_override = Some(vec![Block::reference(Relation::Id("R1".into()), BlockSettings::default())]);
        lib.extend_variants([variant]);

        lib.extend_reusable_blocks([ReusableBlockDocument::new(
            "R1",
            "Shared",
            ReusableCategory::Content,
            Some(Block::footer("shared", BlockSettings::default())),
        )]);
        lib
    }

    #[test]
    fn test_depth_zero_leaves_ids() {
        let lib = library();
        let page = lib.page_at_depth(&lib.pages[&DocumentId::from("p1")], 0);
        assert!(!page.content[0].as_reference().unwrap().block.is_populated());
    }

    #[test]
    fn test_variant_depth_two_populates_page_blocks() {
        let lib = library();
        let variant = lib.variant_at_depth(&lib.variants[&DocumentId::from("v1")], 2);

        let overrides = variant.content_override.as_ref().unwrap();
        assert!(overrides[0].as_reference().unwrap().block.is_populated());

        let page = variant.page.populated().unwrap();
        assert!(page.content[0].as_reference().unwrap().block.is_populated());
    }

    #[test]
    fn test_experiment_depth_one_inlines_variants_only() {
        let lib = library();
        let exp = Experiment::new(
            "e1",
            "Test",
            "p1",
            ExperimentStatus::Running,
            vec![ExperimentVariantEntry::new("v1", 50), ExperimentVariantEntry::new("missing", 50)],
        );
        let exp = lib.experiment_at_depth(&exp, 1);

        let v1 = exp.variants[0].variant.populated().unwrap();
        assert!(!v1.page.is_populated());
        assert!(!exp.variants[1].variant.is_populated());
        assert!(exp.page.is_populated());
    }

    #[test]
    fn test_strip_and_collect_refs() {
        let lib = library();
        let mut page = lib.page_at_depth(&lib.pages[&DocumentId::from("p1")], 1);
        assert_eq!(
            referenced_block_ids(&page.content),
            BTreeSet::from([DocumentId::from("R1")])
        );
        strip_page(&mut page);
        assert_eq!(page, lib.pages[&DocumentId::from("p1")]);
    }
}
