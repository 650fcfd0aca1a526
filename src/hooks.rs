//! Write-time document hooks.
//!
//! These run when documents enter a store: block ids are filled in on create
//! and carried over on update, page sections are checked against the block
//! registry, experiments are validated, and analytics records get their
//! timestamps. They are plain functions so every store backend applies the
//! same rules.

use chrono::Utc;

use crate::registry;
use crate::types::{
    random_url_safe_id, AnalyticsEvent, Block, BlockType, DocumentId, Experiment, ExperimentStatus, Lead, Page,
    PageVariant, ReusableBlockDocument, Section,
};

/// Length of generated block ids.
pub const BLOCK_ID_LENGTH: usize = 12;

/// Minimum number of arms an experiment needs.
pub const MIN_EXPERIMENT_VARIANTS: usize = 2;

/// Generate a fresh block id.
pub fn generate_block_id() -> String {
    random_url_safe_id(BLOCK_ID_LENGTH)
}

/// Fill in missing block ids. Existing ids are never replaced.
///
/// Returns the number of ids generated.
pub fn ensure_block_ids(blocks: &mut [Block]) -> usize {
    let mut generated = 0;
    for block in blocks.iter_mut() {
        let settings = block.settings_mut();
        if !settings.has_block_id() {
            settings.block_id = Some(generate_block_id());
            generated += 1;
        }
    }
    generated
}

/// Carry block ids over from the stored version of a section.
///
/// Nothing is generated here. A block without an id takes the id of the
/// stored block at the same position when both have the same type; anything
/// else is left as sent. Returns the number of ids carried over.
pub fn carry_block_ids(stored: &[Block], blocks: &mut [Block]) -> usize {
    let mut carried = 0;
    for (block, previous) in blocks.iter_mut().zip(stored) {
        if block.settings().has_block_id() || block.block_type() != previous.block_type() {
            continue;
        }
        if previous.settings().has_block_id() {
            block.settings_mut().block_id = previous.settings().block_id.clone();
            carried += 1;
        }
    }
    carried
}

/// Block ids for a page write. `stored` is the current version of the page,
/// `None` when the write creates it.
pub fn fill_page_block_ids(page: &mut Page, stored: Option<&Page>) -> usize {
    match stored {
        None => page.sections_mut().into_iter().map(|s| ensure_block_ids(s)).sum(),
        Some(stored) => page
            .sections_mut()
            .into_iter()
            .zip(stored.sections())
            .map(|(blocks, (_, previous))| carry_block_ids(previous, blocks))
            .sum(),
    }
}

/// Block ids for a variant write. Overrides are matched section by section.
pub fn fill_variant_block_ids(variant: &mut PageVariant, stored: Option<&PageVariant>) -> usize {
    match stored {
        None => variant.overrides_mut().map(|s| ensure_block_ids(s)).sum(),
        Some(stored) => [
            (&mut variant.hero_override, &stored.hero_override),
            (&mut variant.content_override, &stored.content_override),
            (&mut variant.footer_override, &stored.footer_override),
        ]
        .into_iter()
        .map(|(blocks, previous)| match (blocks, previous) {
            (Some(blocks), Some(previous)) => carry_block_ids(previous, blocks),
            _ => 0,
        })
        .sum(),
    }
}

/// Block ids for a reusable block write.
pub fn fill_reusable_block_ids(block: &mut ReusableBlockDocument, stored: Option<&ReusableBlockDocument>) -> usize {
    match stored {
        None => ensure_block_ids(&mut block.block),
        Some(stored) => carry_block_ids(&stored.block, &mut block.block),
    }
}

/// Most blocks the hero section may hold.
pub const MAX_HERO_BLOCKS: usize = 1;

/// Reasons a page's sections are refused at write time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SectionError {
    /// A block type placed in a section its registry entry does not allow.
    #[error("{block_type} is not allowed in the {section} section")]
    BlockNotAllowed {
        /// The offending block type.
        block_type: BlockType,
        /// Where it was placed.
        section: Section,
    },

    /// More hero blocks than the section holds.
    #[error("The hero section holds at most one block (got {count})")]
    TooManyHeroBlocks {
        /// Number of hero blocks sent.
        count: usize,
    },
}

/// Check every block against the registry's section rules.
pub fn validate_page_sections(page: &Page) -> Result<(), SectionError> {
    if page.hero.len() > MAX_HERO_BLOCKS {
        return Err(SectionError::TooManyHeroBlocks { count: page.hero.len() });
    }

    for (section, blocks) in page.sections() {
        if let Some(block) = blocks.iter().find(|b| !registry::entry(b.block_type()).allows(section)) {
            return Err(SectionError::BlockNotAllowed {
                block_type: block.block_type(),
                section,
            });
        }
    }

    Ok(())
}

/// Reasons an experiment is refused at write time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExperimentValidationError {
    /// Fewer than two arms.
    #[error("Experiment must have at least 2 variants")]
    TooFewVariants {
        /// Number of arms present.
        count: usize,
    },

    /// One arm's percentage is outside 0..=100.
    #[error("Traffic percentage for variant {variant_id} must be between 0 and 100 (got {percent})")]
    PercentOutOfRange {
        /// Offending arm.
        variant_id: DocumentId,
        /// Its percentage.
        percent: u32,
    },

    /// A running experiment does not split exactly 100% of traffic.
    #[error("Traffic percentages must sum to exactly 100% when running (currently {total}%)")]
    TrafficSumMismatch {
        /// The actual sum.
        total: u32,
    },

    /// An arm belongs to a different page than the experiment.
    #[error("All variants must belong to the same page as the experiment")]
    ForeignVariant {
        /// Offending arm.
        variant_id: DocumentId,
        /// The page that arm belongs to.
        variant_page: DocumentId,
    },
}

/// Validate an experiment before it is stored.
///
/// `variant_page` looks up the owning page of a variant given only by id.
/// Variants it does not know are skipped; populated variants are checked
/// directly.
pub fn validate_experiment<F>(experiment: &Experiment, variant_page: F) -> Result<(), ExperimentValidationError>
where
    F: Fn(&DocumentId) -> Option<DocumentId>,
{
    if experiment.variants.len() < MIN_EXPERIMENT_VARIANTS {
        return Err(ExperimentValidationError::TooFewVariants {
            count: experiment.variants.len(),
        });
    }

    if let Some(entry) = experiment.variants.iter().find(|e| e.traffic_percent > 100) {
        return Err(ExperimentValidationError::PercentOutOfRange {
            variant_id: entry.variant.id().clone(),
            percent: entry.traffic_percent,
        });
    }

    if experiment.status == ExperimentStatus::Running {
        let total = experiment.total_traffic();
        if total != 100 {
            return Err(ExperimentValidationError::TrafficSumMismatch { total });
        }
    }

    let page_id = experiment.page_id();
    for entry in &experiment.variants {
        let owner = match entry.variant.populated() {
            Some(variant) => Some(variant.page_id().clone()),
            None => variant_page(entry.variant.id()),
        };
        if let Some(owner) = owner {
            if &owner != page_id {
                return Err(ExperimentValidationError::ForeignVariant {
                    variant_id: entry.variant.id().clone(),
                    variant_page: owner,
                });
            }
        }
    }

    Ok(())
}

/// Set an event's timestamp if the caller did not.
pub fn stamp_event(event: &mut AnalyticsEvent) {
    if event.timestamp.is_none() {
        event.timestamp = Some(Utc::now());
    }
}

/// Set a lead's conversion time if the caller did not.
pub fn stamp_lead(lead: &mut Lead) {
    if lead.converted_at.is_none() {
        lead.converted_at = Some(Utc::now());
    }
}
