//! Reusable-block reference resolution.

use crate::types::{Block, Page, ResolvedBlock, ResolvedPage};

/// What happened to one block during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStep {
    /// Inline block, passed through.
    Inline,
    /// Reference replaced by the reusable block's content.
    Resolved,
    /// Reference left in place because its target was not populated.
    Unpopulated,
    /// Reference dropped because its target holds no block.
    Dropped,
}

/// Counters for one resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionSummary {
    /// Inline blocks passed through.
    pub inline: usize,
    /// References replaced.
    pub resolved: usize,
    /// Unpopulated references kept.
    pub unpopulated: usize,
    /// Empty references omitted.
    pub dropped: usize,
}

impl ResolutionSummary {
    fn record(&mut self, step: ResolutionStep) {
        match step {
            ResolutionStep::Inline => self.inline += 1,
            ResolutionStep::Resolved => self.resolved += 1,
            ResolutionStep::Unpopulated => self.unpopulated += 1,
            ResolutionStep::Dropped => self.dropped += 1,
        }
    }
}

/// Resolve a single block.
///
/// Returns `None` when the block contributes nothing (a populated reference to
/// a reusable block with an empty block list).
pub fn resolve_block(block: &Block) -> (Option<ResolvedBlock>, ResolutionStep) {
    let reference = match block {
        Block::ReusableBlockRef(reference) => reference,
        Block::Hero(_)
        | Block::Content(_)
        | Block::Accordion(_)
        | Block::Faq(_)
        | Block::Stats(_)
        | Block::Footer(_) => {
            return (Some(ResolvedBlock::inline(block.clone())), ResolutionStep::Inline);
        }
    };

    let Some(reusable) = reference.block.populated() else {
        return (Some(ResolvedBlock::inline(block.clone())), ResolutionStep::Unpopulated);
    };

    let Some(source) = reusable.block.first() else {
        return (None, ResolutionStep::Dropped);
    };

    let settings = source.settings().placed_by(&reference.settings);
    let resolved = ResolvedBlock {
        block: source.clone().with_settings(settings),
        resolved_from: Some(reusable.id.clone()),
    };
    (Some(resolved), ResolutionStep::Resolved)
}

/// Resolve every block of a list, preserving order.
pub fn resolve_blocks(blocks: &[Block]) -> (Vec<ResolvedBlock>, ResolutionSummary) {
    let mut summary = ResolutionSummary::default();
    let mut resolved = Vec::with_capacity(blocks.len());

    for block in blocks {
        let (out, step) = resolve_block(block);
        summary.record(step);
        resolved.extend(out);
    }

    (resolved, summary)
}

/// Resolve a block list into the page-level content representation.
///
/// An empty result becomes `None`, the explicit "no content" marker.
pub fn resolve_content(blocks: &[Block]) -> Option<Vec<ResolvedBlock>> {
    let (resolved, summary) = resolve_blocks(blocks);
    tracing::trace!(
        inline = summary.inline,
        resolved = summary.resolved,
        unpopulated = summary.unpopulated,
        dropped = summary.dropped,
        "Resolved block list"
    );
    if resolved.is_empty() {
        None
    } else {
        Some(resolved)
    }
}

/// Resolve a page's content references.
///
/// Hero and footer pass through; the input page is not modified.
pub fn resolve_page(page: &Page) -> ResolvedPage {
    ResolvedPage {
        id: page.id.clone(),
        slug: page.slug.clone(),
        title: page.title.clone(),
        hero: page.hero.clone(),
        content: resolve_content(&page.content),
        footer: page.footer.clone(),
    }
}
