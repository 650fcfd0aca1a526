//! Variant override composition.

use super::blocks::resolve_content;
use crate::types::{Block, PageVariant, ResolvedPage, ResolvedPageWithVariant, VariantMeta};

/// An override list that actually overrides: present and non-empty.
fn active_override(blocks: &Option<Vec<Block>>) -> Option<&[Block]> {
    blocks.as_deref().filter(|b| !b.is_empty())
}

/// Apply a variant's section overrides to a resolved page.
///
/// Each non-empty override replaces its whole section; there is no merging
/// with the base blocks. Content overrides go through reference resolution
/// first. Hero and footer overrides are applied as-is.
pub fn compose(page: ResolvedPage, variant: &PageVariant) -> ResolvedPageWithVariant {
    let mut page = page;

    if let Some(hero) = active_override(&variant.hero_override) {
        page.hero = hero.to_vec();
    }

    if let Some(content) = active_override(&variant.content_override) {
        page.content = resolve_content(content);
    }

    if let Some(footer) = active_override(&variant.footer_override) {
        page.footer = footer.to_vec();
    }

    ResolvedPageWithVariant {
        page,
        variant: VariantMeta {
            id: variant.id.clone(),
            name: variant.name.clone(),
        },
    }
}
