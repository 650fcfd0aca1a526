//! Pages, page variants, reusable blocks and their resolved forms.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::block::{Block, ResolvedBlock, Section};
use super::id::{Document, DocumentId, Relation};

/// Category tag of a reusable block document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReusableCategory {
    /// Accordion.
    Accordion,
    /// Rich text content.
    Content,
    /// FAQ.
    Faq,
    /// Footer.
    Footer,
    /// Stats.
    Stats,
}

/// A named, reusable single-block container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReusableBlockDocument {
    /// Document id.
    pub id: DocumentId,
    /// Editor-facing title.
    pub title: String,
    /// Category tag.
    pub block_type: ReusableCategory,
    /// Exactly one block when valid; may be empty.
    #[serde(default)]
    pub block: Vec<Block>,
}

impl ReusableBlockDocument {
    /// Create a reusable block document holding a single block.
    pub fn new(
        id: impl Into<DocumentId>,
        title: impl Into<String>,
        block_type: ReusableCategory,
        block: Option<Block>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            block_type,
            block: block.into_iter().collect(),
        }
    }
}

impl Document for ReusableBlockDocument {
    fn id(&self) -> &DocumentId {
        &self.id
    }
}

/// A page document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Document id.
    pub id: DocumentId,
    /// Unique slug.
    pub slug: String,
    /// Page title.
    pub title: String,
    /// Hero section (0..1 blocks).
    #[serde(default)]
    pub hero: Vec<Block>,
    /// Content section.
    #[serde(default)]
    pub content: Vec<Block>,
    /// Footer section.
    #[serde(default)]
    pub footer: Vec<Block>,
}

impl Page {
    /// Create an empty page.
    pub fn new(id: impl Into<DocumentId>, slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            title: title.into(),
            hero: Vec::new(),
            content: Vec::new(),
            footer: Vec::new(),
        }
    }

    /// All three sections with their names.
    pub fn sections(&self) -> [(Section, &Vec<Block>); 3] {
        [
            (Section::Hero, &self.hero),
            (Section::Content, &self.content),
            (Section::Footer, &self.footer),
        ]
    }

    /// All three sections, mutably.
    pub fn sections_mut(&mut self) -> [&mut Vec<Block>; 3] {
        [&mut self.hero, &mut self.content, &mut self.footer]
    }
}

impl Document for Page {
    fn id(&self) -> &DocumentId {
        &self.id
    }
}

/// Lifecycle status of a page variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantStatus {
    /// Being edited.
    #[default]
    Draft,
    /// Available to experiments.
    Active,
    /// Retired.
    Archived,
}

impl fmt::Display for VariantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

/// An alternate version of a page's sections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageVariant {
    /// Document id.
    pub id: DocumentId,
    /// Variant name.
    pub name: String,
    /// The page this variant belongs to.
    pub page: Relation<Page>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: VariantStatus,
    /// Replacement hero section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_override: Option<Vec<Block>>,
    /// Replacement content section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_override: Option<Vec<Block>>,
    /// Replacement footer section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer_override: Option<Vec<Block>>,
}

impl PageVariant {
    /// Create a variant with no overrides.
    pub fn new(id: impl Into<DocumentId>, name: impl Into<String>, page: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            page: Relation::Id(page.into()),
            status: VariantStatus::default(),
            hero_override: None,
            content_override: None,
            footer_override: None,
        }
    }

    /// Id of the owning page.
    pub fn page_id(&self) -> &DocumentId {
        self.page.id()
    }

    /// Every override list that is present.
    pub fn overrides_mut(&mut self) -> impl Iterator<Item = &mut Vec<Block>> {
        [
            self.hero_override.as_mut(),
            self.content_override.as_mut(),
            self.footer_override.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}

impl Document for PageVariant {
    fn id(&self) -> &DocumentId {
        &self.id
    }
}

/// A page whose content references have been resolved.
///
/// `content` is `None` when nothing renderable remains, so absent and empty
/// content are treated the same downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPage {
    /// Page id.
    pub id: DocumentId,
    /// Page slug.
    pub slug: String,
    /// Page title.
    pub title: String,
    /// Hero section.
    pub hero: Vec<Block>,
    /// Resolved content, or `None` for "no content".
    pub content: Option<Vec<ResolvedBlock>>,
    /// Footer section.
    pub footer: Vec<Block>,
}

/// Variant attribution attached to a composed page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMeta {
    /// Variant id.
    pub id: DocumentId,
    /// Variant name.
    pub name: String,
}

/// A resolved page with a variant's overrides applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPageWithVariant {
    /// The composed page.
    #[serde(flatten)]
    pub page: ResolvedPage,
    /// Which variant was applied.
    #[serde(rename = "_variant")]
    pub variant: VariantMeta,
}
