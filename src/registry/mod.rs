//! Block registry.
//!
//! A static table describing every block type: its label, the page sections
//! it may be placed in, and its editable fields. The registry backs section
//! checks on page writes and the generated block catalog.

pub mod catalog;

pub use catalog::{check_drift, generate_catalog, BlockCatalog, BlockSchema, BlockSchemaField, CatalogDrift, CATALOG_VERSION};

use serde::{Deserialize, Serialize};

use crate::types::{BlockType, Section};

/// Field kinds understood by block editors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    /// Single-line text.
    Text,
    /// Multi-line plain text.
    Textarea,
    /// Rich text document.
    RichText,
    /// Repeated group of nested fields.
    Array,
    /// Fixed group of nested fields.
    Group,
    /// Reference to another collection.
    Relationship,
    /// Reference to an uploaded asset.
    Upload,
}

impl FieldKind {
    /// Wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::RichText => "richText",
            Self::Array => "array",
            Self::Group => "group",
            Self::Relationship => "relationship",
            Self::Upload => "upload",
        }
    }
}

/// Static description of one block field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Field name in the block document.
    pub name: &'static str,
    /// Field kind.
    pub kind: FieldKind,
    /// Editor label, when it differs from the name.
    pub label: Option<&'static str>,
    /// Whether the field must be filled.
    pub required: bool,
    /// Nested fields of arrays and groups.
    pub fields: &'static [FieldSpec],
    /// Target collection of relationships and uploads.
    pub relation_to: Option<&'static str>,
}

impl FieldSpec {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            label: None,
            required: false,
            fields: &[],
            relation_to: None,
        }
    }

    const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    const fn nested(mut self, fields: &'static [FieldSpec]) -> Self {
        self.fields = fields;
        self
    }

    const fn relation(mut self, collection: &'static str) -> Self {
        self.relation_to = Some(collection);
        self
    }
}

/// One registered block type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRegistryEntry {
    /// The block type.
    pub block_type: BlockType,
    /// Human-readable name.
    pub label: &'static str,
    /// Sections the block may appear in.
    pub allowed_sections: &'static [Section],
    /// Editable fields, excluding the shared settings group.
    pub fields: &'static [FieldSpec],
}

impl BlockRegistryEntry {
    /// Wire slug of the block type.
    pub fn slug(&self) -> &'static str {
        self.block_type.slug()
    }

    /// Whether the block may be placed in `section`.
    pub fn allows(&self, section: Section) -> bool {
        self.allowed_sections.contains(&section)
    }
}

use FieldKind::*;

const CTA_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("ctaText", Text).label("Button Label"),
    FieldSpec::new("ctaLink", Text).label("Button URL"),
];

const HERO_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("headline", Text).required(),
    FieldSpec::new("subheadline", Textarea),
    FieldSpec::new("cta", Group).label("Call to Action").nested(CTA_FIELDS),
    FieldSpec::new("media", Upload).relation("media"),
];

const CONTENT_FIELDS: &[FieldSpec] = &[FieldSpec::new("body", RichText)];

const ACCORDION_ITEM_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("title", Text).required(),
    FieldSpec::new("content", RichText),
];

const ACCORDION_FIELDS: &[FieldSpec] = &[FieldSpec::new("items", Array).nested(ACCORDION_ITEM_FIELDS)];

const FAQ_ITEM_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("question", Text).required(),
    FieldSpec::new("answer", RichText),
];

const FAQ_FIELDS: &[FieldSpec] = &[FieldSpec::new("items", Array).nested(FAQ_ITEM_FIELDS)];

const STAT_ITEM_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("value", Text).required(),
    FieldSpec::new("label", Text).required(),
    FieldSpec::new("icon", Text),
];

const STATS_FIELDS: &[FieldSpec] = &[FieldSpec::new("items", Array).nested(STAT_ITEM_FIELDS)];

const FOOTER_FIELDS: &[FieldSpec] = &[FieldSpec::new("text", Text)];

const REFERENCE_FIELDS: &[FieldSpec] = &[FieldSpec::new("block", Relationship)
    .required()
    .relation("reusable-blocks")];

/// Every block type, keyed by slug order.
pub static BLOCK_REGISTRY: [BlockRegistryEntry; 7] = [
    BlockRegistryEntry {
        block_type: BlockType::Accordion,
        label: "Accordion Block",
        allowed_sections: &[Section::Content],
        fields: ACCORDION_FIELDS,
    },
    BlockRegistryEntry {
        block_type: BlockType::Content,
        label: "Content Block",
        allowed_sections: &[Section::Content],
        fields: CONTENT_FIELDS,
    },
    BlockRegistryEntry {
        block_type: BlockType::Faq,
        label: "FAQ Block",
        allowed_sections: &[Section::Content],
        fields: FAQ_FIELDS,
    },
    BlockRegistryEntry {
        block_type: BlockType::Footer,
        label: "Footer Block",
        allowed_sections: &[Section::Footer],
        fields: FOOTER_FIELDS,
    },
    BlockRegistryEntry {
        block_type: BlockType::Hero,
        label: "Hero Block",
        allowed_sections: &[Section::Hero],
        fields: HERO_FIELDS,
    },
    BlockRegistryEntry {
        block_type: BlockType::ReusableBlockRef,
        label: "Reusable Block Reference",
        allowed_sections: &[Section::Content],
        fields: REFERENCE_FIELDS,
    },
    BlockRegistryEntry {
        block_type: BlockType::Stats,
        label: "Stats Block",
        allowed_sections: &[Section::Content],
        fields: STATS_FIELDS,
    },
];

/// Look up a block type's registry entry.
pub fn entry(block_type: BlockType) -> &'static BlockRegistryEntry {
    let index = match block_type {
        BlockType::Accordion => 0,
        BlockType::Content => 1,
        BlockType::Faq => 2,
        BlockType::Footer => 3,
        BlockType::Hero => 4,
        BlockType::ReusableBlockRef => 5,
        BlockType::Stats => 6,
    };
    &BLOCK_REGISTRY[index]
}

/// Block types allowed in a section, in registry order.
pub fn blocks_for_section(section: Section) -> Vec<BlockType> {
    BLOCK_REGISTRY
        .iter()
        .filter(|e| e.allows(section))
        .map(|e| e.block_type)
        .collect()
}

/// Whether a block type passes an experiment's allow-list.
///
/// An absent or empty allow-list allows everything.
pub fn is_block_allowed(block_type: BlockType, allowed: Option<&[BlockType]>) -> bool {
    match allowed {
        None | Some([]) => true,
        Some(list) => list.contains(&block_type),
    }
}

/// The block types an allow-list permits.
pub fn allowed_blocks(allowed: Option<&[BlockType]>) -> Vec<BlockType> {
    match allowed {
        None | Some([]) => BlockType::ALL.to_vec(),
        Some(list) => list.to_vec(),
    }
}
