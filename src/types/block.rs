//! Block types: the tagged content units pages are built from.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::id::{DocumentId, Relation};
use super::page::ReusableBlockDocument;

/// Shared settings carried by every block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSettings {
    /// Stable 12-character identifier used for analytics and variant targeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    /// Human-readable label for analytics dashboards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_label: Option<String>,
}

impl BlockSettings {
    /// Settings with an explicit block id.
    pub fn with_block_id(block_id: impl Into<String>) -> Self {
        Self {
            block_id: Some(block_id.into()),
            analytics_label: None,
        }
    }

    /// Set the analytics label.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.analytics_label = Some(label.into());
        self
    }

    /// Whether a non-empty block id is present.
    pub fn has_block_id(&self) -> bool {
        non_empty(&self.block_id).is_some()
    }

    /// Settings for a reusable block placed through a reference.
    ///
    /// The placement's `blockId` and `analyticsLabel` win over the source
    /// block's whenever they are non-empty.
    pub fn placed_by(&self, placement: &BlockSettings) -> BlockSettings {
        BlockSettings {
            block_id: non_empty(&placement.block_id)
                .or_else(|| non_empty(&self.block_id))
                .cloned(),
            analytics_label: non_empty(&placement.analytics_label)
                .or_else(|| non_empty(&self.analytics_label))
                .cloned(),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&String> {
    value.as_ref().filter(|s| !s.is_empty())
}

/// Page section a block can be placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    /// The hero section (at most one block).
    Hero,
    /// The main content section.
    Content,
    /// The footer section.
    Footer,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hero => write!(f, "hero"),
            Self::Content => write!(f, "content"),
            Self::Footer => write!(f, "footer"),
        }
    }
}

/// Discriminant of a [`Block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockType {
    /// `heroBlock`
    #[serde(rename = "heroBlock")]
    Hero,
    /// `contentBlock`
    #[serde(rename = "contentBlock")]
    Content,
    /// `accordionBlock`
    #[serde(rename = "accordionBlock")]
    Accordion,
    /// `faqBlock`
    #[serde(rename = "faqBlock")]
    Faq,
    /// `statsBlock`
    #[serde(rename = "statsBlock")]
    Stats,
    /// `footerBlock`
    #[serde(rename = "footerBlock")]
    Footer,
    /// `reusableBlockRef`
    #[serde(rename = "reusableBlockRef")]
    ReusableBlockRef,
}

impl BlockType {
    /// Every block type, in registry order.
    pub const ALL: [BlockType; 7] = [
        Self::Accordion,
        Self::Content,
        Self::Faq,
        Self::Footer,
        Self::Hero,
        Self::ReusableBlockRef,
        Self::Stats,
    ];

    /// Wire slug of the block type.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Hero => "heroBlock",
            Self::Content => "contentBlock",
            Self::Accordion => "accordionBlock",
            Self::Faq => "faqBlock",
            Self::Stats => "statsBlock",
            Self::Footer => "footerBlock",
            Self::ReusableBlockRef => "reusableBlockRef",
        }
    }

    /// Parse a block type from its slug.
    pub fn from_slug(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.slug() == s)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Call to action on a hero block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToAction {
    /// Button label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_text: Option<String>,
    /// Button URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_link: Option<String>,
}

/// Hero block with headline, subheadline, CTA, and optional media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroBlock {
    /// Headline (required, max 100 characters in the admin schema).
    pub headline: String,
    /// Optional subheadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheadline: Option<String>,
    /// Optional call to action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<CallToAction>,
    /// Upload reference, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Value>,
    /// Block settings.
    #[serde(default)]
    pub settings: BlockSettings,
}

/// Rich text content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    /// Rich text document, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Block settings.
    #[serde(default)]
    pub settings: BlockSettings,
}

/// One collapsible accordion item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccordionItem {
    /// Item title.
    pub title: String,
    /// Rich text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

/// Accordion block with collapsible items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccordionBlock {
    /// Items (max 20 in the admin schema).
    #[serde(default)]
    pub items: Vec<AccordionItem>,
    /// Block settings.
    #[serde(default)]
    pub settings: BlockSettings,
}

/// One question/answer pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqItem {
    /// The question.
    pub question: String,
    /// Rich text answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
}

/// FAQ block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqBlock {
    /// Items (max 30 in the admin schema).
    #[serde(default)]
    pub items: Vec<FaqItem>,
    /// Block settings.
    #[serde(default)]
    pub settings: BlockSettings,
}

/// One stat value/label pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatItem {
    /// Displayed value, e.g. "99.9%".
    pub value: String,
    /// Label under the value.
    pub label: String,
    /// Optional icon name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Stats block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsBlock {
    /// Items (max 12 in the admin schema).
    #[serde(default)]
    pub items: Vec<StatItem>,
    /// Block settings.
    #[serde(default)]
    pub settings: BlockSettings,
}

/// Footer block with simple text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FooterBlock {
    /// Footer text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Block settings.
    #[serde(default)]
    pub settings: BlockSettings,
}

/// Reference to a reusable block document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReusableBlockRef {
    /// The referenced reusable block, populated or not.
    pub block: Relation<ReusableBlockDocument>,
    /// Settings of this placement.
    #[serde(default)]
    pub settings: BlockSettings,
}

/// A content block, discriminated by `blockType`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "blockType")]
pub enum Block {
    /// Hero block.
    #[serde(rename = "heroBlock")]
    Hero(HeroBlock),
    /// Rich text block.
    #[serde(rename = "contentBlock")]
    Content(ContentBlock),
    /// Accordion block.
    #[serde(rename = "accordionBlock")]
    Accordion(AccordionBlock),
    /// FAQ block.
    #[serde(rename = "faqBlock")]
    Faq(FaqBlock),
    /// Stats block.
    #[serde(rename = "statsBlock")]
    Stats(StatsBlock),
    /// Footer block.
    #[serde(rename = "footerBlock")]
    Footer(FooterBlock),
    /// Reference to a reusable block.
    #[serde(rename = "reusableBlockRef")]
    ReusableBlockRef(ReusableBlockRef),
}

impl Block {
    /// The block's discriminant.
    pub fn block_type(&self) -> BlockType {
        match self {
            Self::Hero(_) => BlockType::Hero,
            Self::Content(_) => BlockType::Content,
            Self::Accordion(_) => BlockType::Accordion,
            Self::Faq(_) => BlockType::Faq,
            Self::Stats(_) => BlockType::Stats,
            Self::Footer(_) => BlockType::Footer,
            Self::ReusableBlockRef(_) => BlockType::ReusableBlockRef,
        }
    }

    /// Shared settings.
    pub fn settings(&self) -> &BlockSettings {
        match self {
            Self::Hero(b) => &b.settings,
            Self::Content(b) => &b.settings,
            Self::Accordion(b) => &b.settings,
            Self::Faq(b) => &b.settings,
            Self::Stats(b) => &b.settings,
            Self::Footer(b) => &b.settings,
            Self::ReusableBlockRef(b) => &b.settings,
        }
    }

    /// Mutable shared settings.
    pub fn settings_mut(&mut self) -> &mut BlockSettings {
        match self {
            Self::Hero(b) => &mut b.settings,
            Self::Content(b) => &mut b.settings,
            Self::Accordion(b) => &mut b.settings,
            Self::Faq(b) => &mut b.settings,
            Self::Stats(b) => &mut b.settings,
            Self::Footer(b) => &mut b.settings,
            Self::ReusableBlockRef(b) => &mut b.settings,
        }
    }

    /// Replace the settings, returning the block.
    pub fn with_settings(mut self, settings: BlockSettings) -> Self {
        *self.settings_mut() = settings;
        self
    }

    /// The reference payload when this is a `reusableBlockRef`.
    pub fn as_reference(&self) -> Option<&ReusableBlockRef> {
        match self {
            Self::ReusableBlockRef(r) => Some(r),
            _ => None,
        }
    }

    /// Shorthand for a rich text block.
    pub fn content(body: Value, settings: BlockSettings) -> Self {
        Self::Content(ContentBlock {
            body: Some(body),
            settings,
        })
    }

    /// Shorthand for a hero block.
    pub fn hero(headline: impl Into<String>, settings: BlockSettings) -> Self {
        Self::Hero(HeroBlock {
            headline: headline.into(),
            subheadline: None,
            cta: None,
            media: None,
            settings,
        })
    }

    /// Shorthand for a footer block.
    pub fn footer(text: impl Into<String>, settings: BlockSettings) -> Self {
        Self::Footer(FooterBlock {
            text: Some(text.into()),
            settings,
        })
    }

    /// Shorthand for a reference to a reusable block.
    pub fn reference(block: Relation<ReusableBlockDocument>, settings: BlockSettings) -> Self {
        Self::ReusableBlockRef(ReusableBlockRef { block, settings })
    }
}

/// A block after reference resolution.
///
/// Serializes as the block itself plus `_resolvedFrom` when it came from a
/// reusable block document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBlock {
    /// The concrete block (or an unresolved reference left in place).
    #[serde(flatten)]
    pub block: Block,
    /// Id of the reusable block this was resolved from.
    #[serde(
        rename = "_resolvedFrom",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub resolved_from: Option<DocumentId>,
}

impl ResolvedBlock {
    /// Wrap a block that was not resolved from anything.
    pub fn inline(block: Block) -> Self {
        Self {
            block,
            resolved_from: None,
        }
    }

    /// The block's discriminant.
    pub fn block_type(&self) -> BlockType {
        self.block.block_type()
    }

    /// Shared settings.
    pub fn settings(&self) -> &BlockSettings {
        self.block.settings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_block_type_slug_roundtrip() {
        for block_type in BlockType::ALL {
            assert_eq!(BlockType::from_slug(block_type.slug()), Some(block_type));
        }
        assert_eq!(BlockType::from_slug("carouselBlock"), None);
    }

    #[test]
    fn test_block_deserializes_by_discriminant() {
        let block: Block = serde_json::from_value(json!({
            "blockType": "statsBlock",
            "items": [{ "value": "99%", "label": "Uptime" }],
            "settings": { "blockId": "abcdefghijkl" }
        }))
        .unwrap();

        assert_eq!(block.block_type(), BlockType::Stats);
        assert_eq!(block.settings().block_id.as_deref(), Some("abcdefghijkl"));
    }

    #[test]
    fn test_unpopulated_reference_deserializes_as_id() {
        let block: Block = serde_json::from_value(json!({
            "blockType": "reusableBlockRef",
            "block": "R1",
        }))
        .unwrap();

        let reference = block.as_reference().unwrap();
        assert!(!reference.block.is_populated());
        assert_eq!(reference.block.id().as_str(), "R1");
        assert_eq!(reference.settings, BlockSettings::default());
    }

    #[test]
    fn test_resolved_block_serializes_flat() {
        let resolved = ResolvedBlock {
            block: Block::footer("bye", BlockSettings::with_block_id("f1")),
            resolved_from: Some(DocumentId::from("R9")),
        };
        let value = serde_json::to_value(&resolved).unwrap();
        assert_eq!(value["blockType"], "footerBlock");
        assert_eq!(value["text"], "bye");
        assert_eq!(value["_resolvedFrom"], "R9");
        assert_eq!(value["settings"]["blockId"], "f1");

        let back: ResolvedBlock = serde_json::from_value(value).unwrap();
        assert_eq!(back, resolved);
    }

    #[test]
    fn test_placement_settings_win() {
        let source = BlockSettings::with_block_id("source-id").labeled("Source");
        let placement = BlockSettings::with_block_id("placement").labeled("Placed");
        assert_eq!(source.placed_by(&placement), placement);
    }

    #[test]
    fn test_source_settings_fill_gaps() {
        let source = BlockSettings::with_block_id("source-id").labeled("Source");
        let placement = BlockSettings {
            block_id: Some(String::new()),
            analytics_label: None,
        };
        assert_eq!(source.placed_by(&placement), source);
    }

    proptest::proptest! {
        #[test]
        fn prop_placement_precedence(
            source_id in proptest::option::of("[a-z]{0,4}"),
            placed_id in proptest::option::of("[a-z]{0,4}"),
        ) {
            let source = BlockSettings { block_id: source_id.clone(), analytics_label: None };
            let placement = BlockSettings { block_id: placed_id.clone(), analytics_label: None };
            let merged = source.placed_by(&placement);

            let expected = placed_id
                .filter(|s| !s.is_empty())
                .or(source_id.filter(|s| !s.is_empty()));
            proptest::prop_assert_eq!(merged.block_id, expected);
        }
    }
}
