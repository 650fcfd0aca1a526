//! Machine-readable block catalog.
//!
//! The catalog is generated from [`BLOCK_REGISTRY`](super::BLOCK_REGISTRY)
//! and checked into the repository as JSON. [`check_drift`] compares a
//! stored copy with the live registry so a forgotten regeneration is caught.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{FieldSpec, BLOCK_REGISTRY};
use crate::canonical::canonical_hash_hex;
use crate::types::Section;

/// Catalog format version.
pub const CATALOG_VERSION: &str = "1.0.0";

/// One field of a block, as published in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSchemaField {
    /// Field name.
    pub name: String,
    /// Field kind (`text`, `richText`, `array`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Editor label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Present and `true` only for required fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    /// Nested fields of arrays and groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_fields: Option<Vec<BlockSchemaField>>,
    /// Target collection of relationships and uploads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_to: Option<String>,
}

impl From<&FieldSpec> for BlockSchemaField {
    fn from(spec: &FieldSpec) -> Self {
        let nested: Vec<BlockSchemaField> = spec.fields.iter().map(Self::from).collect();
        Self {
            name: spec.name.to_string(),
            kind: spec.kind.as_str().to_string(),
            label: spec.label.map(str::to_string),
            required: spec.required.then_some(true),
            nested_fields: (!nested.is_empty()).then_some(nested),
            relation_to: spec.relation_to.map(str::to_string),
        }
    }
}

/// One block type, as published in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSchema {
    /// Block slug.
    pub slug: String,
    /// Sections the block may be placed in.
    pub allowed_sections: Vec<Section>,
    /// Editable fields. The shared settings group is not listed.
    pub fields: Vec<BlockSchemaField>,
    /// Human-readable name.
    pub label: String,
}

/// The complete catalog document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockCatalog {
    /// Every block type, sorted by slug.
    pub blocks: Vec<BlockSchema>,
    /// Generation time.
    pub generated_at: DateTime<Utc>,
    /// Catalog format version.
    pub version: String,
}

impl BlockCatalog {
    /// Fingerprint of the block definitions, ignoring the generation time.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        canonical_hash_hex(&self.blocks)
    }
}

/// Build the catalog from the live registry.
pub fn generate_catalog() -> BlockCatalog {
    let mut blocks: Vec<BlockSchema> = BLOCK_REGISTRY
        .iter()
        .map(|entry| BlockSchema {
            slug: entry.slug().to_string(),
            allowed_sections: entry.allowed_sections.to_vec(),
            fields: entry.fields.iter().map(BlockSchemaField::from).collect(),
            label: entry.label.to_string(),
        })
        .collect();
    blocks.sort_by(|a, b| a.slug.cmp(&b.slug));

    BlockCatalog {
        blocks,
        generated_at: Utc::now(),
        version: CATALOG_VERSION.to_string(),
    }
}

/// Ways a stored catalog can disagree with the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogDrift {
    /// Block definitions differ.
    #[error("Block definitions changed (stored {stored}, live {live}); regenerate the catalog")]
    BlocksChanged {
        /// Fingerprint of the stored blocks.
        stored: String,
        /// Fingerprint of the live blocks.
        live: String,
    },

    /// Version string differs.
    #[error("Catalog version mismatch (stored {stored}, live {live})")]
    VersionChanged {
        /// Stored version.
        stored: String,
        /// Live version.
        live: String,
    },

    /// A catalog could not be fingerprinted.
    #[error("Catalog serialization failed: {0}")]
    Serialization(String),
}

/// Compare a stored catalog with the live registry.
pub fn check_drift(stored: &BlockCatalog) -> Result<(), CatalogDrift> {
    let live = generate_catalog();

    let stored_fp = stored
        .fingerprint()
        .map_err(|e| CatalogDrift::Serialization(e.to_string()))?;
    let live_fp = live
        .fingerprint()
        .map_err(|e| CatalogDrift::Serialization(e.to_string()))?;

    if stored_fp != live_fp {
        return Err(CatalogDrift::BlocksChanged {
            stored: stored_fp,
            live: live_fp,
        });
    }

    if stored.version != live.version {
        return Err(CatalogDrift::VersionChanged {
            stored: stored.version.clone(),
            live: live.version,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        let catalog = generate_catalog();
        assert_eq!(catalog.version, CATALOG_VERSION);
        assert_eq!(catalog.blocks.len(), 7);

        let slugs: Vec<&str> = catalog.blocks.iter().map(|b| b.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec![
                "accordionBlock",
                "contentBlock",
                "faqBlock",
                "footerBlock",
                "heroBlock",
                "reusableBlockRef",
                "statsBlock",
            ]
        );

        for block in &catalog.blocks {
            assert!(block.fields.iter().all(|f| f.name != "settings"));
        }
    }

    #[test]
    fn test_hero_json() {
        let catalog = generate_catalog();
        let json = serde_json::to_value(&catalog).unwrap();
        let hero = &json["blocks"][4];

        assert_eq!(hero["slug"], "heroBlock");
        assert_eq!(hero["label"], "Hero Block");
        assert_eq!(hero["allowedSections"], serde_json::json!(["hero"]));
        assert_eq!(hero["fields"][0]["name"], "headline");
        assert_eq!(hero["fields"][0]["required"], true);
        assert!(hero["fields"][1].get("required").is_none());
        assert_eq!(hero["fields"][2]["nestedFields"][0]["label"], "Button Label");
        assert_eq!(hero["fields"][3]["type"], "upload");
        assert_eq!(hero["fields"][3]["relationTo"], "media");
        assert!(json["generatedAt"].is_string());
    }

    #[test]
    fn test_fresh_catalog_has_no_drift() {
        let stored = generate_catalog();
        let text = serde_json::to_string_pretty(&stored).unwrap();
        let reloaded: BlockCatalog = serde_json::from_str(&text).unwrap();
        assert_eq!(check_drift(&reloaded), Ok(()));
    }

    #[test]
    fn test_drift_detected() {
        let mut stored = generate_catalog();
        stored.blocks[0].label = "Accordion".to_string();
        assert!(matches!(check_drift(&stored), Err(CatalogDrift::BlocksChanged { .. })));

        let mut stored = generate_catalog();
        stored.version = "0.9.0".to_string();
        assert!(matches!(check_drift(&stored), Err(CatalogDrift::VersionChanged { .. })));
    }
}
