//! Document identifiers and relationship references.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// URL-safe alphabet used for generated block and visitor ids.
const URL_SAFE_ALPHABET: &[u8; 64] =
    b"useandom-26T198340PX75pxJACKVERYMINDBUSHWOLF_GQZbfghjklqvwyzrict";

/// Identifier of a document owned by the external store.
///
/// Ordered so store backends can keep documents in a `BTreeMap`. Stores with
/// integer keys send numbers; those are read as their decimal string, so
/// `42` and `"42"` name the same document. Ids always serialize as strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => Self(id),
            RawId::Unsigned(id) => Self(id.to_string()),
            RawId::Signed(id) => Self(id.to_string()),
        })
    }
}

impl DocumentId {
    /// Create a document id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A document addressable by id.
pub trait Document {
    /// The document's id.
    fn id(&self) -> &DocumentId;
}

/// A reference to another document.
///
/// The store decides how deep relationships are populated: at depth 0 a
/// reference is a bare id, above that it carries the fetched document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Relation<T> {
    /// Unpopulated reference.
    Id(DocumentId),
    /// Populated reference.
    Populated(Box<T>),
}

impl<T: Document> Relation<T> {
    /// Id of the referenced document, populated or not.
    pub fn id(&self) -> &DocumentId {
        match self {
            Self::Id(id) => id,
            Self::Populated(doc) => doc.id(),
        }
    }

    /// The referenced document when populated.
    pub fn populated(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Populated(doc) => Some(doc),
        }
    }

    /// Whether the reference carries the fetched document.
    pub fn is_populated(&self) -> bool {
        matches!(self, Self::Populated(_))
    }

    /// Replace the reference with an unpopulated one pointing at the same id.
    pub fn to_unpopulated(&self) -> Self {
        Self::Id(self.id().clone())
    }
}

impl<T> From<DocumentId> for Relation<T> {
    fn from(id: DocumentId) -> Self {
        Self::Id(id)
    }
}

/// Generate a random id over the nanoid URL-safe alphabet.
pub fn random_url_safe_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| URL_SAFE_ALPHABET[rng.gen_range(0..URL_SAFE_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Doc {
        id: DocumentId,
        title: String,
    }

    impl Document for Doc {
        fn id(&self) -> &DocumentId {
            &self.id
        }
    }

    #[test]
    fn test_relation_deserializes_bare_id() {
        let rel: Relation<Doc> = serde_json::from_str("\"doc-1\"").unwrap();
        assert!(!rel.is_populated());
        assert_eq!(rel.id().as_str(), "doc-1");
    }

    #[test]
    fn test_relation_deserializes_populated_document() {
        let rel: Relation<Doc> =
            serde_json::from_str(r#"{"id":"doc-2","title":"Hello"}"#).unwrap();
        assert!(rel.is_populated());
        assert_eq!(rel.id().as_str(), "doc-2");
        assert_eq!(rel.populated().unwrap().title, "Hello");
        assert_eq!(rel.to_unpopulated(), Relation::Id(DocumentId::from("doc-2")));
    }

    #[test]
    fn test_numeric_ids_read_as_strings() {
        let id: DocumentId = serde_json::from_str("42").unwrap();
        assert_eq!(id, DocumentId::from("42"));
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");

        let rel: Relation<Doc> = serde_json::from_str("7").unwrap();
        assert_eq!(rel, Relation::Id(DocumentId::from("7")));

        let doc: Doc = serde_json::from_str(r#"{"id":-3,"title":"Signed"}"#).unwrap();
        assert_eq!(doc.id.as_str(), "-3");

        assert!(serde_json::from_str::<DocumentId>("1.5").is_err());
        assert!(serde_json::from_str::<DocumentId>("null").is_err());
    }

    #[test]
    fn test_random_id_shape() {
        let id = random_url_safe_id(12);
        assert_eq!(id.len(), 12);
        assert!(id.bytes().all(|b| URL_SAFE_ALPHABET.contains(&b)));
        assert_ne!(random_url_safe_id(21), random_url_safe_id(21));
    }
}
