//! Domain types shared by every search backend.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Stable document identity, assigned as an ordinal when the corpus is built.
pub type DocId = u64;

/// Engine-agnostic document payload (everything except the vectors).
pub type Payload = Map<String, Value>;

/// A single corpus entry handed to backends for ingestion.
///
/// - `id`: ordinal identity, identical across every backend
/// - `fields`: payload attributes indexed for lexical search
/// - `embedding`: pre-computed dense vector
/// - `sparse`: optional pre-computed sparse vector for engines that
///   score lexical matches against a sparse index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub fields: Payload,
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sparse: Option<SparseVector>,
}

/// Sparse vector in coordinate form. `indices` are unique and ascending,
/// `values` is parallel to `indices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<u32>,
    pub values: Vec<f32>,
}

/// Field types a backend must be able to map onto its own schema language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Keyword,
    Integer,
    Float,
}

/// Distance function for the dense vector space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSchema {
    pub dim: usize,
    pub distance: Distance,
}

/// Engine-agnostic index definition. Backends translate this into their
/// native mapping or collection config at `create_index` time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSchema {
    pub fields: BTreeMap<String, FieldKind>,
    pub vector: VectorSchema,
}

impl IndexSchema {
    /// The product-catalog schema used by the stock workloads.
    pub fn product_catalog(dim: usize, distance: Distance) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), FieldKind::Text);
        fields.insert("description".to_string(), FieldKind::Text);
        fields.insert("category".to_string(), FieldKind::Keyword);
        fields.insert("brand".to_string(), FieldKind::Keyword);
        fields.insert("rating_number".to_string(), FieldKind::Integer);
        fields.insert("average_rating".to_string(), FieldKind::Float);
        fields.insert("price".to_string(), FieldKind::Float);
        Self {
            fields,
            vector: VectorSchema { dim, distance },
        }
    }

    /// Names of the full-text fields, sorted by name. These are the
    /// fields lexical queries match against.
    pub fn text_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|(_, kind)| **kind == FieldKind::Text)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// The minimal surface returned by all backends.
///
/// `id` matches `Document::id`. `score` is engine-specific but higher is
/// always better. `payload` carries the stored attributes, never the vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocId,
    pub score: f32,
    pub payload: Payload,
}
