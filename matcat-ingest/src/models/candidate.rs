//! Candidate entities proposed for ingestion
//!
//! A candidate carries the descriptive fields of a catalog entity plus
//! provenance (originating submission, project to link on commit). Candidates
//! are not canonical; they exist only between batch parsing and commit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Catalog entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Material,
    Manufacturer,
}

impl Default for EntityKind {
    fn default() -> Self {
        Self::Material
    }
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Material => "material",
            Self::Manufacturer => "manufacturer",
        }
    }
}

/// An entity proposed for ingestion, not yet canonical
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Material or manufacturer
    #[serde(default)]
    pub kind: EntityKind,

    /// Display name (required)
    pub name: String,

    /// Category (required for materials, e.g. "Flooring")
    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub subcategory: Option<String>,

    /// Manufacturer SKU / reference code
    #[serde(default)]
    pub reference_code: Option<String>,

    #[serde(default)]
    pub dimensions: Option<String>,

    /// Already-resolved manufacturer id, when the source knows it
    #[serde(default)]
    pub manufacturer_id: Option<Uuid>,

    /// Free-text manufacturer name, resolved case-insensitively at match time
    #[serde(default)]
    pub manufacturer_name: Option<String>,

    /// Manufacturer contact fields
    #[serde(default)]
    pub website: Option<String>,

    #[serde(default)]
    pub contact_email: Option<String>,

    #[serde(default)]
    pub contact_phone: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl Candidate {
    /// Validate required fields
    ///
    /// Materials require a non-blank name and category; manufacturers require
    /// a non-blank name. Returns the reason a candidate is rejected.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("missing required field: name".to_string());
        }
        if self.kind == EntityKind::Material {
            match &self.category {
                Some(category) if !category.trim().is_empty() => {}
                _ => return Err("missing required field: category".to_string()),
            }
        }
        Ok(())
    }
}

/// Inbound candidate batch shape
///
/// Accepts either a flat ordered list or the nested per-manufacturer-key
/// shape `{ "<manufacturerName>": [candidate, ...], ... }`. The nested shape
/// is flattened at this boundary so matching and decision logic stay
/// shape-agnostic.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CandidateBatch {
    Flat(Vec<Candidate>),
    Grouped(BTreeMap<String, Vec<Candidate>>),
}

impl CandidateBatch {
    /// Flatten into an ordered candidate list
    ///
    /// For the grouped shape, `manufacturer_name` is back-filled from the key
    /// when the candidate does not already carry one. Group order follows the
    /// key order (sorted), entries keep their in-group order.
    pub fn flatten(self) -> Vec<Candidate> {
        match self {
            Self::Flat(candidates) => candidates,
            Self::Grouped(groups) => {
                let mut flat = Vec::new();
                for (manufacturer_name, candidates) in groups {
                    for mut candidate in candidates {
                        if candidate.manufacturer_name.is_none()
                            && !manufacturer_name.trim().is_empty()
                        {
                            candidate.manufacturer_name = Some(manufacturer_name.clone());
                        }
                        flat.push(candidate);
                    }
                }
                flat
            }
        }
    }
}

/// Split a flattened batch into valid candidates and a skipped count
///
/// Invalid candidates are rejected before entering a session; the batch
/// continues with the remaining valid candidates.
pub fn partition_valid(candidates: Vec<Candidate>) -> (Vec<Candidate>, usize) {
    let mut valid = Vec::with_capacity(candidates.len());
    let mut skipped = 0usize;

    for candidate in candidates {
        match candidate.validate() {
            Ok(()) => valid.push(candidate),
            Err(reason) => {
                skipped += 1;
                tracing::warn!(
                    name = %candidate.name,
                    reason = %reason,
                    "Skipping invalid candidate"
                );
            }
        }
    }

    (valid, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(name: &str, category: Option<&str>) -> Candidate {
        Candidate {
            kind: EntityKind::Material,
            name: name.to_string(),
            category: category.map(|c| c.to_string()),
            subcategory: None,
            reference_code: None,
            dimensions: None,
            manufacturer_id: None,
            manufacturer_name: None,
            website: None,
            contact_email: None,
            contact_phone: None,
            notes: None,
        }
    }

    #[test]
    fn material_requires_name_and_category() {
        assert!(material("Oak Veneer", Some("Wood")).validate().is_ok());
        assert!(material("", Some("Wood")).validate().is_err());
        assert!(material("Oak Veneer", None).validate().is_err());
        assert!(material("Oak Veneer", Some("  ")).validate().is_err());
    }

    #[test]
    fn manufacturer_requires_only_name() {
        let mut candidate = material("Premium Woods Co", None);
        candidate.kind = EntityKind::Manufacturer;
        assert!(candidate.validate().is_ok());
    }

    #[test]
    fn grouped_batch_backfills_manufacturer_name() {
        let json = r#"
        {
            "Premium Woods Co": [
                {"name": "White Oak Flooring", "category": "Flooring"},
                {"name": "Walnut Panel", "category": "Panels", "manufacturer_name": "Override Co"}
            ],
            "Acme Stone": [
                {"name": "Carrara Slab", "category": "Stone"}
            ]
        }
        "#;

        let batch: CandidateBatch = serde_json::from_str(json).unwrap();
        let flat = batch.flatten();

        assert_eq!(flat.len(), 3);
        // Sorted key order: "Acme Stone" before "Premium Woods Co"
        assert_eq!(flat[0].manufacturer_name.as_deref(), Some("Acme Stone"));
        assert_eq!(
            flat[1].manufacturer_name.as_deref(),
            Some("Premium Woods Co")
        );
        // Explicit manufacturer_name is not overwritten by the key
        assert_eq!(flat[2].manufacturer_name.as_deref(), Some("Override Co"));
    }

    #[test]
    fn flat_batch_passes_through() {
        let json = r#"[{"name": "White Oak Flooring", "category": "Flooring"}]"#;
        let batch: CandidateBatch = serde_json::from_str(json).unwrap();
        let flat = batch.flatten();
        assert_eq!(flat.len(), 1);
        assert!(flat[0].manufacturer_name.is_none());
    }

    #[test]
    fn partition_counts_skipped() {
        let candidates = vec![
            material("Valid", Some("Flooring")),
            material("", Some("Flooring")),
            material("No Category", None),
        ];
        let (valid, skipped) = partition_valid(candidates);
        assert_eq!(valid.len(), 1);
        assert_eq!(skipped, 2);
    }
}
