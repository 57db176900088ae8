//! Tenant catalog snapshot for matching
//!
//! Loaded fresh per scoring call so a session that outlives catalog edits
//! never matches against stale data. Matching degrades to "no matches" when
//! the snapshot cannot be loaded; that path is the caller's responsibility.

use matcat_common::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::manufacturers::{self, Manufacturer};
use crate::db::materials::{self, Material};

/// Immutable view of a studio's catalog at one point in time
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub materials: Vec<Material>,
    pub manufacturers: Vec<Manufacturer>,
    /// Lowercase-trimmed manufacturer name → id, for free-text resolution
    manufacturer_names: HashMap<String, Uuid>,
}

impl CatalogSnapshot {
    /// Build a snapshot from already-loaded records (used directly by tests)
    pub fn from_records(materials: Vec<Material>, manufacturers: Vec<Manufacturer>) -> Self {
        let manufacturer_names = manufacturers
            .iter()
            .map(|m| (normalize_name(&m.name), m.manufacturer_id))
            .collect();

        Self {
            materials,
            manufacturers,
            manufacturer_names,
        }
    }

    /// Load the current catalog for a studio
    pub async fn load(pool: &SqlitePool, studio_id: Uuid) -> Result<Self> {
        let materials = materials::list_materials(pool, studio_id).await?;
        let manufacturers = manufacturers::list_manufacturers(pool, studio_id).await?;
        Ok(Self::from_records(materials, manufacturers))
    }

    /// Case-insensitive, whitespace-trimmed exact manufacturer lookup
    ///
    /// Returns None when the name does not resolve; the caller drops the
    /// manufacturer term rather than erroring.
    pub fn resolve_manufacturer(&self, name: &str) -> Option<Uuid> {
        self.manufacturer_names.get(&normalize_name(name)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty() && self.manufacturers.is_empty()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
