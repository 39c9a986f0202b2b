use crate::element::ElementRecord;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Periodic table shipped with the binaries (H through Ca).
const BUILTIN_TABLE_JSON: &str = include_str!("../data/periodic_table.json");

static BUILTIN_CATALOG: Lazy<Result<ElementCatalog, CatalogError>> =
    Lazy::new(|| ElementCatalog::from_json_str(BUILTIN_TABLE_JSON));

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("read catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog has no entries")]
    Empty,
    #[error("catalog must contain at least Hydrogen (atomic_number 1)")]
    MissingHydrogen,
    #[error("atomic number {0} appears more than once")]
    DuplicateAtomicNumber(u32),
    #[error("entry {key:?} has atomic number 0")]
    InvalidAtomicNumber { key: String },
}

/// Validated, immutable element table sorted by atomic number.
///
/// Index 0 is always Hydrogen: atomic numbers are unique and positive, and
/// construction rejects tables without `atomic_number == 1`.
#[derive(Debug, Clone)]
pub struct ElementCatalog {
    records: Vec<ElementRecord>,
}

impl ElementCatalog {
    pub fn from_records(mut records: Vec<ElementRecord>) -> Result<Self, CatalogError> {
        if records.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for record in &records {
            if record.atomic_number == 0 {
                return Err(CatalogError::InvalidAtomicNumber {
                    key: record.symbol.clone(),
                });
            }
            if !seen.insert(record.atomic_number) {
                return Err(CatalogError::DuplicateAtomicNumber(record.atomic_number));
            }
        }
        if !seen.contains(&1) {
            return Err(CatalogError::MissingHydrogen);
        }
        records.sort_by_key(|r| r.atomic_number);
        Ok(ElementCatalog { records })
    }

    /// Parses the keyed JSON layout: `{ "<key>": { ...element... }, ... }`.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let keyed: BTreeMap<String, ElementRecord> = serde_json::from_str(json)?;
        if let Some((key, _)) = keyed.iter().find(|(_, r)| r.atomic_number == 0) {
            return Err(CatalogError::InvalidAtomicNumber { key: key.clone() });
        }
        Self::from_records(keyed.into_values().collect())
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn hydrogen_only() -> Self {
        ElementCatalog {
            records: vec![ElementRecord::hydrogen()],
        }
    }

    pub fn builtin() -> Self {
        match BUILTIN_CATALOG.as_ref() {
            Ok(catalog) => catalog.clone(),
            Err(e) => {
                log::error!("Built-in periodic table is invalid: {e}");
                Self::hydrogen_only()
            }
        }
    }

    /// Loads `path` if given, otherwise the built-in table. A table that fails
    /// to load is replaced by a Hydrogen-only catalog so the engine can run.
    pub fn load_or_fallback(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };
        match Self::load(path) {
            Ok(catalog) => {
                log::info!("Loaded {} elements from {:?}", catalog.len(), path);
                catalog
            }
            Err(e) => {
                log::warn!("Error loading periodic table {:?}: {e}", path);
                log::warn!("Creating minimal default table with just Hydrogen");
                Self::hydrogen_only()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[ElementRecord] {
        &self.records
    }

    pub fn hydrogen_index(&self) -> usize {
        0
    }

    pub fn max_atomic_number(&self) -> u32 {
        self.records.last().map(|r| r.atomic_number).unwrap_or(1)
    }

    /// Index of the next element in atomic-number order, wrapping to the first.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.records.len()
    }

    /// Index of the previous element, wrapping to the last.
    pub fn previous_index(&self, index: usize) -> usize {
        (index + self.records.len() - 1) % self.records.len()
    }
}
