//! Canonical branch registry.
//!
//! The registry is loaded once from a static dataset and is read-only for
//! the duration of a reconciliation run. [`SharedRegistry`] lets a
//! long-lived process replace it wholesale.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::branch::BranchId;

/// Metadata for one known branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRegistryEntry {
    pub branch_id: BranchId,
    pub english_name: String,
    pub arabic_name: String,
}

/// Errors raised while loading a registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("could not read branch registry '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse branch registry '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("branch registry contains an empty branch id")]
    EmptyId,
}

/// Immutable mapping of branch id to registry entry.
#[derive(Debug, Clone, Default)]
pub struct BranchRegistry {
    entries: HashMap<BranchId, BranchRegistryEntry>,
}

impl BranchRegistry {
    pub fn new(entries: impl IntoIterator<Item = BranchRegistryEntry>) -> Self {
        BranchRegistry {
            entries: entries
                .into_iter()
                .map(|e| (e.branch_id.clone(), e))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &BranchId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &BranchId) -> Option<&BranchRegistryEntry> {
        self.entries.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &BranchId> {
        self.entries.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = &BranchRegistryEntry> {
        self.entries.values()
    }

    /// Display name for a branch, falling back to `"Unknown Branch"`.
    pub fn display_name(&self, id: &BranchId) -> &str {
        self.entries
            .get(id)
            .map(|e| e.english_name.as_str())
            .unwrap_or("Unknown Branch")
    }
}

// ──────────────────────────────────────────────
// Loaders
// ──────────────────────────────────────────────

/// Source of the canonical branch registry.
pub trait RegistryLoader {
    fn load(&self) -> Result<BranchRegistry, RegistryError>;
}

/// The shapes a registry entry takes in `branch_data.json`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Named {
        english_name: String,
        #[serde(default)]
        arabic_name: String,
    },
    Pair(String, String),
    Single(String),
}

/// Reads the registry from a JSON object keyed by branch id.
///
/// Accepted entry shapes:
/// `{"12": {"english_name": "Maadi", "arabic_name": "المعادي"}}`,
/// `{"12": ["Maadi", "المعادي"]}` and `{"12": "Maadi"}`.
pub struct JsonRegistryLoader {
    path: PathBuf,
}

impl JsonRegistryLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonRegistryLoader { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse registry JSON already held in memory.
    pub fn parse(json: &str) -> Result<BranchRegistry, serde_json::Error> {
        let raw: HashMap<String, RawEntry> = serde_json::from_str(json)?;
        Ok(BranchRegistry::new(raw.into_iter().map(|(id, entry)| {
            let (english_name, arabic_name) = match entry {
                RawEntry::Named {
                    english_name,
                    arabic_name,
                } => (english_name, arabic_name),
                RawEntry::Pair(en, ar) => (en, ar),
                RawEntry::Single(en) => (en, String::new()),
            };
            BranchRegistryEntry {
                branch_id: BranchId::new(&id),
                english_name,
                arabic_name,
            }
        })))
    }
}

impl RegistryLoader for JsonRegistryLoader {
    fn load(&self) -> Result<BranchRegistry, RegistryError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| RegistryError::Io {
            path: self.path.clone(),
            source,
        })?;
        let registry = Self::parse(&content).map_err(|source| RegistryError::Parse {
            path: self.path.clone(),
            source,
        })?;
        if registry.ids().any(BranchId::is_empty) {
            return Err(RegistryError::EmptyId);
        }
        tracing::info!(
            path = %self.path.display(),
            branches = registry.len(),
            "branch registry loaded"
        );
        Ok(registry)
    }
}

// ──────────────────────────────────────────────
// SharedRegistry
// ──────────────────────────────────────────────

/// A registry handle that can be swapped atomically.
///
/// Readers take a snapshot `Arc` and keep using it for the whole run even
/// if a reload happens concurrently.
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    current: Arc<RwLock<Arc<BranchRegistry>>>,
}

impl SharedRegistry {
    pub fn new(registry: BranchRegistry) -> Self {
        SharedRegistry {
            current: Arc::new(RwLock::new(Arc::new(registry))),
        }
    }

    pub fn snapshot(&self) -> Arc<BranchRegistry> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    pub fn replace(&self, registry: BranchRegistry) {
        let next = Arc::new(registry);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Load a fresh registry and swap it in. On failure the current
    /// registry stays in place.
    pub fn reload(&self, loader: &dyn RegistryLoader) -> Result<(), RegistryError> {
        let registry = loader.load()?;
        self.replace(registry);
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
