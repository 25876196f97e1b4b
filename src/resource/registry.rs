//! Resource Registry - Sentry kinds loaded from a catalog
//!
//! The built-in catalog is embedded from `resources/sentries.json`. A
//! deployment can replace it with its own JSON or YAML file, so adding a
//! sector is a data change. The registry is built once at startup and shared
//! read-only behind an `Arc` afterwards.

use super::engine::LifecycleEngine;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Embedded sentry catalog (compiled into the binary)
const BUILTIN_CATALOG: &str = include_str!("../resources/sentries.json");

/// Immutable description of one resource kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceKind {
    /// Unique kind name, e.g. `apollo`
    pub name: String,
    /// Critical infrastructure sector label
    pub sector: String,
    #[serde(default)]
    pub description: String,
}

impl ResourceKind {
    pub fn new(name: &str, sector: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            sector: sector.to_string(),
            description: description.to_string(),
        }
    }

    /// `apollo` -> `Apollo`
    pub fn display_name(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Description, or the generated one when the catalog left it out
    pub fn effective_description(&self) -> String {
        if self.description.trim().is_empty() {
            format!(
                "Manages a {name} Sentry resource. {name} is specialized for protecting the {} sector.",
                self.sector,
                name = self.display_name()
            )
        } else {
            self.description.clone()
        }
    }
}

/// Errors building or querying the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown resource kind: {0}")]
    NotFound(String),

    #[error("resource kind registered twice: {0}")]
    Duplicate(String),

    #[error("invalid resource kind name {0:?}: expected lowercase letters, digits and underscores")]
    InvalidName(String),

    #[error("resource kind {0} has no sector")]
    MissingSector(String),

    #[error("invalid sentry catalog: {0}")]
    Catalog(String),
}

/// Root structure of a sentry catalog file
#[derive(Debug, Clone, Deserialize)]
struct Catalog {
    sentries: Vec<ResourceKind>,
}

/// Catalog of lifecycle engines keyed by kind name
#[derive(Default)]
pub struct Registry {
    engines: BTreeMap<String, Arc<LifecycleEngine>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an explicit list of kinds
    pub fn from_kinds<I>(kinds: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = ResourceKind>,
    {
        let mut registry = Self::new();
        for kind in kinds {
            registry.register(kind)?;
        }
        Ok(registry)
    }

    /// Build from the embedded catalog
    pub fn builtin() -> Result<Self, RegistryError> {
        let catalog: Catalog = serde_json::from_str(BUILTIN_CATALOG)
            .map_err(|e| RegistryError::Catalog(e.to_string()))?;
        Self::from_kinds(catalog.sentries)
    }

    /// Build from a catalog file (JSON, or YAML by extension)
    pub fn from_catalog_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sentry catalog {:?}", path))?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let catalog: Catalog = if is_yaml {
            serde_yaml::from_str(&content).context("Failed to parse YAML sentry catalog")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON sentry catalog")?
        };

        Self::from_kinds(catalog.sentries)
            .with_context(|| format!("Invalid sentry catalog {:?}", path))
    }

    /// Add a kind. Only valid while the registry is still being built.
    pub fn register(&mut self, kind: ResourceKind) -> Result<Arc<LifecycleEngine>, RegistryError> {
        if !is_valid_kind_name(&kind.name) {
            return Err(RegistryError::InvalidName(kind.name));
        }
        if kind.sector.trim().is_empty() {
            return Err(RegistryError::MissingSector(kind.name));
        }
        if self.engines.contains_key(&kind.name) {
            return Err(RegistryError::Duplicate(kind.name));
        }

        tracing::debug!("registering sentry kind {} ({})", kind.name, kind.sector);
        let engine = Arc::new(LifecycleEngine::new(kind));
        self.engines
            .insert(engine.kind().name.clone(), Arc::clone(&engine));
        Ok(engine)
    }

    /// Get the engine for a kind name
    pub fn lookup(&self, name: &str) -> Result<Arc<LifecycleEngine>, RegistryError> {
        self.engines
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn engines(&self) -> impl Iterator<Item = &Arc<LifecycleEngine>> {
        self.engines.values()
    }

    /// Registered kinds, ordered by name
    pub fn kinds(&self) -> impl Iterator<Item = &ResourceKind> {
        self.engines.values().map(|e| e.kind())
    }

    /// Get all kind names (ordered)
    pub fn names(&self) -> Vec<&str> {
        self.engines.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

fn is_valid_kind_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
