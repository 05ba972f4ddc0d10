//! Descriptive data about features, independent of how they are loaded.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Informational metadata of a registered feature.
///
/// Only `name` and `dependencies` influence loading; the rest is for diagnostics and tooling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureMetadata {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
    pub tags: Vec<String>,
    /// Features that must be fully loaded before this one, in declaration order.
    pub dependencies: Vec<String>,
}

impl FeatureMetadata {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    #[must_use]
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d == name)
    }
}

/// Lifecycle position of a feature name.
///
/// `Loaded` is terminal; a failed load returns the feature to `Registered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureStatus {
    Unknown,
    Registered,
    Loading,
    Loaded,
}

impl fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "unknown",
            Self::Registered => "registered",
            Self::Loading => "loading",
            Self::Loaded => "loaded",
        };
        f.pad(label)
    }
}

/// Point-in-time snapshot of the loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStats {
    pub registered: Vec<String>,
    pub loaded: Vec<String>,
    pub loading: Vec<String>,
}

impl FeatureStats {
    #[must_use]
    pub const fn registered_count(&self) -> usize {
        self.registered.len()
    }

    #[must_use]
    pub const fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    #[must_use]
    pub const fn loading_count(&self) -> usize {
        self.loading.len()
    }

    /// Registered features that are neither loaded nor loading.
    #[must_use]
    pub fn pending(&self) -> Vec<&str> {
        self.registered
            .iter()
            .filter(|name| !self.loaded.contains(name) && !self.loading.contains(name))
            .map(String::as_str)
            .collect()
    }
}
