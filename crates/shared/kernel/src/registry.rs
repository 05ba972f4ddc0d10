//! Catalog of known features and how to load them.
//!
//! Registration is metadata only: nothing is loaded here. The first registration of a name wins;
//! later ones are ignored with a warning so a slice wired twice cannot swap its own loader mid-run.

use crate::feature::FeatureDescriptor;
use fxhash::{FxHashMap, FxHashSet};
use modhub_domain::metadata::FeatureMetadata;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default)]
struct Catalog {
    order: Vec<String>,
    entries: FxHashMap<String, FeatureDescriptor>,
}

impl Catalog {
    /// Depth-first search for a dependency path leading from `current` back to `origin`.
    fn path_back_to(
        &self,
        origin: &str,
        current: &str,
        path: &mut Vec<String>,
        visited: &mut FxHashSet<String>,
    ) -> bool {
        let Some(descriptor) = self.entries.get(current) else {
            return false;
        };

        for dependency in descriptor.dependencies() {
            if dependency == origin {
                path.push(dependency.clone());
                return true;
            }
            if visited.insert(dependency.clone()) {
                path.push(dependency.clone());
                if self.path_back_to(origin, dependency, path, visited) {
                    return true;
                }
                path.pop();
            }
        }

        false
    }
}

/// Cloneable handle to a feature catalog.
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    catalog: Arc<RwLock<Catalog>>,
}

impl FeatureRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `descriptor` unless its name is taken.
    ///
    /// Returns `false` (and keeps the existing descriptor) for a duplicate name.
    pub fn register(&self, descriptor: FeatureDescriptor) -> bool {
        let mut catalog = self.catalog.write();
        let name = descriptor.name().to_owned();

        if catalog.entries.contains_key(&name) {
            warn!(feature = %name, "Feature already registered, ignoring duplicate registration");
            return false;
        }

        info!(
            feature = %name,
            version = descriptor.metadata().version.as_deref().unwrap_or("-"),
            dependencies = ?descriptor.dependencies(),
            "Feature registered"
        );
        catalog.order.push(name.clone());
        catalog.entries.insert(name, descriptor);
        true
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<FeatureDescriptor> {
        self.catalog.read().entries.get(name).cloned()
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.catalog.read().entries.contains_key(name)
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.catalog.read().order.clone()
    }

    /// Metadata of every feature, in registration order.
    #[must_use]
    pub fn all_metadata(&self) -> Vec<FeatureMetadata> {
        let catalog = self.catalog.read();
        catalog
            .order
            .iter()
            .filter_map(|name| catalog.entries.get(name))
            .map(|descriptor| descriptor.metadata().clone())
            .collect()
    }

    #[must_use]
    pub fn by_tag(&self, tag: &str) -> Vec<FeatureMetadata> {
        self.all_metadata().into_iter().filter(|meta| meta.has_tag(tag)).collect()
    }

    /// Returns the dependency path `name -> .. -> name` if `name` depends on itself, directly or
    /// transitively, through registered features.
    #[must_use]
    pub fn find_cycle(&self, name: &str) -> Option<Vec<String>> {
        let catalog = self.catalog.read();
        let mut path = vec![name.to_owned()];
        let mut visited = FxHashSet::default();
        catalog.path_back_to(name, name, &mut path, &mut visited).then_some(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.catalog.read().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.catalog.read().order.is_empty()
    }

    /// Removes every feature. Intended for test isolation.
    pub fn clear(&self) {
        let mut catalog = self.catalog.write();
        catalog.order.clear();
        catalog.entries.clear();
    }
}
