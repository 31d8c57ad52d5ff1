//! Tagged registry: the plain registry plus a side map for windowed
//! histograms.
//!
//! Keys are encoded with [`pulse_core::encode_key`], so a tagged metric and
//! an untagged one coexist in the same key space. Windowed histograms are
//! rejected by [`StandardRegistry`]; they are kept here instead, and every
//! other metric type is delegated to the wrapped registry unchanged.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use pulse_metrics::{Metric, Registry, RegistryError, RegistryResult, StandardRegistry};

/// Registry that can hold every metric type, tagged or not.
pub struct TaggedRegistry {
    inner: Arc<dyn Registry>,
    /// Windowed histograms: encoded key → metric.
    histograms: RwLock<BTreeMap<String, Metric>>,
}

impl Default for TaggedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaggedRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedRegistry")
            .field("metrics", &self.inner.len())
            .field("histograms", &self.read_histograms().len())
            .finish()
    }
}

impl TaggedRegistry {
    /// A tagged registry over a fresh [`StandardRegistry`].
    pub fn new() -> Self {
        Self::wrap(Arc::new(StandardRegistry::new()))
    }

    /// Wrap an existing plain registry. Metrics already in it stay visible.
    pub fn wrap(inner: Arc<dyn Registry>) -> Self {
        Self {
            inner,
            histograms: RwLock::new(BTreeMap::new()),
        }
    }

    /// The wrapped plain registry.
    pub fn inner(&self) -> &Arc<dyn Registry> {
        &self.inner
    }

    fn read_histograms(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Metric>> {
        self.histograms.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_histograms(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Metric>> {
        self.histograms.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Registry for TaggedRegistry {
    fn register(&self, key: &str, metric: Metric) -> RegistryResult<()> {
        // Held across both maps so a key never lands in each of them.
        let mut histograms = self.write_histograms();
        if histograms.contains_key(key) {
            return Err(RegistryError::Duplicate(key.to_string()));
        }
        match metric {
            Metric::Windowed(_) => {
                if self.inner.get(key).is_some() {
                    return Err(RegistryError::Duplicate(key.to_string()));
                }
                debug!(%key, "windowed histogram registered");
                histograms.insert(key.to_string(), metric);
                Ok(())
            }
            other => self.inner.register(key, other),
        }
    }

    fn get(&self, key: &str) -> Option<Metric> {
        if let Some(metric) = self.read_histograms().get(key) {
            return Some(metric.clone());
        }
        self.inner.get(key)
    }

    fn get_or_register(
        &self,
        key: &str,
        factory: &mut dyn FnMut() -> Metric,
    ) -> RegistryResult<Metric> {
        if let Some(existing) = self.get(key) {
            return Ok(existing);
        }

        let mut histograms = self.write_histograms();
        if let Some(existing) = histograms.get(key) {
            return Ok(existing.clone());
        }
        if let Some(existing) = self.inner.get(key) {
            return Ok(existing);
        }

        let metric = factory();
        if let Metric::Windowed(_) = metric {
            debug!(%key, "windowed histogram registered");
            histograms.insert(key.to_string(), metric.clone());
            return Ok(metric);
        }
        match self.inner.register(key, metric.clone()) {
            Ok(()) => Ok(metric),
            // Someone registered through the wrapped registry directly.
            Err(RegistryError::Duplicate(_)) => self
                .inner
                .get(key)
                .ok_or_else(|| RegistryError::Duplicate(key.to_string())),
            Err(e) => Err(e),
        }
    }

    fn unregister(&self, key: &str) {
        let mut histograms = self.write_histograms();
        if histograms.remove(key).is_some() {
            debug!(%key, "windowed histogram unregistered");
        }
        self.inner.unregister(key);
    }

    fn unregister_all(&self) {
        let mut histograms = self.write_histograms();
        histograms.clear();
        self.inner.unregister_all();
    }

    fn each(&self, visitor: &mut dyn FnMut(&str, &Metric)) {
        // Both maps are read under the side-map guard, which every move
        // between them also takes, so a key shows up at most once. Visiting
        // happens after the guard is released.
        let entries: Vec<(String, Metric)> = {
            let histograms = self.read_histograms();
            let mut entries: Vec<(String, Metric)> = histograms
                .iter()
                .map(|(k, m)| (k.clone(), m.clone()))
                .collect();
            self.inner
                .each(&mut |key, metric| entries.push((key.to_string(), metric.clone())));
            entries
        };
        for (key, metric) in &entries {
            visitor(key, metric);
        }
    }

    fn len(&self) -> usize {
        self.read_histograms().len() + self.inner.len()
    }
}
