//! Metric registries.
//!
//! [`Registry`] is the storage seam the reporter reads from.
//! [`StandardRegistry`] is the plain implementation: a name → metric map
//! under a read/write lock. It holds every metric type except windowed
//! histograms, which need distribution export and live in the tagged
//! registry instead.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::metric::Metric;

/// Key → metric storage shared between producers and the reporter.
pub trait Registry: Send + Sync {
    /// Register `metric` under `key`. Fails if the key is taken.
    fn register(&self, key: &str, metric: Metric) -> RegistryResult<()>;

    fn get(&self, key: &str) -> Option<Metric>;

    /// Return the metric under `key`, registering `factory()` if absent.
    ///
    /// Atomic: concurrent callers with the same key all receive the same
    /// metric, and `factory` runs at most once per successful registration.
    fn get_or_register(
        &self,
        key: &str,
        factory: &mut dyn FnMut() -> Metric,
    ) -> RegistryResult<Metric>;

    fn unregister(&self, key: &str);

    fn unregister_all(&self);

    /// Visit every registered metric exactly once.
    fn each(&self, visitor: &mut dyn FnMut(&str, &Metric));

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The plain registry.
#[derive(Debug, Default)]
pub struct StandardRegistry {
    metrics: RwLock<BTreeMap<String, Metric>>,
}

impl StandardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_supported(key: &str, metric: &Metric) -> RegistryResult<()> {
        match metric {
            Metric::Windowed(_) => Err(RegistryError::Unsupported {
                key: key.to_string(),
                kind: metric.kind(),
            }),
            _ => Ok(()),
        }
    }
}

impl Registry for StandardRegistry {
    fn register(&self, key: &str, metric: Metric) -> RegistryResult<()> {
        Self::check_supported(key, &metric)?;
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        if metrics.contains_key(key) {
            return Err(RegistryError::Duplicate(key.to_string()));
        }
        debug!(%key, kind = metric.kind(), "metric registered");
        metrics.insert(key.to_string(), metric);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<Metric> {
        let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
        metrics.get(key).cloned()
    }

    fn get_or_register(
        &self,
        key: &str,
        factory: &mut dyn FnMut() -> Metric,
    ) -> RegistryResult<Metric> {
        if let Some(existing) = self.get(key) {
            return Ok(existing);
        }

        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = metrics.get(key) {
            return Ok(existing.clone());
        }
        let metric = factory();
        Self::check_supported(key, &metric)?;
        debug!(%key, kind = metric.kind(), "metric registered");
        metrics.insert(key.to_string(), metric.clone());
        Ok(metric)
    }

    fn unregister(&self, key: &str) {
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        if metrics.remove(key).is_some() {
            debug!(%key, "metric unregistered");
        }
    }

    fn unregister_all(&self) {
        self.metrics
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn each(&self, visitor: &mut dyn FnMut(&str, &Metric)) {
        // Visit a snapshot so the visitor can touch the registry.
        let snapshot: Vec<(String, Metric)> = {
            let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
            metrics
                .iter()
                .map(|(k, m)| (k.clone(), m.clone()))
                .collect()
        };
        for (key, metric) in &snapshot {
            visitor(key, metric);
        }
    }

    fn len(&self) -> usize {
        self.metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
