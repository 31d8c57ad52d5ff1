//! Name + tags helpers over any [`Registry`].

use pulse_core::{Tags, encode_key};
use pulse_metrics::{Metric, Registry, RegistryResult};

/// Tag-aware registration, available on every registry.
///
/// Each helper encodes `(name, tags)` with [`encode_key`] and delegates to
/// the keyed operation. With empty tags the key is the bare name, so
/// untagged lookups keep working.
pub trait TaggedRegistryExt: Registry {
    fn register_tagged(&self, name: &str, tags: &Tags, metric: Metric) -> RegistryResult<()> {
        self.register(&encode_key(name, tags), metric)
    }

    fn get_tagged(&self, name: &str, tags: &Tags) -> Option<Metric> {
        self.get(&encode_key(name, tags))
    }

    fn get_or_register_tagged(
        &self,
        name: &str,
        tags: &Tags,
        mut factory: impl FnMut() -> Metric,
    ) -> RegistryResult<Metric> {
        self.get_or_register(&encode_key(name, tags), &mut factory)
    }

    fn unregister_tagged(&self, name: &str, tags: &Tags) {
        self.unregister(&encode_key(name, tags));
    }
}

impl<R: Registry + ?Sized> TaggedRegistryExt for R {}
