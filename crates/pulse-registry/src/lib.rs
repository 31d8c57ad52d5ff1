//! pulse-registry: tag-aware metric registries.
//!
//! - [`TaggedRegistry`]: holds every metric type, windowed histograms
//!   included, keyed by encoded `name[tags]` strings
//! - [`TaggedRegistryExt`]: `(name, tags)` helpers on any registry
//! - [`default_registry`]: an optional process-wide instance

use std::sync::{Arc, OnceLock};

pub mod ext;
pub mod tagged;

pub use ext::TaggedRegistryExt;
pub use tagged::TaggedRegistry;

static DEFAULT_REGISTRY: OnceLock<Arc<TaggedRegistry>> = OnceLock::new();

/// Process-wide registry, created on first use.
///
/// A convenience for applications that do not manage their own registry.
/// Reporters still take a registry explicitly.
pub fn default_registry() -> Arc<TaggedRegistry> {
    Arc::clone(DEFAULT_REGISTRY.get_or_init(|| Arc::new(TaggedRegistry::new())))
}
