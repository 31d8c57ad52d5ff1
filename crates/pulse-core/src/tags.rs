//! Tag sets and application-level tags.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A metric's tag set. Ordered by key so encoding is deterministic.
pub type Tags = BTreeMap<String, String>;

/// Build a [`Tags`] map from string pairs.
pub fn tags<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Tags
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Tags identifying the application that owns the reported metrics.
///
/// Every point sent by a reporter carries these tags. A metric's own tags
/// win when both define the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationTags {
    pub application: String,
    pub service: String,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub shard: Option<String>,
    /// Extra tags added to every point.
    #[serde(default)]
    pub custom: Tags,
}

impl ApplicationTags {
    pub fn new(application: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            service: service.into(),
            cluster: None,
            shard: None,
            custom: Tags::new(),
        }
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    pub fn with_shard(mut self, shard: impl Into<String>) -> Self {
        self.shard = Some(shard.into());
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Render as a point tag set. Unset cluster and shard become `"none"`.
    pub fn to_tags(&self) -> Tags {
        let mut out = self.custom.clone();
        out.insert("application".to_string(), self.application.clone());
        out.insert("service".to_string(), self.service.clone());
        out.insert(
            "cluster".to_string(),
            self.cluster.clone().unwrap_or_else(|| "none".to_string()),
        );
        out.insert(
            "shard".to_string(),
            self.shard.clone().unwrap_or_else(|| "none".to_string()),
        );
        out
    }
}

/// Overlay `overrides` on top of `base`; keys in `overrides` win.
pub fn merge_tags(base: &Tags, overrides: Tags) -> Tags {
    if base.is_empty() {
        return overrides;
    }
    let mut merged = base.clone();
    merged.extend(overrides);
    merged
}
