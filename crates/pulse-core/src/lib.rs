//! pulse-core: shared types for the Pulse metrics reporter.
//!
//! - [`key`]: tagged metric key encoding (`name[k="v",...]`)
//! - [`tags`]: tag sets and application tags
//! - [`config`]: TOML reporter configuration

pub mod config;
pub mod key;
pub mod tags;

pub use config::{ConfigError, ConfigResult, ReporterConfig, parse_duration};
pub use key::{decode_key, encode_key};
pub use tags::{ApplicationTags, Tags, merge_tags, tags};
