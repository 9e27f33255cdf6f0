//! Replay configuration.
//!
//! Describes how shard files are recognised and how each decoded line maps to
//! a timestamp plus a sparse set of field updates.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, Result};

pub const DEFAULT_TIMESTAMP_KEY: &str = "changeTime";
pub const DEFAULT_FIELDS_KEY: &str = "after";
pub const DEFAULT_PRIOR_KEY: &str = "before";
pub const DEFAULT_SHARD_SUFFIX: &str = ".jsonl.gz";

/// Configuration for a replay query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Record key layout.
    pub schema: RecordSchema,

    /// Only files/objects ending with this suffix are treated as shards.
    /// A suffix ending in `.gz` means the shard is gzip-compressed.
    /// Default: `.jsonl.gz`
    pub shard_suffix: String,

    /// Resolve fields never observed up to the target from the prior image of
    /// the first later record that carries them.
    /// Default: false
    pub backfill_prior: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            schema: RecordSchema::default(),
            shard_suffix: DEFAULT_SHARD_SUFFIX.to_string(),
            backfill_prior: false,
        }
    }
}

impl ReplayConfig {
    /// Load a JSON config file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config: ReplayConfig =
            serde_json::from_str(&json).map_err(|err| ReplayError::Config {
                reason: format!("{}: {err}", path.display()),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.shard_suffix.is_empty() {
            return Err(ReplayError::Config {
                reason: "shard_suffix must not be empty".to_string(),
            });
        }
        self.schema.validate()
    }

    pub fn is_compressed(&self) -> bool {
        self.shard_suffix.ends_with(".gz")
    }
}

/// Which keys of a decoded line carry the timestamp, the field updates and
/// the optional prior image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordSchema {
    /// Default: `changeTime`
    pub timestamp_key: String,

    /// Key of the nested object holding field updates. `None` means the
    /// record is flat: every other top-level key is a field.
    /// Default: `after`
    pub fields_key: Option<String>,

    /// Key of the nested object holding the values fields had just before
    /// this record was written.
    /// Default: `before`
    pub prior_key: Option<String>,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            timestamp_key: DEFAULT_TIMESTAMP_KEY.to_string(),
            fields_key: Some(DEFAULT_FIELDS_KEY.to_string()),
            prior_key: Some(DEFAULT_PRIOR_KEY.to_string()),
        }
    }
}

impl RecordSchema {
    /// Flat records: `{"<timestamp_key>": ..., "field": value, ...}`.
    pub fn flat(timestamp_key: &str) -> Self {
        Self {
            timestamp_key: timestamp_key.to_string(),
            fields_key: None,
            prior_key: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timestamp_key.is_empty() {
            return Err(ReplayError::Config {
                reason: "timestamp_key must not be empty".to_string(),
            });
        }
        let clashes = |key: &Option<String>| key.as_deref() == Some(self.timestamp_key.as_str());
        if clashes(&self.fields_key) || clashes(&self.prior_key) {
            return Err(ReplayError::Config {
                reason: format!("key '{}' used for more than one role", self.timestamp_key),
            });
        }
        if self.fields_key.is_some() && self.fields_key == self.prior_key {
            return Err(ReplayError::Config {
                reason: "fields_key and prior_key must differ".to_string(),
            });
        }
        Ok(())
    }
}
