//! Point-in-time state reconstruction from time-partitioned audit logs.
//!
//! A device's audit log is a set of date-keyed shards, each holding
//! newline-delimited JSON records that update a sparse set of fields. Given a
//! target timestamp and a list of fields, [`replay`] reports the value each
//! field held at that moment.

pub mod accumulator;
pub mod config;
pub mod error;
pub mod record;
pub mod replay;
pub mod shard;
pub mod storage;
pub mod timestamp;

pub use accumulator::{Fold, Projection, Snapshot, StateAccumulator};
pub use config::{RecordSchema, ReplayConfig};
pub use error::{ReplayError, Result};
pub use record::{Record, RecordStream};
pub use replay::{replay, ReplayEngine, ReplayQuery, ReplayResult, ReplayStats, ReplayWarning};
pub use shard::{ShardId, ShardLocator, ShardPlan};
pub use storage::{LocalShardStore, LogRoot, ShardStore, StorageResolver};
#[cfg(feature = "s3")]
pub use storage::ObjectShardStore;
pub use timestamp::Timestamp;
