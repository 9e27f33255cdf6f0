use std::io;

use thiserror::Error;

/// Fatal conditions that abort a replay query.
///
/// Per-line decode failures, missing fields and empty shard ranges are not
/// errors; they are reported through [`crate::replay::ReplayWarning`] and
/// [`crate::replay::ReplayStats`].
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("log root not found: {root} ({reason})")]
    NotFound { root: String, reason: String },

    #[error("shard unreadable: {shard}")]
    ShardUnreadable {
        shard: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid timestamp: {value}")]
    InvalidTimestamp { value: String },

    #[error("invalid log root {root}: {reason}")]
    InvalidRoot { root: String, reason: String },

    #[error("invalid config: {reason}")]
    Config { reason: String },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl ReplayError {
    pub(crate) fn unreadable(shard: impl Into<String>, source: io::Error) -> Self {
        ReplayError::ShardUnreadable {
            shard: shard.into(),
            source,
        }
    }

    pub(crate) fn not_found(root: impl Into<String>, reason: impl ToString) -> Self {
        ReplayError::NotFound {
            root: root.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that mean the root itself could not be reached.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReplayError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ReplayError>;
