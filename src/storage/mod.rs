//! Storage capability: list and read shards under a root location.

mod local;
#[cfg(feature = "s3")]
mod object;
mod root;

use std::io::Read;

pub use local::LocalShardStore;
#[cfg(feature = "s3")]
pub use object::ObjectShardStore;
pub use root::LogRoot;

use crate::error::Result;

/// One shard file as reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardObject {
    /// Backend-specific address passed back to [`ShardStore::open`].
    pub location: String,
    /// Name relative to the root, `/`-separated.
    pub name: String,
}

/// The only thing the replay core knows about storage.
pub trait ShardStore {
    /// Human-readable root, used in errors and logs.
    fn root(&self) -> &str;

    /// Every object under the root whose name ends in `suffix`, in no
    /// particular order. Fails with `NotFound` if the root is unreachable.
    fn list_shards(&self, suffix: &str) -> Result<Vec<ShardObject>>;

    /// Raw (still compressed) bytes of one shard.
    fn open(&self, location: &str) -> Result<Box<dyn Read + '_>>;
}

/// Picks a backend from the root syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct StorageResolver;

impl StorageResolver {
    pub fn open(&self, root: &LogRoot) -> Result<Box<dyn ShardStore>> {
        match root {
            LogRoot::Local(path) => Ok(Box::new(LocalShardStore::new(path.clone()))),
            #[cfg(feature = "s3")]
            LogRoot::ObjectStore { bucket, prefix } => {
                Ok(Box::new(ObjectShardStore::s3_from_env(bucket, prefix)?))
            }
            #[cfg(not(feature = "s3"))]
            LogRoot::ObjectStore { .. } => Err(crate::error::ReplayError::InvalidRoot {
                root: root.to_string(),
                reason: "object store support not compiled in (enable feature `s3`)".to_string(),
            }),
        }
    }
}

/// Normalises a listed name relative to `prefix`, dropping the separator.
pub(crate) fn relative_name<'a>(full: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = full.strip_prefix(prefix)?;
    if !prefix.is_empty() && !prefix.ends_with('/') && !rest.starts_with('/') {
        return None;
    }
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        None
    } else {
        Some(rest)
    }
}
