use std::io::{Cursor, Read};
use std::sync::Arc;

use futures_util::TryStreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use tokio::runtime::{Builder, Runtime};

use crate::error::{ReplayError, Result};

use super::{relative_name, ShardObject, ShardStore};

/// Shards stored as objects under a prefix.
///
/// Object stores are async; a private current-thread runtime drives each call
/// to completion so the replay core stays synchronous. Do not use from inside
/// another tokio runtime.
pub struct ObjectShardStore {
    store: Arc<dyn ObjectStore>,
    prefix: String,
    display: String,
    runtime: Runtime,
}

impl ObjectShardStore {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        prefix: &str,
        display: impl Into<String>,
    ) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            store,
            prefix: prefix.trim_matches('/').to_string(),
            display: display.into(),
            runtime,
        })
    }

    /// S3 bucket with credentials and region taken from `AWS_*` variables.
    pub fn s3_from_env(bucket: &str, prefix: &str) -> Result<Self> {
        let display = if prefix.is_empty() {
            format!("s3://{bucket}")
        } else {
            format!("s3://{bucket}/{prefix}")
        };
        let store = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .build()
            .map_err(|err| ReplayError::not_found(display.clone(), err))?;
        Self::new(Arc::new(store), prefix, display)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl ShardStore for ObjectShardStore {
    fn root(&self) -> &str {
        &self.display
    }

    fn list_shards(&self, suffix: &str) -> Result<Vec<ShardObject>> {
        let prefix = (!self.prefix.is_empty()).then(|| ObjectPath::from(self.prefix.as_str()));
        let listed: Vec<ObjectMeta> = self
            .runtime
            .block_on(self.store.list(prefix.as_ref()).try_collect())
            .map_err(|err| ReplayError::not_found(self.display.clone(), err))?;

        // An empty prefix is indistinguishable from a missing one.
        if listed.is_empty() {
            return Err(ReplayError::not_found(
                self.display.clone(),
                "no objects under prefix",
            ));
        }

        let shards = listed
            .into_iter()
            .filter_map(|meta| {
                let location = meta.location.as_ref();
                let name = relative_name(location, &self.prefix)?;
                name.ends_with(suffix).then(|| ShardObject {
                    location: location.to_string(),
                    name: name.to_string(),
                })
            })
            .collect();
        Ok(shards)
    }

    fn open(&self, location: &str) -> Result<Box<dyn Read + '_>> {
        let path = ObjectPath::from(location);
        let bytes = self
            .runtime
            .block_on(async {
                let result = self.store.get(&path).await?;
                result.bytes().await
            })
            .map_err(|err| ReplayError::unreadable(location, std::io::Error::other(err)))?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}
