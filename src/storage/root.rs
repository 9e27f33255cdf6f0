use std::fmt;
use std::path::PathBuf;

use url::Url;

use crate::error::{ReplayError, Result};

const S3_SCHEME: &str = "s3://";

/// Where a device's shards live. Chosen purely from the root string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogRoot {
    Local(PathBuf),
    ObjectStore { bucket: String, prefix: String },
}

impl LogRoot {
    /// `s3://bucket/some/prefix` selects the object store, anything else is a
    /// local path.
    pub fn parse(input: &str) -> Result<Self> {
        if !input.starts_with(S3_SCHEME) {
            return Ok(LogRoot::Local(PathBuf::from(input)));
        }

        let url = Url::parse(input).map_err(|err| ReplayError::InvalidRoot {
            root: input.to_string(),
            reason: err.to_string(),
        })?;
        let bucket = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| ReplayError::InvalidRoot {
                root: input.to_string(),
                reason: "missing bucket name".to_string(),
            })?
            .to_string();
        let prefix = url.path().trim_matches('/').to_string();

        Ok(LogRoot::ObjectStore { bucket, prefix })
    }

    pub fn is_object_store(&self) -> bool {
        matches!(self, LogRoot::ObjectStore { .. })
    }
}

impl fmt::Display for LogRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogRoot::Local(path) => write!(f, "{}", path.display()),
            LogRoot::ObjectStore { bucket, prefix } if prefix.is_empty() => {
                write!(f, "{S3_SCHEME}{bucket}")
            }
            LogRoot::ObjectStore { bucket, prefix } => write!(f, "{S3_SCHEME}{bucket}/{prefix}"),
        }
    }
}
