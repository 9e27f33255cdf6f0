use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{ReplayError, Result};

use super::{ShardObject, ShardStore};

/// Shards stored as files below a local directory, e.g.
/// `<root>/2016/01/09.jsonl.gz`.
#[derive(Debug, Clone)]
pub struct LocalShardStore {
    root: PathBuf,
    display: String,
}

impl LocalShardStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let display = root.display().to_string();
        Self { root, display }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

impl ShardStore for LocalShardStore {
    fn root(&self) -> &str {
        &self.display
    }

    fn list_shards(&self, suffix: &str) -> Result<Vec<ShardObject>> {
        let metadata = fs::metadata(&self.root)
            .map_err(|err| ReplayError::not_found(self.display.clone(), err))?;
        if !metadata.is_dir() {
            return Err(ReplayError::not_found(
                self.display.clone(),
                "not a directory",
            ));
        }

        let mut shards = Vec::new();
        collect_shards(&self.root, &self.root, suffix, &mut shards)?;
        Ok(shards)
    }

    fn open(&self, location: &str) -> Result<Box<dyn Read + '_>> {
        let file = File::open(location).map_err(|err| ReplayError::unreadable(location, err))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn collect_shards(
    root: &Path,
    dir: &Path,
    suffix: &str,
    out: &mut Vec<ShardObject>,
) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_shards(root, &path, suffix, out)?;
            continue;
        }
        // Symlinked directories are not walked; they may loop back.
        if file_type.is_symlink() && path.is_dir() {
            log::debug!("not following directory symlink {}", path.display());
            continue;
        }

        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !name.ends_with(suffix) {
            continue;
        }
        out.push(ShardObject {
            location: path.to_string_lossy().into_owned(),
            name,
        });
    }
    Ok(())
}
