use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use rand::Rng;
use tracing::debug;

use crate::error::DatapointsError;
use crate::store::Store;

/// Scratch directories for in-flight downloads, one per attempt.
#[derive(Debug, Clone)]
pub struct StagingStore {
    root: Utf8PathBuf,
}

/// A private directory holding the extracted contents of one download attempt.
#[derive(Debug)]
pub struct StagingArea {
    id: String,
    path: Utf8PathBuf,
}

impl StagingArea {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl StagingStore {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn begin(&self) -> Result<StagingArea, DatapointsError> {
        self.begin_with(random_id)
    }

    /// Allocates a staging directory, drawing ids from `next_id` until one is free.
    ///
    /// The directory is created exclusively, so an id claimed by a concurrent
    /// download between the existence check and the create is re-drawn too.
    pub fn begin_with<F>(&self, mut next_id: F) -> Result<StagingArea, DatapointsError>
    where
        F: FnMut() -> String,
    {
        Store::ensure_dir(&self.root)?;
        loop {
            let id = next_id();
            let path = self.root.join(&id);
            if path.as_std_path().exists() {
                continue;
            }
            match fs::create_dir(path.as_std_path()) {
                Ok(()) => {
                    debug!(staging_id = %id, "staging area created");
                    return Ok(StagingArea { id, path });
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(err) => {
                    return Err(DatapointsError::Filesystem(format!(
                        "create staging dir {path}: {err}"
                    )));
                }
            }
        }
    }

    /// Moves `source_filename` out of the staging area into `cache_dir/cache_filename`
    /// and removes the staging area with everything else it contains.
    pub fn promote(
        &self,
        area: StagingArea,
        source_filename: &str,
        cache_dir: &Utf8Path,
        cache_filename: &str,
    ) -> Result<Utf8PathBuf, DatapointsError> {
        let source = area.path.join(source_filename);
        if !source.as_std_path().is_file() {
            self.discard(area)?;
            return Err(DatapointsError::MissingArchiveMember {
                name: cache_filename.to_string(),
                member: source_filename.to_string(),
            });
        }

        let target = cache_dir.join(cache_filename);
        let moved = Store::ensure_dir(cache_dir).and_then(|_| {
            fs::rename(source.as_std_path(), target.as_std_path()).map_err(|err| {
                DatapointsError::Filesystem(format!("move {source} to {target}: {err}"))
            })
        });
        self.discard(area)?;
        moved?;
        Ok(target)
    }

    pub fn discard(&self, area: StagingArea) -> Result<(), DatapointsError> {
        if area.path.as_std_path().exists() {
            fs::remove_dir_all(area.path.as_std_path()).map_err(|err| {
                DatapointsError::Filesystem(format!("remove staging dir {}: {err}", area.path))
            })?;
        }
        debug!(staging_id = %area.id, "staging area removed");
        Ok(())
    }
}

fn random_id() -> String {
    rand::thread_rng().r#gen::<u64>().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_digits() {
        let id = random_id();
        assert!(!id.is_empty());
        assert!(id.chars().all(|ch| ch.is_ascii_digit()));
    }
}
