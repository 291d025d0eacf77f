use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::NamedTempFile;

use crate::domain::{AuthorityName, PricePaidVersion, sanitize_name};
use crate::error::DatapointsError;

pub const POLYGON_EXT: &str = "gml";
pub const PRICE_PAID_EXT: &str = "csv";

/// On-disk layout of the download cache.
///
/// The directory listing is the index: every lookup re-reads the directory,
/// so files added or removed out of band are seen immediately.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn index_polygons_dir(&self) -> Utf8PathBuf {
        self.root.join("index_polygons")
    }

    pub fn price_paid_dir(&self) -> Utf8PathBuf {
        self.root.join("price_paid_data")
    }

    pub fn temp_dir(&self) -> Utf8PathBuf {
        self.root.join("temp")
    }

    pub fn polygon_file_name(name: &AuthorityName) -> String {
        format!("{}.{POLYGON_EXT}", name.file_stem())
    }

    pub fn polygon_path(&self, name: &AuthorityName) -> Utf8PathBuf {
        self.index_polygons_dir()
            .join(Self::polygon_file_name(name))
    }

    pub fn price_paid_path(&self, version: PricePaidVersion) -> Utf8PathBuf {
        self.price_paid_dir()
            .join(format!("{version}.{PRICE_PAID_EXT}"))
    }

    pub fn ensure_dir(path: &Utf8Path) -> Result<(), DatapointsError> {
        fs::create_dir_all(path.as_std_path())
            .map_err(|err| DatapointsError::Filesystem(format!("create {path}: {err}")))
    }

    /// Cached polygon file for `name`, matched by exact file name.
    pub fn get_polygon(&self, name: &str) -> Result<Option<Utf8PathBuf>, DatapointsError> {
        let wanted = format!("{}.{POLYGON_EXT}", sanitize_name(name));
        find_file(&self.index_polygons_dir(), &wanted)
    }

    pub fn list_polygons(&self) -> Result<Vec<Utf8PathBuf>, DatapointsError> {
        scan_dir(&self.index_polygons_dir(), POLYGON_EXT)
    }

    pub fn get_price_paid(
        &self,
        version: PricePaidVersion,
    ) -> Result<Option<Utf8PathBuf>, DatapointsError> {
        let wanted = format!("{version}.{PRICE_PAID_EXT}");
        find_file(&self.price_paid_dir(), &wanted)
    }

    pub fn list_price_paid(&self) -> Result<Vec<Utf8PathBuf>, DatapointsError> {
        scan_dir(&self.price_paid_dir(), PRICE_PAID_EXT)
    }

    /// Writes `content` next to `path` and renames it into place, so readers
    /// never observe a partially written cache file.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), DatapointsError> {
        let mut partial = Self::partial_file(path)?;
        partial
            .write_all(content)
            .map_err(|err| DatapointsError::Filesystem(err.to_string()))?;
        Self::persist_partial(partial, path)
    }

    /// A temp file in the directory of `path`, removed on drop unless persisted.
    pub fn partial_file(path: &Utf8Path) -> Result<NamedTempFile, DatapointsError> {
        let parent = path
            .parent()
            .ok_or_else(|| DatapointsError::Filesystem("invalid destination path".to_string()))?;
        Self::ensure_dir(parent)?;
        tempfile::Builder::new()
            .prefix(".datapoints-partial")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| DatapointsError::Filesystem(err.to_string()))
    }

    pub fn persist_partial(partial: NamedTempFile, path: &Utf8Path) -> Result<(), DatapointsError> {
        partial
            .persist(path.as_std_path())
            .map_err(|err| DatapointsError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

fn find_file(dir: &Utf8Path, file_name: &str) -> Result<Option<Utf8PathBuf>, DatapointsError> {
    Ok(read_entries(dir)?
        .into_iter()
        .find(|path| path.file_name() == Some(file_name)))
}

fn scan_dir(dir: &Utf8Path, ext: &str) -> Result<Vec<Utf8PathBuf>, DatapointsError> {
    let mut files = read_entries(dir)?
        .into_iter()
        .filter(|path| path.extension() == Some(ext))
        .collect::<Vec<_>>();
    files.sort();
    Ok(files)
}

fn read_entries(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, DatapointsError> {
    if !dir.as_std_path().exists() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir.as_std_path())
        .map_err(|err| DatapointsError::Filesystem(format!("list {dir}: {err}")))?;
    let mut items = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| DatapointsError::Filesystem(err.to_string()))?;
        if !entry.path().is_file() {
            continue;
        }
        // Non UTF-8 names cannot match a logical name, skip them.
        if let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) {
            items.push(path);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new("downloads");
        let name: AuthorityName = "City of London".parse().unwrap();

        assert_eq!(
            store.polygon_path(&name),
            Utf8PathBuf::from("downloads/index_polygons/City_of_London.gml")
        );
        assert_eq!(
            store.price_paid_path(PricePaidVersion::Complete),
            Utf8PathBuf::from("downloads/price_paid_data/complete.csv")
        );
        assert_eq!(store.temp_dir(), Utf8PathBuf::from("downloads/temp"));
    }
}
