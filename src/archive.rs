use std::fs;
use std::io::{self, Cursor};
use std::path::Path;

use zip::ZipArchive;

use crate::error::DatapointsError;
use crate::http::HttpSource;

/// Downloads the zip at `url` and extracts every member into `target_dir`.
///
/// `name` only labels errors. A payload that is not a readable zip (an HTML
/// error page, a truncated body) is reported as `CorruptArchive`.
pub async fn fetch_and_extract<H>(
    http: &H,
    name: &str,
    url: &str,
    target_dir: &Path,
) -> Result<(), DatapointsError>
where
    H: HttpSource + ?Sized,
{
    let payload = http.get_bytes(url).await?;
    extract_zip_bytes(name, &payload, target_dir)
}

pub fn extract_zip_bytes(
    name: &str,
    payload: &[u8],
    target_dir: &Path,
) -> Result<(), DatapointsError> {
    let corrupt = |reason: String| DatapointsError::CorruptArchive {
        name: name.to_string(),
        reason,
    };
    let mut archive = ZipArchive::new(Cursor::new(payload)).map_err(|err| corrupt(err.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|err| corrupt(err.to_string()))?;
        let entry_path = match entry.enclosed_name() {
            Some(path) => target_dir.join(path),
            None => return Err(corrupt("zip entry path traversal detected".to_string())),
        };

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .map_err(|err| DatapointsError::Filesystem(err.to_string()))?;
            continue;
        }

        if let Some(parent) = entry_path.parent() {
            fs::create_dir_all(parent).map_err(|err| DatapointsError::Filesystem(err.to_string()))?;
        }
        let mut outfile = fs::File::create(&entry_path)
            .map_err(|err| DatapointsError::Filesystem(err.to_string()))?;
        // A failed read here means the member data itself is damaged.
        io::copy(&mut entry, &mut outfile).map_err(|err| corrupt(err.to_string()))?;
    }
    Ok(())
}
