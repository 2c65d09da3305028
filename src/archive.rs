//! ZIP upload handling

use crate::error::Result;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Local file header, empty archive, and spanned archive signatures
const ZIP_MAGIC: &[&[u8]] = &[b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

/// Cheap content check; the extension alone is not trusted
pub fn looks_like_zip(bytes: &[u8]) -> bool {
    ZIP_MAGIC.iter().any(|magic| bytes.starts_with(magic))
}

/// What [`extract`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub files: usize,
    pub skipped: usize,
}

/// Extract every entry of `zip_path` into `dest`.
///
/// Entries whose names would land outside `dest` (absolute paths, `..`
/// components) are skipped, not extracted.
pub fn extract(zip_path: &Path, dest: &Path) -> Result<ExtractStats> {
    let mut archive = zip::ZipArchive::new(File::open(zip_path)?)?;
    let mut stats = ExtractStats::default();
    fs::create_dir_all(dest)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        let rel = match entry.enclosed_name() {
            Some(p) => p.to_path_buf(),
            None => {
                warn!(name = entry.name(), "skipping archive entry outside extraction root");
                stats.skipped += 1;
                continue;
            }
        };
        let out = dest.join(&rel);

        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = File::create(&out)?;
        io::copy(&mut entry, &mut file)?;
        stats.files += 1;
    }

    debug!(files = stats.files, skipped = stats.skipped, dest = %dest.display(), "extracted archive");
    Ok(stats)
}
