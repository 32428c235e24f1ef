//! Whole-repository snapshots exchanged with the companion.
//!
//! A snapshot is the staging directory as a gzip-compressed tar.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::SyncResult;

/// Archive everything under `source_dir` into `archive_path`.
///
/// Returns the archive size in bytes.
pub fn pack(source_dir: &Path, archive_path: &Path) -> SyncResult<u64> {
    let file = File::create(archive_path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", source_dir)?;
    let encoder = builder.into_inner()?;
    let file = encoder.finish()?;
    let size = file.metadata()?.len();
    debug!(source = %source_dir.display(), archive = %archive_path.display(), size, "snapshot packed");
    Ok(size)
}

/// Ref state replaced wholesale by every snapshot. Objects are kept.
const REF_STATE: [&str; 3] = ["refs", "packed-refs", "HEAD"];

/// Extract `archive_path` into `dest_dir`, then delete the archive.
///
/// The existing ref state of `dest_dir` is removed first, so refs deleted on
/// the remote do not survive the unpack.
pub fn unpack(archive_path: &Path, dest_dir: &Path) -> SyncResult<()> {
    fs::create_dir_all(dest_dir)?;
    let file = File::open(archive_path)?;
    clear_ref_state(dest_dir)?;
    let mut archive = tar::Archive::new(GzDecoder::new(file));
    archive.set_overwrite(true);
    archive.unpack(dest_dir)?;
    fs::remove_file(archive_path)?;
    debug!(archive = %archive_path.display(), dest = %dest_dir.display(), "snapshot unpacked");
    Ok(())
}

fn clear_ref_state(dir: &Path) -> io::Result<()> {
    for name in REF_STATE {
        let path = dir.join(name);
        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => fs::remove_dir_all(&path)?,
            Ok(_) => fs::remove_file(&path)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
