//! Release archive extraction.

use specgate_core::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Archive format of a downloaded release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Infer the format from a file name.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(ArchiveKind::TarGz)
        } else if name.ends_with(".zip") {
            Some(ArchiveKind::Zip)
        } else {
            None
        }
    }
}

fn archive_error(path: &Path, message: String) -> Error {
    Error::Archive {
        path: path.to_path_buf(),
        message,
    }
}

fn extract_blocking(archive: &Path, dest: &Path, kind: ArchiveKind) -> Result<()> {
    let file = File::open(archive).map_err(|e| archive_error(archive, e.to_string()))?;
    std::fs::create_dir_all(dest).map_err(|e| archive_error(archive, e.to_string()))?;

    match kind {
        ArchiveKind::TarGz => {
            let decoder = flate2::read::GzDecoder::new(file);
            let mut tar = tar::Archive::new(decoder);
            tar.unpack(dest)
                .map_err(|e| archive_error(archive, format!("Failed to unpack archive: {}", e)))?;
        }
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(file)
                .map_err(|e| archive_error(archive, format!("Failed to open zip: {}", e)))?;
            zip.extract(dest)
                .map_err(|e| archive_error(archive, format!("Failed to unpack zip: {}", e)))?;
        }
    }
    Ok(())
}

/// Extract `archive` into `dest` on the blocking pool.
pub async fn extract_archive(archive: &Path, dest: &Path, kind: ArchiveKind) -> Result<()> {
    let archive: PathBuf = archive.to_path_buf();
    let dest: PathBuf = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest, kind))
        .await
        .map_err(|e| Error::Internal(format!("Extraction task failed: {}", e)))?
}
