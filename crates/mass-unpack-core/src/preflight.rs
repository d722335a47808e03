use crate::error::Error;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Free-space query for the destination volume.
pub trait FreeSpace {
    fn free_bytes(&self, path: &Path) -> io::Result<u64>;
}

/// Asks the operating system for space available to the current user.
pub struct VolumeFreeSpace;

impl FreeSpace for VolumeFreeSpace {
    fn free_bytes(&self, path: &Path) -> io::Result<u64> {
        fs2::available_space(path)
    }
}

/// Space kept free on top of the batch's declared size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reserve {
    pub percent: u8,
    pub bytes: u64,
}

impl Default for Reserve {
    fn default() -> Self {
        Self {
            percent: 5,
            bytes: 0,
        }
    }
}

impl Reserve {
    pub fn margin(&self, available: u64) -> u64 {
        let percent = u64::from(self.percent.min(100));
        (available / 100)
            .saturating_mul(percent)
            .saturating_add(self.bytes)
    }
}

#[derive(Debug, Clone)]
pub struct SpaceReport {
    pub required: u64,
    pub available: u64,
    pub usable: u64,
    /// Archives whose central directory could not be read; they fail later.
    pub unreadable: Vec<PathBuf>,
}

/// Sum of declared uncompressed sizes, read from the central directory only.
pub fn declared_uncompressed_size(archive: &Path) -> Result<u64, Error> {
    let file = File::open(archive).map_err(|e| Error::io_at(archive, e))?;
    let mut zip = ZipArchive::new(BufReader::new(file)).map_err(|source| Error::ArchiveCorrupt {
        path: archive.to_path_buf(),
        source,
    })?;

    let mut total: u64 = 0;
    for i in 0..zip.len() {
        let entry = zip.by_index_raw(i).map_err(|source| Error::ArchiveCorrupt {
            path: archive.to_path_buf(),
            source,
        })?;
        total = total.saturating_add(entry.size());
    }
    Ok(total)
}

/// The closest existing ancestor, so the destination need not exist yet.
fn existing_ancestor(path: &Path) -> &Path {
    let mut current = path;
    loop {
        if current.exists() {
            return current;
        }
        match current.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => current = parent,
            _ => return Path::new("."),
        }
    }
}

/// Compare the batch's declared size against free space minus the reserve.
/// Runs once, before anything is written.
pub fn check_space(
    archives: &[PathBuf],
    destination: &Path,
    reserve: Reserve,
    probe: &dyn FreeSpace,
) -> Result<SpaceReport, Error> {
    let mut required: u64 = 0;
    let mut unreadable = Vec::new();

    for archive in archives {
        match declared_uncompressed_size(archive) {
            Ok(size) => required = required.saturating_add(size),
            Err(e) => {
                warn!("Skipping {} in space check: {}", archive.display(), e);
                unreadable.push(archive.clone());
            }
        }
    }

    let volume = existing_ancestor(destination);
    let available = probe
        .free_bytes(volume)
        .map_err(|e| Error::io_at(volume, e))?;
    let usable = available.saturating_sub(reserve.margin(available));
    debug!(
        "Space check: {} bytes required, {} available, {} usable after reserve",
        required, available, usable
    );

    if required > usable {
        return Err(Error::InsufficientSpace {
            required,
            available,
        });
    }

    Ok(SpaceReport {
        required,
        available,
        usable,
        unreadable,
    })
}
