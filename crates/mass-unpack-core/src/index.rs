use crate::error::Error;
use crate::fingerprint::{self, Fingerprint, Strategy};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// What currently sits at a destination-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occupant {
    File(Fingerprint),
    Directory,
}

/// Authoritative record of destination paths for one batch.
///
/// Holds everything written during the run plus pre-existing files, which are
/// fingerprinted lazily the first time something collides with them.
#[derive(Debug)]
pub struct DestinationIndex {
    root: PathBuf,
    strategy: Strategy,
    entries: HashMap<PathBuf, Occupant>,
}

impl DestinationIndex {
    pub fn new(root: impl Into<PathBuf>, strategy: Strategy) -> Self {
        Self {
            root: root.into(),
            strategy,
            entries: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Number of paths known so far, written or fingerprinted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the path is taken in the index or on disk.
    pub fn is_occupied(&self, relative: &Path) -> bool {
        self.entries.contains_key(relative)
            || fs::symlink_metadata(self.root.join(relative)).is_ok()
    }

    /// Look up the occupant of `relative`, fingerprinting a pre-existing file
    /// on first access and caching the result.
    pub fn occupant(&mut self, relative: &Path) -> Result<Option<Occupant>, Error> {
        if let Some(existing) = self.entries.get(relative) {
            return Ok(Some(existing.clone()));
        }

        let absolute = self.root.join(relative);
        let metadata = match fs::metadata(&absolute) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // A dangling symlink still blocks the name.
                if fs::symlink_metadata(&absolute).is_ok() {
                    return Ok(Some(Occupant::Directory));
                }
                return Ok(None);
            }
            Err(e) => return Err(Error::io_at(absolute, e)),
        };

        let occupant = if metadata.is_dir() {
            Occupant::Directory
        } else {
            let fp = fingerprint::compute_file(&absolute, self.strategy)
                .map_err(|e| Error::io_at(&absolute, e))?;
            trace!(
                "Fingerprinted pre-existing {} ({} bytes, {})",
                relative.display(),
                fp.size,
                fp.digest_hex()
            );
            Occupant::File(fp)
        };
        self.entries.insert(relative.to_path_buf(), occupant.clone());
        Ok(Some(occupant))
    }

    /// Record a file written at `relative`.
    ///
    /// Fingerprints from another strategy are refused so comparisons never mix.
    pub fn record(&mut self, relative: &Path, fp: Fingerprint) -> Result<(), Error> {
        if fp.strategy != self.strategy {
            return Err(Error::Other(format!(
                "fingerprint strategy {} does not match batch strategy {}",
                fp.strategy, self.strategy
            )));
        }
        self.entries.insert(relative.to_path_buf(), Occupant::File(fp));
        Ok(())
    }

    pub fn record_directory(&mut self, relative: &Path) {
        self.entries
            .insert(relative.to_path_buf(), Occupant::Directory);
    }

    /// Drop a path recorded for a write that did not complete.
    pub fn forget(&mut self, relative: &Path) {
        self.entries.remove(relative);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lazy_fingerprint_of_existing_file() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.txt"), "X").unwrap();
        let mut index = DestinationIndex::new(tmp.path(), Strategy::HashSha256);
        assert!(index.is_empty());
        assert!(index.is_occupied(Path::new("a.txt")));

        let expected = fingerprint::compute(&b"X"[..], Strategy::HashSha256).unwrap();
        assert_eq!(
            index.occupant(Path::new("a.txt")).unwrap(),
            Some(Occupant::File(expected))
        );
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_missing_path_is_vacant() {
        let tmp = tempdir().unwrap();
        let mut index = DestinationIndex::new(tmp.path(), Strategy::Size);
        assert!(!index.is_occupied(Path::new("nope.txt")));
        assert_eq!(index.occupant(Path::new("nope.txt")).unwrap(), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_existing_directory_occupies_name() {
        let tmp = tempdir().unwrap();
        fs::create_dir(tmp.path().join("photos")).unwrap();
        let mut index = DestinationIndex::new(tmp.path(), Strategy::HashFast);
        assert_eq!(
            index.occupant(Path::new("photos")).unwrap(),
            Some(Occupant::Directory)
        );
    }

    #[test]
    fn test_record_refuses_mixed_strategy() {
        let tmp = tempdir().unwrap();
        let mut index = DestinationIndex::new(tmp.path(), Strategy::HashFast);
        let fp = fingerprint::compute(&b"X"[..], Strategy::Size).unwrap();
        assert!(index.record(Path::new("a.txt"), fp).is_err());
        assert!(!index.is_occupied(Path::new("a.txt")));
    }

    #[test]
    fn test_recorded_paths_count_without_disk() {
        let tmp = tempdir().unwrap();
        let mut index = DestinationIndex::new(tmp.path(), Strategy::HashFast);
        let fp = fingerprint::compute(&b"X"[..], Strategy::HashFast).unwrap();
        index.record(Path::new("virtual.txt"), fp).unwrap();
        assert!(index.is_occupied(Path::new("virtual.txt")));
        index.forget(Path::new("virtual.txt"));
        assert!(!index.is_occupied(Path::new("virtual.txt")));
    }
}
