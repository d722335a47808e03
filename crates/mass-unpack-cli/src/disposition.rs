use mass_unpack_core::resolver::numbered_variant;
use mass_unpack_core::{ArchiveDisposition, ArchiveOutcome, Error};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Moves each processed archive into an OK or ERR directory.
pub struct MoveToFolders {
    ok_dir: PathBuf,
    err_dir: PathBuf,
}

impl MoveToFolders {
    pub fn new(ok_dir: PathBuf, err_dir: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&ok_dir)?;
        fs::create_dir_all(&err_dir)?;
        Ok(Self { ok_dir, err_dir })
    }
}

/// First free name for `file_name` inside `dir`, using the `-N` suffix rule.
fn free_target(dir: &Path, file_name: &Path) -> PathBuf {
    let direct = dir.join(file_name);
    if fs::symlink_metadata(&direct).is_err() {
        return direct;
    }
    (1..)
        .map(|n| dir.join(numbered_variant(file_name, n)))
        .find(|candidate| fs::symlink_metadata(candidate).is_err())
        .unwrap_or(direct)
}

fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) => {
            // Different filesystem: copy and remove instead.
            debug!("rename {} failed ({}), copying", from.display(), e);
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

impl ArchiveDisposition for MoveToFolders {
    fn dispose(&self, outcome: &ArchiveOutcome) -> Result<(), Error> {
        let dir = if outcome.succeeded() {
            &self.ok_dir
        } else {
            &self.err_dir
        };
        let file_name = match outcome.archive.file_name() {
            Some(name) => PathBuf::from(name),
            None => {
                return Err(Error::Other(format!(
                    "{} has no file name",
                    outcome.archive.display()
                )))
            }
        };

        let target = free_target(dir, &file_name);
        if target != dir.join(&file_name) {
            warn!(
                "{} already exists, moving to {}",
                dir.join(&file_name).display(),
                target.display()
            );
        }
        move_file(&outcome.archive, &target).map_err(|source| Error::IoAt {
            path: outcome.archive.clone(),
            source,
        })?;
        debug!("Moved {} to {}", outcome.archive.display(), target.display());
        Ok(())
    }
}
