use crate::error::Error;
use crate::fingerprint::Fingerprint;
use crate::index::{DestinationIndex, Occupant};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing at the path yet; write it as-is.
    Write(PathBuf),
    /// Identical content is already there.
    Skip,
    /// Different content holds the path; write under a numbered variant.
    Rename(PathBuf),
}

impl Decision {
    pub fn target(&self) -> Option<&Path> {
        match self {
            Decision::Write(p) | Decision::Rename(p) => Some(p),
            Decision::Skip => None,
        }
    }
}

/// Decide where an incoming file lands and record the outcome in `index`.
///
/// The index is updated for `Write` and `Rename` before the bytes hit the
/// disk; callers must [`DestinationIndex::forget`] the target if the write fails.
pub fn resolve(
    relative: &Path,
    incoming: &Fingerprint,
    index: &mut DestinationIndex,
) -> Result<Decision, Error> {
    let decision = match index.occupant(relative)? {
        None => {
            index.record(relative, incoming.clone())?;
            Decision::Write(relative.to_path_buf())
        }
        Some(Occupant::File(existing)) if existing == *incoming => Decision::Skip,
        Some(_) => {
            let variant = next_free_variant(relative, index);
            index.record(&variant, incoming.clone())?;
            Decision::Rename(variant)
        }
    };
    debug!("{} -> {:?}", relative.display(), decision);
    Ok(decision)
}

/// `name-N.ext` for `relative`. Only the final extension segment is treated
/// as the extension; names without one get the suffix appended.
pub fn numbered_variant(relative: &Path, counter: u64) -> PathBuf {
    let parent = relative.parent().unwrap_or_else(|| Path::new(""));
    let mut name = OsString::from(relative.file_stem().unwrap_or_default());
    name.push(format!("-{}", counter));
    if let Some(ext) = relative.extension() {
        name.push(".");
        name.push(ext);
    }
    parent.join(name)
}

/// Lowest numbered variant (N >= 1) not taken in the index or on disk.
fn next_free_variant(relative: &Path, index: &DestinationIndex) -> PathBuf {
    (1..)
        .map(|counter| numbered_variant(relative, counter))
        .find(|candidate| !index.is_occupied(candidate))
        .unwrap_or_else(|| relative.to_path_buf())
}
