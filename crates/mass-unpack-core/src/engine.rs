use crate::decoder::{EncodingHint, FilenameDecoder};
use crate::error::Error;
use crate::fingerprint::{self, Fingerprint, HashingWriter, Strategy};
use crate::index::DestinationIndex;
use crate::path_safety;
use crate::progress::ProgressReporter;
use crate::resolver::{self, Decision};
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use zip::ZipArchive;

const STAGING_PREFIX: &str = ".mass-unpack-";

/// A file that landed under a different name than the archive asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionNotice {
    pub archive: PathBuf,
    pub original: PathBuf,
    pub renamed_to: PathBuf,
}

#[derive(Debug)]
pub struct EntryFailure {
    pub entry: String,
    pub error: Error,
}

/// Counters for one archive. Created fresh per call and not touched after it returns.
#[derive(Debug, Default)]
pub struct ArchiveStats {
    pub archive: PathBuf,
    pub extracted: u64,
    pub skipped: u64,
    pub renamed: u64,
    pub directories: u64,
    /// Declared compressed size of every entry that was written.
    pub bytes_in: u64,
    /// Bytes actually written.
    pub bytes_out: u64,
    pub decode_fallbacks: u64,
    pub collisions: Vec<CollisionNotice>,
    pub failures: Vec<EntryFailure>,
}

impl ArchiveStats {
    fn new(archive: &Path) -> Self {
        Self {
            archive: archive.to_path_buf(),
            ..Default::default()
        }
    }

    /// No entry failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Space saved by compression, as a percentage of the written size.
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_out == 0 {
            return 0.0;
        }
        (1.0 - self.bytes_in as f64 / self.bytes_out as f64) * 100.0
    }
}

/// Central-directory facts about an entry, read before any decompression.
struct EntryMeta {
    name: String,
    is_dir: bool,
    size: u64,
    compressed_size: u64,
}

pub struct ExtractionEngine {
    decoder: FilenameDecoder,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self::new(FilenameDecoder::default())
    }
}

impl ExtractionEngine {
    pub fn new(decoder: FilenameDecoder) -> Self {
        Self {
            decoder,
            cancel: None,
        }
    }

    /// Stop between entries once `flag` is set; the archive then reports a failure.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Extract one archive into `index.root()`.
    ///
    /// Only an unreadable archive fails the call; every per-entry problem is
    /// recorded in the returned stats and extraction moves on.
    pub fn extract_archive(
        &self,
        archive: &Path,
        index: &mut DestinationIndex,
        reporter: &dyn ProgressReporter,
    ) -> Result<ArchiveStats, Error> {
        let file = File::open(archive).map_err(|e| Error::io_at(archive, e))?;
        self.extract_from(archive, BufReader::new(file), index, reporter)
    }

    /// Same as [`extract_archive`](Self::extract_archive) over any seekable reader.
    /// `archive` is only used for reporting.
    pub fn extract_from<R: Read + Seek>(
        &self,
        archive: &Path,
        reader: R,
        index: &mut DestinationIndex,
        reporter: &dyn ProgressReporter,
    ) -> Result<ArchiveStats, Error> {
        let mut zip = ZipArchive::new(reader).map_err(|source| Error::ArchiveCorrupt {
            path: archive.to_path_buf(),
            source,
        })?;

        fs::create_dir_all(index.root()).map_err(|e| Error::io_at(index.root(), e))?;

        let mut stats = ArchiveStats::new(archive);
        for position in 0..zip.len() {
            if self.cancelled() {
                warn!("Cancelled while extracting {}", archive.display());
                stats.failures.push(EntryFailure {
                    entry: format!("#{}", position),
                    error: Error::Cancelled,
                });
                break;
            }

            let meta = match self.read_meta(&mut zip, position, &mut stats) {
                Ok(meta) => meta,
                Err(e) => {
                    error!("Error reading entry #{} of {}: {}", position, archive.display(), e);
                    stats.failures.push(EntryFailure {
                        entry: format!("#{}", position),
                        error: e,
                    });
                    continue;
                }
            };
            reporter.on_entry(&meta.name);

            match self.extract_entry(&mut zip, position, &meta, index, &mut stats) {
                Ok(Some(notice)) => {
                    warn!(
                        "Collision detected: {} -> {}",
                        notice.original.display(),
                        notice.renamed_to.display()
                    );
                    reporter.on_collision(&notice);
                    stats.collisions.push(notice);
                }
                Ok(None) => {}
                Err(e) => {
                    match &e {
                        Error::PathTraversal { .. } => warn!("{} in {}", e, archive.display()),
                        _ => error!("Error extracting {} from {}: {}", meta.name, archive.display(), e),
                    }
                    stats.failures.push(EntryFailure {
                        entry: meta.name,
                        error: e,
                    });
                }
            }
        }

        info!(
            "{}: {} extracted, {} skipped, {} renamed, {} failed",
            archive.display(),
            stats.extracted,
            stats.skipped,
            stats.renamed,
            stats.failures.len()
        );
        Ok(stats)
    }

    fn read_meta<R: Read + Seek>(
        &self,
        zip: &mut ZipArchive<R>,
        position: usize,
        stats: &mut ArchiveStats,
    ) -> Result<EntryMeta, Error> {
        let entry = zip.by_index_raw(position)?;
        // zip only keeps the raw bytes verbatim when it decoded them as UTF-8.
        let hint = if entry.name().as_bytes() == entry.name_raw() {
            EncodingHint::Utf8
        } else {
            EncodingHint::Unspecified
        };
        let decoded = self.decoder.decode(entry.name_raw(), hint);
        if decoded.is_substituted() {
            stats.decode_fallbacks += 1;
        }
        Ok(EntryMeta {
            is_dir: entry.is_dir() || decoded.text.ends_with('/'),
            name: decoded.text,
            size: entry.size(),
            compressed_size: entry.compressed_size(),
        })
    }

    fn extract_entry<R: Read + Seek>(
        &self,
        zip: &mut ZipArchive<R>,
        position: usize,
        meta: &EntryMeta,
        index: &mut DestinationIndex,
        stats: &mut ArchiveStats,
    ) -> Result<Option<CollisionNotice>, Error> {
        let safe = path_safety::sanitize(&meta.name, index.root())?;

        if meta.is_dir {
            fs::create_dir_all(safe.absolute()).map_err(|e| Error::io_at(safe.absolute(), e))?;
            index.record_directory(safe.relative());
            stats.directories += 1;
            return Ok(None);
        }

        let strategy = index.strategy();
        let incoming = match strategy {
            Strategy::Size => Fingerprint {
                strategy,
                size: meta.size,
                digest: None,
            },
            _ => fingerprint::compute(zip.by_index(position)?, strategy)
                .map_err(|e| Error::entry_read(&stats.archive, &meta.name, e))?,
        };

        let decision = resolver::resolve(safe.relative(), &incoming, index)?;
        let target = match decision.target() {
            Some(relative) => relative.to_path_buf(),
            None => {
                debug!("Skipping identical file: {}", safe.relative().display());
                stats.skipped += 1;
                return Ok(None);
            }
        };

        let absolute = index.root().join(&target);
        let written = match self.write_entry(
            zip,
            position,
            meta,
            &stats.archive,
            &absolute,
            &incoming,
        ) {
            Ok(written) => written,
            Err(e) => {
                index.forget(&target);
                return Err(e);
            }
        };
        stats.bytes_in += meta.compressed_size;
        stats.bytes_out += written;

        match decision {
            Decision::Rename(_) => {
                stats.renamed += 1;
                Ok(Some(CollisionNotice {
                    archive: stats.archive.clone(),
                    original: safe.relative().to_path_buf(),
                    renamed_to: target,
                }))
            }
            _ => {
                stats.extracted += 1;
                Ok(None)
            }
        }
    }

    /// Stream the entry into a staging file next to `target` and move it into
    /// place without replacing anything that appeared there meanwhile.
    fn write_entry<R: Read + Seek>(
        &self,
        zip: &mut ZipArchive<R>,
        position: usize,
        meta: &EntryMeta,
        archive: &Path,
        target: &Path,
        expected: &Fingerprint,
    ) -> Result<u64, Error> {
        let parent = target
            .parent()
            .ok_or_else(|| Error::Other(format!("{} has no parent", target.display())))?;
        fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;

        let staged = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(".part")
            .tempfile_in(parent)
            .map_err(|e| Error::io_at(parent, e))?;

        let mut entry = zip.by_index(position)?;
        let mut writer = HashingWriter::new(staged, expected.strategy);
        let mut buffer = [0u8; fingerprint::READ_CHUNK];
        loop {
            let n = match entry.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::entry_read(archive, &meta.name, e)),
            };
            writer
                .write_all(&buffer[..n])
                .map_err(|e| Error::io_at(target, e))?;
        }
        let (staged, actual) = writer.into_parts();

        if expected.digest.is_some() && actual != *expected {
            return Err(Error::Other(format!(
                "content of {} changed between reads",
                meta.name
            )));
        }

        staged
            .persist_noclobber(target)
            .map_err(|e| Error::io_at(target, e.error))?;
        Ok(actual.size)
    }
}
