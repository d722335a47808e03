use crate::decoder::FilenameDecoder;
use crate::engine::{ArchiveStats, ExtractionEngine};
use crate::error::Error;
use crate::fingerprint::Strategy;
use crate::index::DestinationIndex;
use crate::natural;
use crate::preflight::{self, FreeSpace, Reserve, VolumeFreeSpace};
use crate::progress::ProgressReporter;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub destination: PathBuf,
    pub strategy: Strategy,
    pub decoder: FilenameDecoder,
    pub reserve: Reserve,
    /// Process at most this many archives, after sorting.
    pub limit: Option<usize>,
}

impl BatchOptions {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            strategy: Strategy::default(),
            decoder: FilenameDecoder::default(),
            reserve: Reserve::default(),
            limit: None,
        }
    }
}

/// Result of one archive, handed to the reporter and the disposition hook.
#[derive(Debug)]
pub struct ArchiveOutcome {
    pub archive: PathBuf,
    pub result: Result<ArchiveStats, Error>,
}

impl ArchiveOutcome {
    /// Extracted with no failed entries.
    pub fn succeeded(&self) -> bool {
        matches!(&self.result, Ok(stats) if stats.is_clean())
    }

    pub fn error_count(&self) -> usize {
        match &self.result {
            Ok(stats) => stats.failures.len(),
            Err(_) => 1,
        }
    }
}

/// What happens to an archive file once it has been processed.
/// The core never moves archives itself.
pub trait ArchiveDisposition {
    fn dispose(&self, outcome: &ArchiveOutcome) -> Result<(), Error>;
}

/// Leaves archives where they are.
pub struct KeepInPlace;

impl ArchiveDisposition for KeepInPlace {
    fn dispose(&self, _outcome: &ArchiveOutcome) -> Result<(), Error> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct BatchSummary {
    pub archives: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub extracted: u64,
    pub skipped: u64,
    pub renamed: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub errors: usize,
    pub cancelled: bool,
    pub duration: Duration,
}

impl BatchSummary {
    fn absorb(&mut self, outcome: &ArchiveOutcome) {
        self.archives += 1;
        if outcome.succeeded() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.errors += outcome.error_count();
        if let Ok(stats) = &outcome.result {
            self.extracted += stats.extracted;
            self.skipped += stats.skipped;
            self.renamed += stats.renamed;
            self.bytes_in += stats.bytes_in;
            self.bytes_out += stats.bytes_out;
        }
    }
}

/// Deduplicate, sort naturally and truncate the archive list.
pub fn prepare_archives(archives: Vec<PathBuf>, limit: Option<usize>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut unique: Vec<PathBuf> = archives
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect();
    natural::sort_paths(&mut unique);
    if let Some(limit) = limit {
        unique.truncate(limit);
    }
    unique
}

/// Sequential batch driver: one archive at a time, one shared index.
pub struct BatchRunner {
    options: BatchOptions,
    free_space: Box<dyn FreeSpace>,
    cancel: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(options: BatchOptions) -> Self {
        Self {
            options,
            free_space: Box::new(VolumeFreeSpace),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_free_space(mut self, free_space: impl FreeSpace + 'static) -> Self {
        self.free_space = Box::new(free_space);
        self
    }

    /// Setting this flag stops the batch before the next archive.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn run(
        &self,
        archives: Vec<PathBuf>,
        reporter: &dyn ProgressReporter,
        disposition: &dyn ArchiveDisposition,
    ) -> Result<BatchSummary, Error> {
        let start = Instant::now();
        let archives = prepare_archives(archives, self.options.limit);
        let destination = &self.options.destination;

        let space = preflight::check_space(
            &archives,
            destination,
            self.options.reserve,
            self.free_space.as_ref(),
        )?;
        info!(
            "{} archive(s), {} bytes to extract, {} bytes usable",
            archives.len(),
            space.required,
            space.usable
        );

        let mut index = DestinationIndex::new(destination.clone(), self.options.strategy);
        let engine = ExtractionEngine::new(self.options.decoder.clone())
            .with_cancel_flag(self.cancel_flag());
        let mut summary = BatchSummary::default();

        reporter.on_batch_start(archives.len());
        let total = archives.len();
        for (position, archive) in archives.into_iter().enumerate() {
            if self.cancel.load(Ordering::SeqCst) {
                warn!("Cancelled; {} archive(s) left unprocessed", total - position);
                summary.cancelled = true;
                break;
            }

            reporter.on_archive_start(position + 1, total, &archive);
            let result = engine.extract_archive(&archive, &mut index, reporter);
            if let Err(e) = &result {
                error!("{}", e);
            }
            let outcome = ArchiveOutcome { archive, result };

            summary.absorb(&outcome);
            reporter.on_archive_complete(&outcome);
            if let Err(e) = disposition.dispose(&outcome) {
                error!("Could not move {}: {}", outcome.archive.display(), e);
                summary.errors += 1;
            }
        }
        // An interrupt during the last archive leaves nothing to skip but still counts.
        if self.cancel.load(Ordering::SeqCst) {
            summary.cancelled = true;
        }

        summary.duration = start.elapsed();
        reporter.on_batch_complete(&summary);
        Ok(summary)
    }
}
