use crate::batch::{ArchiveOutcome, BatchSummary};
use crate::engine::CollisionNotice;
use std::path::Path;

/// Trait for reporting batch progress.
///
/// The CLI implements it with indicatif and colored output; tests use
/// [`SilentReporter`]. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_batch_start(&self, _archives: usize) {}
    fn on_archive_start(&self, _position: usize, _total: usize, _archive: &Path) {}
    fn on_entry(&self, _name: &str) {}
    fn on_collision(&self, _notice: &CollisionNotice) {}
    fn on_archive_complete(&self, _outcome: &ArchiveOutcome) {}
    fn on_batch_complete(&self, _summary: &BatchSummary) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
