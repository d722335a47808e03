pub mod batch;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod natural;
pub mod path_safety;
pub mod preflight;
pub mod progress;
pub mod resolver;

pub use batch::{ArchiveDisposition, ArchiveOutcome, BatchOptions, BatchRunner, BatchSummary, KeepInPlace};
pub use config::AppConfig;
pub use engine::{ArchiveStats, CollisionNotice, EntryFailure, ExtractionEngine};
pub use error::Error;
pub use fingerprint::{Fingerprint, Strategy};
pub use index::DestinationIndex;
pub use progress::{ProgressReporter, SilentReporter};
pub use resolver::Decision;
