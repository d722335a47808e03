use clap::Parser;
use mass_unpack_core::Strategy;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mass-unpack")]
#[command(
    about = "Extract many zip archives into one directory, resolving name collisions by content",
    long_about = None
)]
pub struct Cli {
    /// Glob pattern(s) or zip file(s), e.g. 'data/*.zip' or a.zip b.zip
    #[arg(required = true)]
    pub patterns: Vec<String>,

    /// Output directory (default: current directory)
    #[arg(short = 'o', long = "extract-to")]
    pub extract_to: Option<PathBuf>,

    /// Process at most this many archives
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Move successful archives here (default: ./OK)
    #[arg(long = "mv-ok")]
    pub mv_ok: Option<PathBuf>,

    /// Move failed archives here (default: ./ERR)
    #[arg(long = "mv-er")]
    pub mv_er: Option<PathBuf>,

    /// Collision detection: size, hash-fast or hash-sha256
    #[arg(short = 'c', long = "collision")]
    pub collision: Option<Strategy>,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
