mod archives;
mod commands;
mod disposition;
mod logging;
mod progress;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::Parser;
use colored::*;
use commands::Cli;
use disposition::MoveToFolders;
use dotenv::dotenv;
use mass_unpack_core::{BatchOptions, BatchRunner, Error};
use progress::CliReporter;
use tracing::{error, warn};

const EXIT_ARCHIVE_ERRORS: u8 = 1;
const EXIT_FATAL: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    dotenv().ok();
    let args = Cli::parse();
    let _guard = logging::init_logger(args.verbose);

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("{} {:#}", "Fatal error:".red(), err);
            match err.downcast_ref::<Error>() {
                Some(Error::Cancelled) => ExitCode::from(EXIT_INTERRUPTED),
                _ => ExitCode::from(EXIT_FATAL),
            }
        }
    }
}

fn run(args: Cli) -> anyhow::Result<ExitCode> {
    let config = mass_unpack_core::config::load_configuration()
        .context("Error loading configuration")?;

    let destination = args.extract_to.unwrap_or_else(|| PathBuf::from("."));
    let ok_dir = args.mv_ok.unwrap_or_else(|| config.ok_dir.clone());
    let err_dir = args.mv_er.unwrap_or_else(|| config.err_dir.clone());

    std::fs::create_dir_all(&destination)
        .with_context(|| format!("Cannot create extraction directory {}", destination.display()))?;
    let mover = MoveToFolders::new(ok_dir, err_dir).context("Cannot create OK/ERR directories")?;

    let archives = archives::expand_patterns(&args.patterns);
    if archives.is_empty() {
        eprintln!(
            "{}",
            format!("No zip files found matching: {}", args.patterns.join(", ")).red()
        );
        return Ok(ExitCode::from(EXIT_ARCHIVE_ERRORS));
    }

    let mut options = BatchOptions::new(destination);
    options.strategy = args.collision.unwrap_or(config.collision);
    options.decoder = config.decoder()?;
    options.reserve = config.reserve();
    options.limit = args.count;

    let runner = BatchRunner::new(options);
    let cancel = runner.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst)) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    let show_bar = !args.no_progress && std::io::stdout().is_terminal();
    let reporter = CliReporter::new(show_bar);
    let summary = runner.run(archives, &reporter, &mover)?;

    if summary.cancelled {
        eprintln!("{}", "Operation interrupted by user (Ctrl-C)".red());
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    if summary.errors > 0 {
        return Ok(ExitCode::from(EXIT_ARCHIVE_ERRORS));
    }
    Ok(ExitCode::SUCCESS)
}
