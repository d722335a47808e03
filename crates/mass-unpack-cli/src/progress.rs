use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use mass_unpack_core::{ArchiveOutcome, BatchSummary, CollisionNotice, ProgressReporter};
use std::path::Path;
use std::sync::Mutex;

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One-line result for an archive, in the style of
/// `a.zip: 3 extracted, 1 skipped, 0 renamed | 12 KB -> 40 KB (70.0% compression)`.
pub fn archive_line(outcome: &ArchiveOutcome) -> String {
    let name = display_name(&outcome.archive).bold();
    match &outcome.result {
        Ok(stats) => format!(
            "{}: {} extracted, {} skipped, {} renamed | {} KB -> {} KB ({:.1}% compression)",
            name,
            stats.extracted,
            stats.skipped,
            stats.renamed,
            stats.bytes_in / 1024,
            stats.bytes_out / 1024,
            stats.compression_ratio()
        ),
        Err(e) => format!("{}: {}", name, e.to_string().red()),
    }
}

fn failure_lines(outcome: &ArchiveOutcome) -> Vec<String> {
    let name = display_name(&outcome.archive);
    match &outcome.result {
        Ok(stats) => stats
            .failures
            .iter()
            .map(|f| format!("{} in {}: {}: {}", "Error".red(), name, f.entry, f.error))
            .collect(),
        Err(_) => Vec::new(),
    }
}

fn collision_line(notice: &CollisionNotice) -> String {
    format!(
        "{} in {}: {} -> {}",
        "Collision".yellow(),
        display_name(&notice.archive),
        notice.original.display(),
        notice.renamed_to.display()
    )
}

pub fn summary_line(summary: &BatchSummary) -> String {
    format!(
        "Total: {} extracted, {} skipped, {} renamed, {} errors in {:.2}s",
        format!("{}", summary.extracted).green(),
        format!("{}", summary.skipped).cyan(),
        format!("{}", summary.renamed).yellow(),
        format!("{}", summary.errors).red(),
        summary.duration.as_secs_f64()
    )
}

/// CLI progress reporter.
///
/// With a bar, lines are printed above it through indicatif; without one,
/// each archive gets a `[i/n] Processing name...` line.
pub struct CliReporter {
    show_bar: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new(show_bar: bool) -> Self {
        Self {
            show_bar,
            bar: Mutex::new(None),
        }
    }

    fn println(&self, line: String) {
        match self.bar.lock() {
            Ok(guard) if guard.is_some() => {
                if let Some(pb) = guard.as_ref() {
                    pb.println(line);
                }
            }
            _ => println!("{}", line),
        }
    }

    fn eprintln(&self, line: String) {
        match self.bar.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(pb) => pb.suspend(|| eprintln!("{}", line)),
                None => eprintln!("{}", line),
            },
            Err(_) => eprintln!("{}", line),
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_batch_start(&self, archives: usize) {
        println!("Found {} archive(s) to process", archives);
        if !self.show_bar {
            return;
        }
        let pb = ProgressBar::new(archives as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "{spinner:.cyan} {msg} [{bar:30.cyan/dim}] {pos}/{len} ({eta} remaining)",
        ) {
            pb.set_style(
                style
                    .progress_chars("━╸─")
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
            );
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(pb);
        }
    }

    fn on_archive_start(&self, position: usize, total: usize, archive: &Path) {
        let name = display_name(archive);
        match self.bar.lock() {
            Ok(guard) if guard.is_some() => {
                if let Some(pb) = guard.as_ref() {
                    pb.set_message(format!("Processing {}", name));
                }
            }
            _ => println!("[{}/{}] Processing {}...", position, total, name),
        }
    }

    fn on_collision(&self, notice: &CollisionNotice) {
        self.eprintln(collision_line(notice));
    }

    fn on_archive_complete(&self, outcome: &ArchiveOutcome) {
        self.println(archive_line(outcome));
        for line in failure_lines(outcome) {
            self.eprintln(line);
        }
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.inc(1);
            }
        }
    }

    fn on_batch_complete(&self, summary: &BatchSummary) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        println!();
        if summary.cancelled {
            println!("{}", "Processing interrupted".red().bold());
        } else {
            println!("{}", "Processing complete!".green().bold());
        }
        println!("{}", summary_line(summary));
    }
}
