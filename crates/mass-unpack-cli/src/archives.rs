use glob::glob;
use std::path::PathBuf;
use tracing::{error, warn};

fn is_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Expand glob patterns and literal paths into archive files.
/// Ordering and deduplication are left to the batch runner.
pub fn expand_patterns(patterns: &[String]) -> Vec<PathBuf> {
    let mut archives = Vec::new();
    for pattern in patterns {
        if !is_pattern(pattern) {
            let path = PathBuf::from(pattern);
            if path.is_file() {
                archives.push(path);
            } else {
                warn!("No such archive: {}", pattern);
            }
            continue;
        }

        match glob(pattern) {
            Ok(paths) => {
                for entry in paths {
                    match entry {
                        Ok(path) if path.is_file() => archives.push(path),
                        Ok(_) => {}
                        Err(e) => error!("Error reading match for '{}': {}", pattern, e),
                    }
                }
            }
            Err(e) => error!("Invalid glob pattern '{}': {}", pattern, e),
        }
    }
    archives
}
