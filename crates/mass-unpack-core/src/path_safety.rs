use crate::error::Error;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// An entry path proven to stay inside the destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafePath {
    relative: PathBuf,
    absolute: PathBuf,
}

impl SafePath {
    /// Destination-relative path, built from normal components only.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn absolute(&self) -> &Path {
        &self.absolute
    }
}

fn reject(path: &str, reason: &'static str) -> Error {
    Error::PathTraversal {
        path: path.to_string(),
        reason,
    }
}

fn has_drive_specifier(name: &str) -> bool {
    let bytes = name.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Validate a decoded entry name against `root`.
///
/// `name` must already use `/` separators. Empty and `.` segments are dropped;
/// `..`, absolute paths and drive specifiers are rejected outright.
pub fn sanitize(name: &str, root: &Path) -> Result<SafePath, Error> {
    if name.contains('\0') {
        return Err(reject(name, "embedded NUL byte"));
    }
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(reject(name, "absolute path"));
    }
    if has_drive_specifier(name) {
        return Err(reject(name, "drive specifier"));
    }

    let mut relative = PathBuf::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(reject(name, "parent directory segment")),
            _ => {}
        }
        // A segment must stay a single plain component on every platform.
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => relative.push(segment),
            _ => return Err(reject(name, "not a plain path segment")),
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(reject(name, "empty path"));
    }

    let absolute = root.join(&relative);
    if !absolute.starts_with(root) {
        return Err(reject(name, "resolves outside destination"));
    }
    if escapes_through_link(root, &relative) {
        return Err(reject(name, "resolves outside destination through a link"));
    }

    Ok(SafePath { relative, absolute })
}

/// Follow the part of `relative` that already exists on disk and check that
/// no symlink along it leads out of `root`.
fn escapes_through_link(root: &Path, relative: &Path) -> bool {
    let canonical_root = match fs::canonicalize(root) {
        Ok(p) => p,
        Err(_) => return false,
    };

    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        let metadata = match fs::symlink_metadata(&current) {
            Ok(m) => m,
            Err(_) => return false,
        };
        if metadata.file_type().is_symlink() {
            match fs::canonicalize(&current) {
                Ok(target) if target.starts_with(&canonical_root) => {}
                Ok(_) => return true,
                // Dangling link: writing through it could land anywhere.
                Err(_) => return true,
            }
        }
    }
    false
}
