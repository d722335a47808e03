use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use mass_unpack_core::engine::ExtractionEngine;
use mass_unpack_core::{DestinationIndex, Error, SilentReporter, Strategy};

/// Write a zip with the given entries. Names ending in `/` become directories.
fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
    }
    zip.finish().unwrap();
}

/// Replace every occurrence of `from` with the same-length `to` in a file.
/// Used to plant non-UTF-8 names, which the zip writer cannot produce.
fn patch_bytes(path: &Path, from: &[u8], to: &[u8]) {
    assert_eq!(from.len(), to.len());
    let mut data = fs::read(path).unwrap();
    let mut i = 0;
    let mut replaced = 0;
    while i + from.len() <= data.len() {
        if &data[i..i + from.len()] == from {
            data[i..i + from.len()].copy_from_slice(to);
            replaced += 1;
            i += from.len();
        } else {
            i += 1;
        }
    }
    assert!(replaced >= 2, "expected local and central headers to be patched");
    fs::write(path, data).unwrap();
}

/// Stored (uncompressed) zip, so entry payloads appear verbatim in the file.
fn write_stored_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

/// Flip the single occurrence of `from` to `to`, leaving the recorded CRC stale.
fn corrupt_payload(path: &Path, from: &[u8], to: &[u8]) {
    assert_eq!(from.len(), to.len());
    let mut data = fs::read(path).unwrap();
    let at = data
        .windows(from.len())
        .position(|w| w == from)
        .expect("payload present");
    data[at..at + from.len()].copy_from_slice(to);
    fs::write(path, data).unwrap();
}

fn staging_leftovers(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                found.extend(staging_leftovers(&path));
            } else if path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with(".mass-unpack-"))
                .unwrap_or(false)
            {
                found.push(path);
            }
        }
    }
    found
}

#[test]
fn test_identical_content_across_archives_skips() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let first = src.path().join("one.zip");
    let second = src.path().join("two.zip");
    write_zip(&first, &[("a.txt", "X")]);
    write_zip(&second, &[("a.txt", "X")]);

    let engine = ExtractionEngine::default();
    let mut index = DestinationIndex::new(dest.path(), Strategy::HashSha256);
    let s1 = engine.extract_archive(&first, &mut index, &SilentReporter).unwrap();
    let s2 = engine.extract_archive(&second, &mut index, &SilentReporter).unwrap();

    assert_eq!(s1.extracted + s2.extracted, 1);
    assert_eq!(s1.skipped + s2.skipped, 1);
    assert_eq!(s1.renamed + s2.renamed, 0);
    assert_eq!(fs::read(dest.path().join("a.txt")).unwrap(), b"X");
    assert!(!dest.path().join("a-1.txt").exists());
    assert!(staging_leftovers(dest.path()).is_empty());
}

#[test]
fn test_different_content_is_renamed() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let first = src.path().join("one.zip");
    let second = src.path().join("two.zip");
    write_zip(&first, &[("a.txt", "X")]);
    write_zip(&second, &[("a.txt", "Y")]);

    let engine = ExtractionEngine::default();
    let mut index = DestinationIndex::new(dest.path(), Strategy::HashSha256);
    let s1 = engine.extract_archive(&first, &mut index, &SilentReporter).unwrap();
    let s2 = engine.extract_archive(&second, &mut index, &SilentReporter).unwrap();

    assert_eq!(s1.extracted + s2.extracted, 1);
    assert_eq!(s1.skipped + s2.skipped, 0);
    assert_eq!(s1.renamed + s2.renamed, 1);
    assert_eq!(fs::read(dest.path().join("a.txt")).unwrap(), b"X");
    assert_eq!(fs::read(dest.path().join("a-1.txt")).unwrap(), b"Y");

    assert_eq!(s2.collisions.len(), 1);
    let notice = &s2.collisions[0];
    assert_eq!(notice.archive, second);
    assert_eq!(notice.original, PathBuf::from("a.txt"));
    assert_eq!(notice.renamed_to, PathBuf::from("a-1.txt"));
}

#[test]
fn test_three_variants_in_one_archive_sequence() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let engine = ExtractionEngine::default();
    let mut index = DestinationIndex::new(dest.path(), Strategy::HashFast);

    for (i, content) in ["first", "second", "third"].iter().enumerate() {
        let archive = src.path().join(format!("p{}.zip", i));
        write_zip(&archive, &[("photos/photo.jpg", *content)]);
        engine.extract_archive(&archive, &mut index, &SilentReporter).unwrap();
    }

    let photos = dest.path().join("photos");
    assert_eq!(fs::read(photos.join("photo.jpg")).unwrap(), b"first");
    assert_eq!(fs::read(photos.join("photo-1.jpg")).unwrap(), b"second");
    assert_eq!(fs::read(photos.join("photo-2.jpg")).unwrap(), b"third");
}

#[test]
fn test_traversal_entries_fail_alone() {
    let src = tempdir().unwrap();
    let dest_parent = tempdir().unwrap();
    let dest = dest_parent.path().join("out");
    let archive = src.path().join("evil.zip");
    write_zip(
        &archive,
        &[
            ("../../etc/passwd", "root"),
            ("/etc/passwd", "root"),
            ("sub/dir/file.txt", "fine"),
        ],
    );

    let engine = ExtractionEngine::default();
    let mut index = DestinationIndex::new(&dest, Strategy::HashFast);
    let stats = engine.extract_archive(&archive, &mut index, &SilentReporter).unwrap();

    assert_eq!(stats.extracted, 1);
    assert_eq!(stats.failures.len(), 2);
    assert!(!stats.is_clean());
    for failure in &stats.failures {
        assert!(matches!(failure.error, Error::PathTraversal { .. }));
    }
    assert_eq!(fs::read(dest.join("sub/dir/file.txt")).unwrap(), b"fine");
    assert!(!dest_parent.path().join("etc").exists());
}

#[test]
fn test_checksum_failure_aborts_only_that_entry() {
    for strategy in [Strategy::Size, Strategy::HashFast] {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        let archive = src.path().join("damaged.zip");
        write_stored_zip(
            &archive,
            &[("bad.txt", "payload-intact-0001"), ("good.txt", "fine")],
        );
        corrupt_payload(&archive, b"payload-intact-0001", b"payload-intact-0002");

        let engine = ExtractionEngine::default();
        let mut index = DestinationIndex::new(dest.path(), strategy);
        let stats = engine.extract_archive(&archive, &mut index, &SilentReporter).unwrap();

        assert_eq!(stats.extracted, 1, "{}", strategy);
        assert_eq!(stats.failures.len(), 1, "{}", strategy);
        assert_eq!(stats.failures[0].entry, "bad.txt");
        match &stats.failures[0].error {
            Error::EntryRead { archive: from, entry, .. } => {
                assert_eq!(from, &archive);
                assert_eq!(entry, "bad.txt");
            }
            other => panic!("unexpected error under {}: {}", strategy, other),
        }
        assert_eq!(fs::read(dest.path().join("good.txt")).unwrap(), b"fine");
        assert!(!dest.path().join("bad.txt").exists());
        assert!(staging_leftovers(dest.path()).is_empty());
        assert!(!index.is_occupied(Path::new("bad.txt")));
        assert_eq!(index.len(), 1);
    }
}

#[test]
fn test_corrupt_archive_fails_whole_call() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = src.path().join("broken.zip");
    fs::write(&archive, b"PK\x03\x04 definitely not a zip").unwrap();

    let engine = ExtractionEngine::default();
    let mut index = DestinationIndex::new(dest.path(), Strategy::HashFast);
    let result = engine.extract_archive(&archive, &mut index, &SilentReporter);
    assert!(matches!(result, Err(Error::ArchiveCorrupt { .. })));
}

#[test]
fn test_directory_entries_are_created() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = src.path().join("dirs.zip");
    write_zip(&archive, &[("empty/", ""), ("docs/", ""), ("docs/readme", "hi")]);

    let engine = ExtractionEngine::default();
    let mut index = DestinationIndex::new(dest.path(), Strategy::HashFast);
    let stats = engine.extract_archive(&archive, &mut index, &SilentReporter).unwrap();

    assert_eq!(stats.directories, 2);
    assert_eq!(stats.extracted, 1);
    assert!(dest.path().join("empty").is_dir());
    assert_eq!(fs::read(dest.path().join("docs/readme")).unwrap(), b"hi");
}

#[test]
fn test_legacy_cp866_name_is_decoded() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = src.path().join("dos.zip");
    write_zip(&archive, &[("QQQQQQ.txt", "dos")]);
    // "Привет" in code page 866
    patch_bytes(&archive, b"QQQQQQ", &[0x8F, 0xE0, 0xA8, 0xA2, 0xA5, 0xE2]);

    let engine = ExtractionEngine::default();
    let mut index = DestinationIndex::new(dest.path(), Strategy::HashFast);
    let stats = engine.extract_archive(&archive, &mut index, &SilentReporter).unwrap();

    assert_eq!(stats.extracted, 1);
    assert_eq!(stats.decode_fallbacks, 0);
    assert_eq!(fs::read(dest.path().join("Привет.txt")).unwrap(), b"dos");
}

#[test]
fn test_rerun_never_overwrites() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let first = src.path().join("one.zip");
    let second = src.path().join("two.zip");
    write_zip(&first, &[("a.txt", "X"), ("b.txt", "B")]);
    write_zip(&second, &[("a.txt", "Y")]);

    let engine = ExtractionEngine::default();
    let mut index = DestinationIndex::new(dest.path(), Strategy::HashSha256);
    engine.extract_archive(&first, &mut index, &SilentReporter).unwrap();
    engine.extract_archive(&second, &mut index, &SilentReporter).unwrap();

    // Fresh index over the same destination, as a resumed run would see it.
    let mut index = DestinationIndex::new(dest.path(), Strategy::HashSha256);
    let r1 = engine.extract_archive(&first, &mut index, &SilentReporter).unwrap();
    let r2 = engine.extract_archive(&second, &mut index, &SilentReporter).unwrap();

    assert_eq!(r1.extracted + r2.extracted, 0);
    assert_eq!(r1.skipped, 2);
    assert_eq!(r2.renamed, 1);
    assert_eq!(fs::read(dest.path().join("a.txt")).unwrap(), b"X");
    assert_eq!(fs::read(dest.path().join("a-1.txt")).unwrap(), b"Y");
    assert_eq!(fs::read(dest.path().join("a-2.txt")).unwrap(), b"Y");
}

#[test]
fn test_byte_counters_track_written_entries() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let archive = src.path().join("big.zip");
    let payload = "z".repeat(64 * 1024);
    write_zip(&archive, &[("big.bin", payload.as_str())]);

    let engine = ExtractionEngine::default();
    let mut index = DestinationIndex::new(dest.path(), Strategy::Size);
    let stats = engine.extract_archive(&archive, &mut index, &SilentReporter).unwrap();

    assert_eq!(stats.bytes_out, payload.len() as u64);
    assert!(stats.bytes_in > 0 && stats.bytes_in < stats.bytes_out);
    assert!(stats.compression_ratio() > 50.0);
}
