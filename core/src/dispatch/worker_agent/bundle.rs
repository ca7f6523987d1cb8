// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Bundle fetch/extract and result archive packaging.
//!
//! A job's input bundle and its result archive are both flat byte blobs
//! addressed by the Blob Store. Two archive formats are recognized by
//! magic bytes: zip (`PK\x03\x04`) and gzip (`\x1f\x8b`, assumed to wrap
//! a tar stream). Anything else is rejected as `BadBundle`.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive as TarArchive;
use zip::ZipArchive;

use crate::dispatch::error::AgentError;

const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Zip,
    TarGz,
}

fn sniff(bytes: &[u8]) -> Result<ArchiveKind, AgentError> {
    if bytes.len() >= 4 && bytes[..4] == ZIP_MAGIC {
        Ok(ArchiveKind::Zip)
    } else if bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC {
        Ok(ArchiveKind::TarGz)
    } else {
        Err(AgentError::BadBundle(
            "unrecognized archive magic bytes".to_string(),
        ))
    }
}

/// Extracts a bundle's bytes into `dest`, which must already exist.
/// Returns the number of bytes that were extracted from the archive.
pub fn extract_bundle(bytes: &[u8], dest: &Path) -> Result<u64, AgentError> {
    match sniff(bytes)? {
        ArchiveKind::Zip => extract_zip(bytes, dest),
        ArchiveKind::TarGz => extract_tar_gz(bytes, dest),
    }
}

fn extract_zip(bytes: &[u8], dest: &Path) -> Result<u64, AgentError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AgentError::BadBundle(e.to_string()))?;
    let mut total = 0u64;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| AgentError::BadBundle(e.to_string()))?;
        let out_path = match entry.enclosed_name() {
            Some(p) => dest.join(p),
            None => continue,
        };
        if entry.name().ends_with('/') {
            std::fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out_file = std::fs::File::create(&out_path)?;
        total += std::io::copy(&mut entry, &mut out_file)?;
    }
    Ok(total)
}

fn extract_tar_gz(bytes: &[u8], dest: &Path) -> Result<u64, AgentError> {
    let decoder = GzDecoder::new(Cursor::new(bytes));
    let mut archive = TarArchive::new(decoder);
    archive.unpack(dest)?;
    let mut total = 0u64;
    for entry in walk_files(dest) {
        total += std::fs::metadata(&entry).map(|m| m.len()).unwrap_or(0);
    }
    Ok(total)
}

fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out
}

/// Builds a result archive (zip) containing the final workspace contents
/// plus a `logs.txt` of concatenated stdout then stderr, returning the
/// archive bytes ready for upload.
pub fn build_result_archive(workspace: &Path, stdout: &str, stderr: &str) -> Result<Vec<u8>, AgentError> {
    let mut buf = Vec::new();
    {
        let cursor = Cursor::new(&mut buf);
        let mut writer = zip::ZipWriter::new(cursor);
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        writer
            .start_file("logs.txt", options)
            .map_err(|e| AgentError::BadBundle(e.to_string()))?;
        use std::io::Write;
        writer.write_all(stdout.as_bytes())?;
        writer.write_all(stderr.as_bytes())?;

        for path in walk_files(workspace) {
            let rel = path
                .strip_prefix(workspace)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            writer
                .start_file(rel, options)
                .map_err(|e| AgentError::BadBundle(e.to_string()))?;
            let contents = std::fs::read(&path)?;
            writer.write_all(&contents)?;
        }
        writer
            .finish()
            .map_err(|e| AgentError::BadBundle(e.to_string()))?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn make_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut writer = zip::ZipWriter::new(cursor);
            let options = zip::write::FileOptions::default();
            for (name, contents) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(contents).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn sniffs_zip_magic() {
        let zip_bytes = make_zip(&[("a.txt", b"hi")]);
        assert_eq!(sniff(&zip_bytes).unwrap(), ArchiveKind::Zip);
    }

    #[test]
    fn rejects_unknown_magic() {
        assert!(matches!(
            sniff(b"not an archive"),
            Err(AgentError::BadBundle(_))
        ));
    }

    #[test]
    fn extracts_zip_bundle_into_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let zip_bytes = make_zip(&[("hello.txt", b"world")]);
        let extracted = extract_bundle(&zip_bytes, dir.path()).unwrap();
        assert_eq!(extracted, 5);
        let contents = std::fs::read_to_string(dir.path().join("hello.txt")).unwrap();
        assert_eq!(contents, "world");
    }

    #[test]
    fn builds_result_archive_with_logs_and_workspace_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("output.bin"), b"result-data").unwrap();
        let archive = build_result_archive(dir.path(), "out\n", "err\n").unwrap();
        let mut reader = ZipArchive::new(Cursor::new(archive)).unwrap();
        let names: Vec<String> = (0..reader.len())
            .map(|i| reader.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"logs.txt".to_string()));
        assert!(names.contains(&"output.bin".to_string()));
    }
}
