//! Directory scanning and hashing.
//!
//! Walks the site directory, applies the ignore rules and size limits, then
//! hashes every surviving file on a bounded rayon pool. Relative paths use
//! `/` as separator on every platform.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rayon::prelude::*;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::Limits;
use crate::error::PublishError;
use crate::hash::{extension, hash_encoded};
use crate::mime::content_type_for;
use crate::types::FileEntry;

/// Names ignored only directly under the scan root. These are sidecars or
/// server-side code handled outside of asset upload.
const ROOT_IGNORES: &[&str] = &["_worker.js", "_redirects", "_headers", "_routes.json", "functions"];

/// Names ignored at any depth.
const ANY_DEPTH_IGNORES: &[&str] = &[".DS_Store", "node_modules", ".git"];

/// A regular file that passed the walk, not yet hashed.
#[derive(Debug, Clone)]
struct Candidate {
    relative_path: String,
    absolute_path: PathBuf,
}

/// Returns true if the entry (file or directory) is ignored.
fn is_ignored(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if ANY_DEPTH_IGNORES.contains(&name.as_ref()) {
        return true;
    }
    entry.depth() == 1 && ROOT_IGNORES.contains(&name.as_ref())
}

/// Scans `root` and returns hashed entries sorted by relative path.
///
/// `hash_workers` bounds the hashing pool; `None` uses the host's available
/// parallelism. A file that cannot be read while hashing is logged and
/// skipped.
pub fn scan_directory(
    root: &Path,
    limits: &Limits,
    hash_workers: Option<usize>,
) -> Result<Vec<FileEntry>, PublishError> {
    let candidates = walk(root, limits)?;

    let workers = hash_workers.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("sitedrop-hash-{i}"))
        .build()
        .map_err(|e| PublishError::InvalidConfig(format!("hash pool: {e}")))?;

    let max_file_size = limits.max_file_size;
    let mut files = pool.install(|| {
        candidates
            .into_par_iter()
            .fold(
                || Ok(Vec::new()),
                |acc: Result<Vec<FileEntry>, PublishError>, candidate| {
                    let mut acc = acc?;
                    acc.extend(hash_candidate(&candidate, max_file_size)?);
                    Ok(acc)
                },
            )
            .reduce(
                || Ok(Vec::new()),
                |a, b| {
                    let mut a = a?;
                    a.append(&mut b?);
                    Ok(a)
                },
            )
    })?;
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    debug!(
        root = %root.display(),
        files = files.len(),
        workers,
        "scan complete"
    );
    Ok(files)
}

/// Walks the tree, enforcing limits. Symlinks are skipped.
fn walk(root: &Path, limits: &Limits) -> Result<Vec<Candidate>, PublishError> {
    let mut candidates = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_ignored(e));

    for entry in walker {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_symlink() {
            debug!(path = %entry.path().display(), "skipping symlink");
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let size = entry.metadata()?.len();
        let rel_path = entry
            .path()
            .strip_prefix(root)
            .map_err(std::io::Error::other)?;
        let relative_path = rel_path.to_string_lossy().replace('\\', "/");

        if size > limits.max_file_size {
            return Err(PublishError::FileTooLarge {
                path: relative_path,
                size,
                limit: limits.max_file_size,
            });
        }

        candidates.push(Candidate {
            relative_path,
            absolute_path: entry.into_path(),
        });
    }

    if candidates.len() > limits.max_file_count {
        return Err(PublishError::TooManyFiles {
            count: candidates.len(),
            limit: limits.max_file_count,
        });
    }

    Ok(candidates)
}

/// Reads and hashes one file. `None` means it could not be read and was
/// skipped. The size limit is checked again on the bytes actually read,
/// since the file may have changed after the walk.
fn hash_candidate(
    candidate: &Candidate,
    max_file_size: u64,
) -> Result<Option<FileEntry>, PublishError> {
    let content = match std::fs::read(&candidate.absolute_path) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %candidate.relative_path, error = %e, "skipping unreadable file");
            return Ok(None);
        }
    };
    let size = content.len() as u64;
    if size > max_file_size {
        return Err(PublishError::FileTooLarge {
            path: candidate.relative_path.clone(),
            size,
            limit: max_file_size,
        });
    }

    let ext = extension(&candidate.absolute_path);
    let encoded = STANDARD.encode(&content);

    Ok(Some(FileEntry {
        relative_path: candidate.relative_path.clone(),
        absolute_path: candidate.absolute_path.clone(),
        size,
        content_type: content_type_for(ext).to_string(),
        content_hash: hash_encoded(&encoded, ext),
    }))
}
