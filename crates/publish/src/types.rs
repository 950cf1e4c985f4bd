//! Data types for the publish flow.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sitedrop_protocol::DeploymentResponse;

/// A scanned, hashed file ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the scan root, `/`-separated.
    pub relative_path: String,
    pub absolute_path: PathBuf,
    pub size: u64,
    pub content_type: String,
    pub content_hash: String,
}

impl FileEntry {
    /// Key of this file in the deployment manifest.
    pub fn manifest_key(&self) -> String {
        format!("/{}", self.relative_path)
    }
}

/// A batch of files sent in a single upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadBucket {
    pub files: Vec<FileEntry>,
    pub remaining_bytes: u64,
}

impl UploadBucket {
    /// Creates an empty bucket with `capacity` bytes of room.
    pub fn new(capacity: u64) -> Self {
        Self {
            files: Vec::new(),
            remaining_bytes: capacity,
        }
    }

    /// True if a file of `size` bytes fits without exceeding either cap.
    pub fn has_room(&self, size: u64, max_files: usize) -> bool {
        size <= self.remaining_bytes && self.files.len() < max_files
    }

    pub fn push(&mut self, file: FileEntry) {
        self.remaining_bytes -= file.size;
        self.files.push(file);
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Upload progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    /// Files present remotely so far (already known plus uploaded).
    pub uploaded: usize,
    pub total: usize,
}

/// Callback invoked with upload progress.
pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Outcome of the upload stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Files in the run, including those already stored.
    pub total: usize,
    /// Files uploaded this run.
    pub uploaded: usize,
    /// Files the remote store already had.
    pub skipped: usize,
    /// Non-empty buckets dispatched.
    pub buckets: usize,
    pub elapsed: Duration,
    /// Whether the upsert of known hashes succeeded.
    pub hashes_upserted: bool,
}

/// Per-run publish options.
#[derive(Clone, Default)]
pub struct PublishOptions {
    pub project: String,
    /// Directory to publish.
    pub directory: PathBuf,
    pub branch: Option<String>,
    /// Treat every file as missing and skip the check-missing call.
    pub skip_caching: bool,
    /// Rendered `_headers` content replacing the sidecar file.
    pub headers_override: Option<Vec<u8>>,
    pub progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for PublishOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishOptions")
            .field("project", &self.project)
            .field("directory", &self.directory)
            .field("branch", &self.branch)
            .field("skip_caching", &self.skip_caching)
            .field("headers_override", &self.headers_override.is_some())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Result of a successful publish.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub deployment: DeploymentResponse,
    /// `"/" + relative path` → content hash, sorted.
    pub manifest: std::collections::BTreeMap<String, String>,
    pub report: UploadReport,
}
