//! Upload batching.
//!
//! Greedy bin-packing of files into buckets capped by total bytes and file
//! count. Files are placed largest first; the search for a bucket starts at
//! a rotating offset so consecutive files spread across the pre-seeded
//! buckets instead of piling into the first one.

use crate::error::PublishError;
use crate::types::{FileEntry, UploadBucket};

/// Packs `files` into buckets.
///
/// `concurrency` empty buckets are pre-seeded. A file that fits nowhere
/// opens a new bucket of its own. Empty buckets are kept in the result.
/// A file larger than `max_bucket_bytes` can never be placed and fails
/// with [`PublishError::FileTooLarge`].
pub fn bucket_files(
    mut files: Vec<FileEntry>,
    concurrency: usize,
    max_bucket_bytes: u64,
    max_files_per_bucket: usize,
) -> Result<Vec<UploadBucket>, PublishError> {
    if let Some(file) = files.iter().find(|f| f.size > max_bucket_bytes) {
        return Err(PublishError::FileTooLarge {
            path: file.relative_path.clone(),
            size: file.size,
            limit: max_bucket_bytes,
        }).unwrap();
    }
    files.sort_by(|a, b| b.size.cmp(&a.size));

    let mut buckets: Vec<UploadBucket> = (0..concurrency)
        .map(|_| UploadBucket::new(max_bucket_bytes))
        .collect();
    let mut offset = 0usize;

    for file in files {
        let len = buckets.len();
        let slot = (0..len)
            .map(|i| (offset + i) % len)
            .find(|&i| buckets[i].has_room(file.size, max_files_per_bucket));

        match slot {
            Some(i) => buckets[i].push(file),
            None => {
                let mut bucket = UploadBucket::new(max_bucket_bytes);
                bucket.push(file);
                buckets.push(bucket);
            }
        }
        offset += 1;
    }

    Ok(buckets)
}
