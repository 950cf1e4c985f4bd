//! Static site publish flow: scan, dedup, bucket, upload, deploy.
//!
//! This crate implements the **business logic** for publishing a site
//! directory to a Pages project. It has no CLI or HTTP dependencies of its
//! own: the caller provides a [`PagesApi`] implementation, normally the
//! `sitedrop-pages-api` client.
//!
//! # Pipeline
//!
//! 1. **Scan**: walk the site, apply ignore rules, hash every file
//! 2. **Resolve**: ask the asset store which hashes it lacks
//! 3. **Bucket**: pack missing files into size/count-capped batches
//! 4. **Upload**: send batches concurrently with retry and token refresh
//! 5. **Deploy**: submit the path → hash manifest and sidecar files

pub mod api;
pub mod bucketer;
pub mod config;
pub mod deploy;
pub mod error;
pub mod hash;
pub mod headers;
pub mod manifest;
pub mod mime;
pub mod resolver;
pub mod scanner;
pub mod token;
pub mod types;
pub mod upload;

#[cfg(test)]
mod mock;

pub use api::{ApiFuture, PagesApi};
pub use bucketer::bucket_files;
pub use config::{Limits, PublishConfig, RetryPolicy, UploadSettings};
pub use deploy::Publisher;
pub use error::PublishError;
pub use hash::content_hash;
pub use headers::HeaderRules;
pub use manifest::{SidecarFiles, build_manifest};
pub use resolver::{Resolution, resolve_missing};
pub use scanner::scan_directory;
pub use token::{TokenProvider, is_expired};
pub use types::{
    FileEntry, ProgressCallback, PublishOptions, PublishOutcome, UploadBucket, UploadProgress,
    UploadReport,
};
pub use upload::UploadExecutor;
