//! Concurrent bucket upload.
//!
//! Each non-empty bucket runs as its own tokio task; a semaphore bounds
//! how many uploads are in flight. A failed bucket does not cancel its
//! siblings: the first error is kept and reported once every task has
//! finished.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sitedrop_protocol::{AssetMetadata, UploadPayloadFile};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::api::PagesApi;
use crate::config::{RetryPolicy, UploadSettings};
use crate::error::PublishError;
use crate::token::TokenProvider;
use crate::types::{FileEntry, ProgressCallback, UploadBucket, UploadProgress, UploadReport};

/// Uploads buckets with bounded parallelism, retry and credential refresh.
pub struct UploadExecutor {
    api: Arc<dyn PagesApi>,
    tokens: Arc<TokenProvider>,
    concurrency: usize,
    retry: RetryPolicy,
}

/// Shared progress counter. The callback runs under the lock so reports
/// never go backwards.
struct Progress {
    done: Mutex<usize>,
    total: usize,
    callback: Option<ProgressCallback>,
}

impl Progress {
    fn advance(&self, files: usize) {
        let mut done = self.done.lock().unwrap_or_else(|e| e.into_inner());
        *done += files;
        if let Some(cb) = &self.callback {
            cb(UploadProgress {
                uploaded: *done,
                total: self.total,
            });
        }
    }
}

impl UploadExecutor {
    pub fn new(
        api: Arc<dyn PagesApi>,
        tokens: Arc<TokenProvider>,
        settings: &UploadSettings,
        retry: &RetryPolicy,
    ) -> Self {
        Self {
            api,
            tokens,
            concurrency: settings.concurrency.max(1),
            retry: retry.clone(),
        }
    }

    /// Uploads every non-empty bucket, then records `all_hashes` as known.
    ///
    /// `already_present` files are counted as done before dispatch.
    pub async fn run(
        &self,
        buckets: Vec<UploadBucket>,
        all_hashes: &[String],
        already_present: usize,
        progress: Option<ProgressCallback>,
    ) -> Result<UploadReport, PublishError> {
        let start = Instant::now();
        let buckets: Vec<UploadBucket> = buckets.into_iter().filter(|b| !b.is_empty()).collect();
        let to_upload: usize = buckets.iter().map(|b| b.files.len()).sum();
        let bucket_count = buckets.len();

        let progress = Arc::new(Progress {
            done: Mutex::new(0),
            total: all_hashes.len(),
            callback: progress,
        });
        progress.advance(already_present);

        info!(
            files = to_upload,
            buckets = bucket_count,
            concurrency = self.concurrency,
            "uploading assets"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let first_error: Arc<Mutex<Option<PublishError>>> = Arc::new(Mutex::new(None));
        let mut tasks = JoinSet::new();

        for (index, bucket) in buckets.into_iter().enumerate() {
            let api = self.api.clone();
            let tokens = self.tokens.clone();
            let retry = self.retry.clone();
            let semaphore = semaphore.clone();
            let progress = progress.clone();
            let first_error = first_error.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let files = bucket.files.len();
                match upload_bucket(api.as_ref(), &tokens, &retry, index, bucket).await {
                    Ok(()) => progress.advance(files),
                    Err(e) => {
                        error!(bucket = index, error = %e, "bucket upload failed");
                        record_first(&first_error, e);
                    }
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                record_first(&first_error, PublishError::Join(e));
            }
        }

        let failed = first_error.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(e) = failed {
            return Err(e);
        }

        let hashes_upserted = self.upsert(all_hashes).await;

        let report = UploadReport {
            total: all_hashes.len(),
            uploaded: to_upload,
            skipped: already_present,
            buckets: bucket_count,
            elapsed: start.elapsed(),
            hashes_upserted,
        };
        info!(
            uploaded = report.uploaded,
            skipped = report.skipped,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "upload complete"
        );
        Ok(report)
    }

    /// Best-effort upsert of every hash so later runs can skip them.
    ///
    /// One retry after a backoff unit, refreshing on 401. Failure is only
    /// logged.
    async fn upsert(&self, hashes: &[String]) -> bool {
        let jwt = match self.tokens.token().await {
            Ok(jwt) => jwt,
            Err(e) => {
                warn!(error = %e, "skipping hash upsert, no upload token");
                return false;
            }
        };
        let err = match self.api.upsert_hashes(&jwt, hashes).await {
            Ok(()) => return true,
            Err(e) => e,
        };
        debug!(error = %err, "hash upsert failed, retrying once");

        tokio::time::sleep(self.retry.backoff_unit()).await;
        if err.is_unauthorized() {
            self.tokens.recover(&err).await;
        }

        let jwt = self.tokens.token().await.unwrap_or(jwt);
        match self.api.upsert_hashes(&jwt, hashes).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "hash upsert failed, next run may re-check these files");
                false
            }
        }
    }
}

fn record_first(slot: &Mutex<Option<PublishError>>, err: PublishError) {
    let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
    if slot.is_none() {
        *slot = Some(err);
    }
}

/// Uploads one bucket with the retry schedule.
async fn upload_bucket(
    api: &dyn PagesApi,
    tokens: &TokenProvider,
    retry: &RetryPolicy,
    index: usize,
    bucket: UploadBucket,
) -> Result<(), PublishError> {
    let payload = tokio::task::spawn_blocking(move || build_payload(&bucket.files)).await??;

    let mut attempt: u32 = 0;
    let mut calls: u32 = 0;
    let mut gateway: u32 = 0;

    loop {
        let jwt = tokens.token().await?;
        calls += 1;
        let err = match api.upload(&jwt, &payload).await {
            Ok(resp) => {
                if !resp.unsuccessful_keys.is_empty() {
                    warn!(
                        bucket = index,
                        accepted = resp.successful_key_count,
                        rejected = resp.unsuccessful_keys.len(),
                        "asset store rejected part of the bucket"
                    );
                }
                debug!(bucket = index, files = payload.len(), attempts = calls, "bucket uploaded");
                return Ok(());
            }
            Err(e) => e,
        };

        attempt += 1;
        let mut delay = retry.delay_for_attempt(attempt - 1);
        if err.is_gateway() {
            gateway += 1;
            if gateway >= retry.gateway_threshold {
                attempt += 1;
            }
            delay += retry.gateway_penalty(gateway);
        } else {
            gateway = 0;
        }

        if attempt >= retry.upload_attempts {
            return Err(PublishError::UploadFailed {
                attempts: calls,
                source: Box::new(err),
            });
        }
        warn!(bucket = index, attempt, gateway, error = %err, "upload failed, retrying");

        tokens.recover(&err).await;
        tokio::time::sleep(delay).await;
    }
}

/// Reads and encodes the bucket's files.
fn build_payload(files: &[FileEntry]) -> Result<Vec<UploadPayloadFile>, PublishError> {
    files
        .iter()
        .map(|file| {
            let data = std::fs::read(&file.absolute_path).map_err(|e| {
                std::io::Error::new(e.kind(), format!("{}: {e}", file.relative_path))
            })?;
            Ok(UploadPayloadFile {
                key: file.content_hash.clone(),
                value: STANDARD.encode(&data),
                metadata: AssetMetadata {
                    content_type: file.content_type.clone(),
                },
                base64: true,
            })
        })
        .collect()
}
